use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::{Result, WalkError};

static ENV_BLOB: Lazy<Regex> = Lazy::new(|| Regex::new(r"ENV = (\{.*\});").unwrap());

static ASSET_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(user|course|group)_([0-9]+)$").unwrap());

/// Who owns a top-level file storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    User,
    Course,
    Group,
}

impl ContainerKind {
    /// Collection name used in `/api/v1/<segment>/<id>/...` paths.
    pub fn api_segment(self) -> &'static str {
        match self {
            ContainerKind::User => "users",
            ContainerKind::Course => "courses",
            ContainerKind::Group => "groups",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::User => write!(f, "user"),
            ContainerKind::Course => write!(f, "course"),
            ContainerKind::Group => write!(f, "group"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub kind: ContainerKind,
    pub id: u64,
    pub name: String,
}

/// Map an asset string such as `course_1234` to a container.
///
/// Returns `None` for any other shape.
pub fn classify(asset_string: &str, name: &str) -> Option<Container> {
    let caps = ASSET_STRING.captures(asset_string)?;
    let kind = match &caps[1] {
        "user" => ContainerKind::User,
        "course" => ContainerKind::Course,
        _ => ContainerKind::Group,
    };
    let id = caps[2].parse().ok()?;
    Some(Container {
        kind,
        id,
        name: name.to_string(),
    })
}

/// JSON text assigned to `ENV` in the files page markup.
pub fn extract_env(body: &str) -> Option<&str> {
    ENV_BLOB.captures(body).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

/// Base URL of a Canvas deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    base: Url,
}

impl Platform {
    pub fn new(mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base }
    }

    pub fn parse(base: &str) -> Result<Self> {
        let url = Url::parse(base).map_err(|source| WalkError::InvalidUrl {
            url: base.to_string(),
            source,
        })?;
        Ok(Self::new(url))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The HTML page that embeds the list of file contexts.
    pub fn files_page(&self) -> Result<Url> {
        self.join("files")
    }

    pub fn root_folder(&self, container: &Container) -> Result<Url> {
        self.join(&format!(
            "api/v1/{}/{}/folders/root",
            container.kind.api_segment(),
            container.id
        ))
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.base.join(path).map_err(|source| WalkError::InvalidUrl {
            url: format!("{}{path}", self.base),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_prefixes() {
        let course = classify("course_1234", "ENGSCI").unwrap();
        assert_eq!(course.kind, ContainerKind::Course);
        assert_eq!(course.id, 1234);
        assert_eq!(classify("user_9", "Me").unwrap().kind, ContainerKind::User);
        assert_eq!(classify("group_42", "Team").unwrap().kind, ContainerKind::Group);
    }

    #[test]
    fn rejects_unknown_prefixes() {
        assert!(classify("account_1", "Admin").is_none());
        assert!(classify("course_", "Empty").is_none());
        assert!(classify("courses_12", "Plural").is_none());
    }

    #[test]
    fn root_folder_url() {
        let platform = Platform::parse("https://canvas.auckland.ac.nz").unwrap();
        let container = classify("group_42", "Team").unwrap();
        assert_eq!(
            platform.root_folder(&container).unwrap().as_str(),
            "https://canvas.auckland.ac.nz/api/v1/groups/42/folders/root"
        );
    }

    #[test]
    fn base_path_is_kept() {
        let platform = Platform::parse("https://lms.example.edu/canvas").unwrap();
        assert_eq!(
            platform.files_page().unwrap().as_str(),
            "https://lms.example.edu/canvas/files"
        );
    }

    #[test]
    fn finds_env_assignment() {
        let body = r#"<script>INST = {};
ENV = {"FILES_CONTEXTS": [{"asset_string": "user_1", "name": "Me"}]};
BRANDABLE_CSS_HANDLEBARS_INDEX = [];</script>"#;
        assert_eq!(
            extract_env(body),
            Some(r#"{"FILES_CONTEXTS": [{"asset_string": "user_1", "name": "Me"}]}"#)
        );
        assert_eq!(extract_env("<html></html>"), None);
    }
}
