use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, WalkError};

/// Anything outside word characters, `-`, `.`, `(`, `)`, `:` and space.
static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\-.(): ]").unwrap());

/// Make a remote display name safe to use as a single path segment.
///
/// Every character outside the allow-list becomes `_`. Names that would
/// still be special to the filesystem (empty, `.`, `..`) are replaced too,
/// so the result is always a plain child of its parent. Idempotent.
pub fn sanitize(name: &str) -> String {
    let cleaned = DISALLOWED.replace_all(name, "_");
    match cleaned.as_ref() {
        "" | "." => "_".to_string(),
        ".." => "__".to_string(),
        _ => cleaned.into_owned(),
    }
}

/// Join `relative` onto `base`, refusing results that leave `base`.
pub fn contained_path<B: AsRef<Path>, P: AsRef<Path>>(base: B, relative: P) -> Result<PathBuf> {
    let base = base.as_ref();
    let relative = relative.as_ref();
    let mut resolved = base.to_path_buf();
    let depth = base.components().count();

    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir if resolved.components().count() > depth => {
                resolved.pop();
            }
            _ => {
                return Err(WalkError::Escape {
                    path: relative.to_path_buf(),
                    base: base.to_path_buf(),
                });
            }
        }
    }

    Ok(resolved)
}
