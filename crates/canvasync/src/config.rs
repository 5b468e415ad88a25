use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use canvasync_auth::DEFAULT_LOGIN_URL;
use canvasync_core::ClientSetting;
use canvasync_fetch::{DEFAULT_CHUNK_SIZE, DownloadOptions};
use canvasync_walk::{DEFAULT_PAGE_SIZE, Platform};
use serde::Deserialize;
use url::Url;

use crate::cli::App;

const DEFAULT_PLATFORM_URL: &str = "https://canvas.auckland.ac.nz";

/// Runtime settings, read from an optional TOML file and then overridden by flags.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub platform_url: String,
    pub login_url: String,
    /// Where `.<host>_cookiejar` files live.
    pub jar_dir: PathBuf,
    pub output: PathBuf,
    pub workers: usize,
    pub chunk_size: usize,
    pub page_size: u64,
    pub connect_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub proxies: Vec<Url>,
    pub show_existing: bool,
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform_url: DEFAULT_PLATFORM_URL.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            jar_dir: PathBuf::from("."),
            output: PathBuf::from("."),
            workers: available_cores(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            connect_timeout_secs: None,
            user_agent: None,
            proxies: Vec::new(),
            show_existing: false,
            progress: true,
        }
    }
}

impl Config {
    /// Read `path`, or fall back to defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config file '{}'", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply command-line overrides.
    pub fn merge(mut self, app: &App) -> Self {
        if let Some(workers) = app.workers {
            self.workers = workers;
        }
        if let Some(output) = &app.output {
            self.output = output.clone();
        }
        if app.show_existing {
            self.show_existing = true;
        }
        if app.no_progress {
            self.progress = false;
        }
        self.workers = self.workers.max(1);
        self
    }

    pub fn platform(&self) -> Result<Platform> {
        Platform::parse(&self.platform_url)
            .with_context(|| format!("invalid platform URL '{}'", self.platform_url))
    }

    pub fn client_setting(&self) -> ClientSetting {
        ClientSetting {
            proxies: (!self.proxies.is_empty()).then(|| self.proxies.clone()),
            user_agent: self.user_agent.clone(),
            connect_timeout: self.connect_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions::default()
            .chunk_size(self.chunk_size)
            .show_existing(self.show_existing)
    }
}

pub fn available_cores() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn defaults_match_university_endpoints() {
        let config = Config::default();
        assert_eq!(config.platform().unwrap().base().as_str(), "https://canvas.auckland.ac.nz/");
        assert_eq!(config.login_url, DEFAULT_LOGIN_URL);
        assert_eq!(config.chunk_size, 20 * 1024);
        assert_eq!(config.page_size, 10);
        assert!(config.workers >= 1);
    }

    #[test]
    fn reads_partial_file() {
        let config = Config::parse(
            r#"
platform_url = "https://canvas.example.edu"
workers = 2
connect_timeout_secs = 15
proxies = ["http://proxy.example.edu:3128"]
"#,
        )
        .unwrap();
        assert_eq!(config.platform().unwrap().base().host_str(), Some("canvas.example.edu"));
        assert_eq!(config.workers, 2);

        let setting = config.client_setting();
        assert_eq!(setting.connect_timeout, Some(Duration::from_secs(15)));
        assert_eq!(setting.proxies.map(|p| p.len()), Some(1));
        assert!(setting.user_agent.is_none());
    }

    #[test]
    fn bad_platform_url_is_an_error() {
        let config = Config::parse("platform_url = \"canvas without scheme\"").unwrap();
        assert!(config.platform().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("wokers = 3").is_err());
    }

    #[test]
    fn flags_override_file() {
        let config = Config::parse("workers = 2\noutput = \"from-file\"").unwrap();
        let app = App::parse_from([
            "canvasync",
            "u",
            "p",
            "--workers",
            "0",
            "--output",
            "from-flag",
            "--show-existing",
            "--no-progress",
        ]);

        let config = config.merge(&app);
        assert_eq!(config.workers, 1);
        assert_eq!(config.output, PathBuf::from("from-flag"));
        assert!(config.show_existing);
        assert!(!config.progress);
        assert!(config.download_options().show_existing);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }
}
