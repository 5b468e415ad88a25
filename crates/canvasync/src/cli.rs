use std::path::PathBuf;

use clap::{ArgAction, Parser};
use url::Url;

#[derive(Clone, Debug, Parser)]
#[command(name = "canvasync", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
pub struct App {
    /// Single-sign-on username
    pub username: String,

    /// Single-sign-on password
    pub password: String,

    /// Download only this resource instead of syncing every course
    #[arg(long)]
    pub url: Option<Url>,

    /// File name for `--url` downloads (default: the URL's last path segment)
    #[arg(long, requires = "url")]
    pub filename: Option<String>,

    /// Report files that are already on disk
    #[arg(long)]
    pub show_existing: bool,

    /// Parallel download workers (default: number of cores)
    #[arg(long, short = 'j')]
    pub workers: Option<usize>,

    /// TOML configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Directory downloads are written under
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// More output per occurrence (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
