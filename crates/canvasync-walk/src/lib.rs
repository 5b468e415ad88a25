//! Enumerate a user's Canvas file storage.
//!
//! # Architecture
//!
//! - `container.rs` - Top-level user/course/group roots scraped from the files page
//! - `listing.rs` - Wire types for the folder and file listing endpoints
//! - `walker.rs` - Recursive traversal producing `(url, local path)` pairs
//! - `sanitize.rs` - Filesystem-safe path segments

mod container;
mod error;
mod listing;
mod sanitize;
mod walker;

pub use container::{Container, ContainerKind, Platform, classify, extract_env};
pub use error::{Result, WalkError};
pub use sanitize::{contained_path, sanitize};
pub use walker::{DEFAULT_PAGE_SIZE, FileEntry, FolderNode, TreeWalker};
