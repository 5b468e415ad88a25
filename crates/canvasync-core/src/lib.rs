//! HTTP client seam and authenticated session shared by the canvasync crates.
//!
//! # Architecture
//!
//! - [`HttpClient`] - the narrow async interface every component talks through
//! - [`ReqwestClient`] - production implementation with a persistent cookie jar
//! - [`Session`] - an authenticated client plus the jar it writes into
//!
//! Components are generic over [`HttpClient`] so the scraping logic can be
//! exercised against canned responses (see the `mock` feature).

mod client;
mod error;
mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod session;

pub use client::{ClientSetting, Connect, CookieJar, ReqwestClient};
pub use error::{ClientSettingError, HttpError, JarError};
pub use http::{BoxStream, Download, HttpClient, Page};
pub use session::Session;
