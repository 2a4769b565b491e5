//! HTTP request handlers.

pub mod files;

pub use files::{download, link, stats, upload};
