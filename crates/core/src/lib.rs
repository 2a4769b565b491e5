//! Core domain types and shared logic for the filedrop ephemeral file server.
//!
//! This crate defines the canonical data model used across all other crates:
//! - File identifiers and one-time download tokens
//! - Filename sanitization and blob key construction
//! - Application configuration

pub mod config;
pub mod error;
pub mod handle;
pub mod name;

pub use config::{AppConfig, HandleMode, RetentionConfig, ServerConfig, StorageConfig};
pub use error::{Error, Result};
pub use handle::{DownloadToken, FileId};
pub use name::{BlobKey, sanitize_filename};
