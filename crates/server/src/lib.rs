//! HTTP API server for the filedrop ephemeral file service.
//!
//! This crate provides the HTTP surface and background reclamation:
//! - Multipart upload with handle issuance
//! - Download by raw ID or one-time token
//! - Link minting for the latest upload of a filename
//! - Live-entry stats snapshot
//! - Hard-expiry and idle-eviction sweeps

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod sweep;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
pub use sweep::{SweepStats, run_expiry_sweep, run_idle_sweep, spawn_sweepers};
