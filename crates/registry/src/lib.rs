//! Concurrent ephemeral file registry for filedrop.
//!
//! This crate owns the metadata for every uploaded file:
//! - [`FileRegistry`]: the concurrent map from file ID to entry, with
//!   lazy expiry on every read path
//! - [`LinkIssuer`]: one-time download tokens bound to file IDs
//! - [`EntrySnapshot`]: point-in-time copies of entries for reporting
//!
//! The registry is purely in-memory; the blob store holds the bytes and the
//! registry decides what is alive.

pub mod entry;
pub mod error;
pub mod links;
pub mod registry;

pub use entry::EntrySnapshot;
pub use error::RegistryError;
pub use links::LinkIssuer;
pub use registry::FileRegistry;
