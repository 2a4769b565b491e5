//! File identifiers and one-time download tokens.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a registered file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(Uuid);

impl FileId {
    /// Generate a new random file ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidHandle(format!("invalid file ID: {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A one-time download token bound to a [`FileId`].
///
/// Tokens are opaque to clients and consumable exactly once. They carry no
/// expiry of their own; they are only as valid as the entry they resolve to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DownloadToken(Uuid);

impl DownloadToken {
    /// Generate a new random token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidHandle(format!("invalid download token: {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DownloadToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DownloadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Tokens are bearer credentials; keep them out of debug logs.
        write!(f, "DownloadToken(<redacted>)")
    }
}

impl fmt::Display for DownloadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_roundtrip() {
        let id = FileId::new();
        let parsed = FileId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn file_id_rejects_garbage() {
        assert!(FileId::parse("not-a-uuid").is_err());
        assert!(FileId::parse("").is_err());
    }

    #[test]
    fn token_roundtrip() {
        let token = DownloadToken::new();
        let parsed = DownloadToken::parse(&token.to_string()).unwrap();
        assert_eq!(token, parsed);
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = DownloadToken::new();
        let debug = format!("{token:?}");
        assert!(!debug.contains(&token.to_string()));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(FileId::new(), FileId::new());
        assert_ne!(DownloadToken::new(), DownloadToken::new());
    }
}
