//! One-time download token issuance.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use filedrop_core::{DownloadToken, FileId};

/// Issues single-use download tokens bound to file IDs.
///
/// Issuance never checks that the target exists; the binding is validated
/// lazily when the token is consumed, so minting a link can never race with
/// a concurrent eviction of its target. The flip side is documented policy:
/// a token consumed against a target that turned out to be dead is spent and
/// is not restored.
#[derive(Debug, Default)]
pub struct LinkIssuer {
    tokens: DashMap<DownloadToken, FileId>,
}

impl LinkIssuer {
    /// Create a new issuer with no outstanding tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh token bound to `target`.
    pub fn issue(&self, target: FileId) -> DownloadToken {
        loop {
            let token = DownloadToken::new();
            match self.tokens.entry(token) {
                Entry::Vacant(vacant) => {
                    vacant.insert(target);
                    return token;
                }
                // Unreachable in practice; mint a new token instead of
                // rebinding one that is already outstanding.
                Entry::Occupied(_) => continue,
            }
        }
    }

    /// Atomically consume a token, returning its target.
    ///
    /// Exactly one caller can win for a given token; every later (or
    /// concurrently losing) call gets `None`.
    pub fn resolve_and_consume(&self, token: DownloadToken) -> Option<FileId> {
        self.tokens.remove(&token).map(|(_, target)| target)
    }

    /// Number of outstanding tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no tokens are outstanding.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
