//! Filename sanitization and blob key construction.

use crate::handle::FileId;
use std::fmt;

/// Maximum length of the sanitized filename portion of a blob key.
const MAX_NAME_LEN: usize = 128;

/// Sanitize a client-supplied filename for use inside a blob key.
///
/// Path components that are empty or all dots (`.`, `..`) are dropped, the
/// rest are joined with `_`, anything outside `[A-Za-z0-9._-]` becomes `_`,
/// dot runs collapse to a single `.`, leading dots are stripped, and the
/// result is truncated. The output never contains a separator or a `..`
/// sequence, so every blob key built from it is accepted by the store's key
/// validation. The original (unsanitized) name is kept on the registry entry
/// and used verbatim for Content-Disposition; sanitization only affects the
/// storage key.
pub fn sanitize_filename(name: &str) -> String {
    let joined = name
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && !part.chars().all(|c| c == '.'))
        .collect::<Vec<_>>()
        .join("_");

    let mut cleaned = String::with_capacity(joined.len());
    let mut prev_dot = false;
    for c in joined.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '_'
        };
        if c == '.' {
            if prev_dot {
                continue;
            }
            prev_dot = true;
        } else {
            prev_dot = false;
        }
        cleaned.push(c);
    }

    let trimmed = cleaned.trim_start_matches('.');
    let truncated: String = trimmed.chars().take(MAX_NAME_LEN).collect();

    if truncated.is_empty() {
        "file".to_string()
    } else {
        truncated
    }
}

/// Storage key for an uploaded blob.
///
/// Keys embed the file ID and the sanitized original filename
/// (`{id}_{name}`) so blobs never collide and remain identifiable when
/// inspecting the backing store directly. The key is opaque to everything
/// outside the upload path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobKey(String);

impl BlobKey {
    /// Build the blob key for an upload.
    pub fn for_upload(id: FileId, original_name: &str) -> Self {
        Self(format!("{}_{}", id, sanitize_filename(original_name)))
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<BlobKey> for String {
    fn from(key: BlobKey) -> Self {
        key.0
    }
}
