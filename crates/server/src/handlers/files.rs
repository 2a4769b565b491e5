//! File upload, download, link and stats endpoints.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use filedrop_core::{BlobKey, DownloadToken, FileId, HandleMode};
use filedrop_registry::EntrySnapshot;
use futures::StreamExt;
use serde::Serialize;
use time::OffsetDateTime;

/// POST /files/upload - Accept a multipart upload and hand out a download path.
///
/// The blob is written first; the registry entry is created only once the
/// write has succeeded, so a storage failure never leaves a dangling entry.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "upload.bin".to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
        let size = data.len() as u64;

        let id = FileId::new();
        let key = BlobKey::for_upload(id, &original_name);
        state.storage.put(key.as_str(), data).await?;

        let id = state.registry.register(
            id,
            key,
            original_name.clone(),
            size,
            state.config.retention.ttl(),
        );

        let handle = match state.config.retention.handle_mode {
            HandleMode::Id => id.to_string(),
            HandleMode::Token => state.links.issue(id).to_string(),
        };

        tracing::info!(id = %id, name = %original_name, size, "file uploaded");
        return Ok((StatusCode::CREATED, format!("/files/download/{handle}")));
    }

    Err(ApiError::BadRequest(
        "missing multipart part named 'file'".to_string(),
    ))
}

/// GET /files/download/{handle} - Stream a file by raw ID or one-time token.
pub async fn download(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> ApiResult<Response> {
    let id = resolve_handle(&state, &handle)?;

    let Some(entry) = state.registry.get(id) else {
        // Lazy cleanup: the entry may still be physically present but past
        // its deadline. Whoever wins the conditional removal also releases
        // the blob; losing just means a sweep got there first.
        if let Some(expired) = state
            .registry
            .remove_expired(id, OffsetDateTime::now_utc())
        {
            delete_blob_best_effort(&state, &expired.storage_key).await;
        }
        return Err(ApiError::NotFound(format!("no such file: {handle}")));
    };

    state.registry.record_access(id)?;

    let stream = state.storage.get_stream(&entry.storage_key).await?;
    let body_stream = stream.map(|result| result.map_err(|e| std::io::Error::other(e.to_string())));

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/octet-stream".to_string()),
            (CONTENT_LENGTH, entry.size.to_string()),
            (
                CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    disposition_name(&entry.original_name)
                ),
            ),
        ],
        Body::from_stream(body_stream),
    )
        .into_response())
}

/// GET /files/link/{filename} - Mint a one-time token for the most recent
/// live upload with this original filename.
pub async fn link(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<String> {
    let entry = state
        .registry
        .find_latest_by_name(&filename)
        .ok_or_else(|| ApiError::NotFound(format!("no live file named: {filename}")))?;

    let token = state.links.issue(entry.id);
    tracing::debug!(id = %entry.id, name = %filename, "one-time link issued");
    Ok(format!("/files/download/{token}"))
}

/// One live registry entry in the stats response.
#[derive(Debug, Serialize)]
pub struct StatsEntry {
    /// File identifier.
    pub id: String,
    /// Original filename.
    pub filename: String,
    /// Blob size in bytes.
    pub size: u64,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Hard expiry deadline.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// Last successful download (creation time if never downloaded).
    #[serde(with = "time::serde::rfc3339")]
    pub last_access: OffsetDateTime,
    /// Successful download count.
    pub downloads: u64,
}

impl From<EntrySnapshot> for StatsEntry {
    fn from(entry: EntrySnapshot) -> Self {
        Self {
            id: entry.id.to_string(),
            filename: entry.original_name,
            size: entry.size,
            created_at: entry.created_at,
            expires_at: entry.expires_at,
            last_access: entry.last_access_at,
            downloads: entry.download_count,
        }
    }
}

/// GET /files/stats - Best-effort snapshot of all live entries.
pub async fn stats(State(state): State<AppState>) -> Json<Vec<StatsEntry>> {
    let entries = state
        .registry
        .list_all()
        .into_iter()
        .map(StatsEntry::from)
        .collect();
    Json(entries)
}

/// Resolve a download handle to a file ID.
///
/// Outstanding tokens are consumed first; in `id` mode an unconsumed handle
/// then falls back to being parsed as a raw file ID. In `token` mode raw IDs
/// are never accepted. Malformed handles are reported as not-found so the
/// endpoint does not distinguish bad guesses from expired files.
fn resolve_handle(state: &AppState, handle: &str) -> ApiResult<FileId> {
    let not_found = || ApiError::NotFound(format!("no such file: {handle}"));

    if let Ok(token) = DownloadToken::parse(handle)
        && let Some(target) = state.links.resolve_and_consume(token)
    {
        return Ok(target);
    }

    match state.config.retention.handle_mode {
        HandleMode::Id => FileId::parse(handle).map_err(|_| not_found()),
        HandleMode::Token => Err(not_found()),
    }
}

/// Delete a blob after winning a lazy-cleanup removal; failures leave an
/// orphan, which the operator model accepts.
async fn delete_blob_best_effort(state: &AppState, key: &str) {
    match state.storage.delete(key).await {
        Ok(()) | Err(filedrop_storage::StorageError::NotFound(_)) => {}
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "lazy cleanup blob delete failed, leaving orphan");
        }
    }
}

/// Render a filename for the Content-Disposition header: quotes and
/// backslashes are escaped and non-printable characters dropped so the
/// value is always a valid header.
fn disposition_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control())
        .flat_map(|c| match c {
            '"' | '\\' => vec!['\\', c],
            _ => vec![c],
        })
        .collect()
}
