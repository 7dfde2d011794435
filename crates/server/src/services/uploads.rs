//! Profile photo uploads.
//!
//! Files are written as `{uuid}_{sanitized original name}` into the upload
//! directory, which is served under `/uploads/`.

use std::path::Path;

use uuid::Uuid;

use switchboard_core::AvatarRef;

use crate::services::auth::AuthError;

/// Longest original-name suffix kept in the stored file name.
const MAX_NAME_LENGTH: usize = 100;

/// Extensions accepted for profile photos.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Reduce a client-supplied file name to a safe basename.
///
/// Directory components are dropped and anything outside `[A-Za-z0-9._-]`
/// becomes `_`. Never returns an empty string.
#[must_use]
pub fn sanitize_file_name(original: &str) -> String {
    let basename = original.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = basename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    let truncated: String = cleaned
        .chars()
        .rev()
        .take(MAX_NAME_LENGTH)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    if truncated.is_empty() {
        "upload".to_owned()
    } else {
        truncated
    }
}

/// Check that an upload looks like an image we can serve.
///
/// # Errors
///
/// Returns `AuthError::InvalidAvatar` for empty, oversized, or non-image
/// uploads.
pub fn validate_upload(
    file_name: &str,
    content_type: Option<&str>,
    len: usize,
    max_bytes: usize,
) -> Result<(), AuthError> {
    if len == 0 {
        return Err(AuthError::InvalidAvatar("the file is empty".to_owned()));
    }
    if len > max_bytes {
        return Err(AuthError::InvalidAvatar(format!(
            "the file is larger than {max_bytes} bytes"
        )));
    }
    if let Some(content_type) = content_type
        && !content_type.starts_with("image/")
    {
        return Err(AuthError::InvalidAvatar("only images are accepted".to_owned()));
    }

    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(AuthError::InvalidAvatar(
            "only png, jpg, gif, and webp files are accepted".to_owned(),
        )),
    }
}

/// Write an uploaded photo and return its avatar reference.
///
/// # Errors
///
/// Returns `StoreAvatarError::Rejected` if the stored name is rejected, or
/// `StoreAvatarError::Io` if the file cannot be written.
pub async fn store_avatar(
    upload_dir: &Path,
    original_name: &str,
    bytes: &[u8],
) -> Result<AvatarRef, StoreAvatarError> {
    let stored_name = format!(
        "{}_{}",
        Uuid::new_v4().simple(),
        sanitize_file_name(original_name)
    );
    let avatar = AvatarRef::uploaded(&stored_name)
        .map_err(|e| AuthError::InvalidAvatar(e.to_string()))?;

    tokio::fs::create_dir_all(upload_dir).await?;
    tokio::fs::write(upload_dir.join(&stored_name), bytes).await?;

    tracing::info!(file = %stored_name, size = bytes.len(), "Stored avatar upload");
    Ok(avatar)
}

/// Errors from [`store_avatar`].
#[derive(Debug, thiserror::Error)]
pub enum StoreAvatarError {
    #[error(transparent)]
    Rejected(#[from] AuthError),
    #[error("failed to write upload: {0}")]
    Io(#[from] std::io::Error),
}
