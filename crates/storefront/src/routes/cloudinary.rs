//! Product image routes (admin).
//!
//! Images go to Cloudinary either directly from the browser, using the
//! signed parameters from `/signature`, or through `/upload`.

use axum::{
    Json,
    extract::{Multipart, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppQuery};
use crate::middleware::RequireAdmin;
use crate::services::cloudinary::{CloudinaryClient, SignedUpload, UploadedImage};
use crate::services::ports::IntegrationError;
use crate::state::AppState;

/// Folder used when the caller names none.
pub const DEFAULT_FOLDER: &str = "products";

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

fn client(state: &AppState) -> Result<&CloudinaryClient> {
    state
        .cloudinary()
        .ok_or(AppError::Integration(IntegrationError::NotConfigured(
            "Cloudinary",
        )))
}

/// Validate a folder name, falling back to [`DEFAULT_FOLDER`].
fn folder_name(folder: Option<&str>) -> Result<String> {
    let folder = folder.map(str::trim).filter(|f| !f.is_empty());
    let Some(folder) = folder else {
        return Ok(DEFAULT_FOLDER.to_string());
    };
    let valid = folder.len() <= 64
        && !folder.starts_with('/')
        && !folder.contains("..")
        && folder
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'));
    if !valid {
        return Err(AppError::BadRequest("invalid folder name".to_string()));
    }
    Ok(folder.to_string())
}

/// Query parameters for `/signature`.
#[derive(Debug, Default, Deserialize)]
pub struct SignatureQuery {
    pub folder: Option<String>,
}

/// Signed parameters for a direct browser upload.
///
/// GET /api/cloudinary/signature?folder=
///
/// # Errors
///
/// 400 for a bad folder, 503 when Cloudinary is not configured.
pub async fn signature(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    AppQuery(query): AppQuery<SignatureQuery>,
) -> Result<Json<SignedUpload>> {
    let folder = folder_name(query.folder.as_deref())?;
    Ok(Json(client(&state)?.signed_params(&folder, Utc::now())))
}

/// Upload the multipart `file` field (optionally with a `folder` field).
///
/// POST /api/cloudinary/upload
///
/// # Errors
///
/// 400 without a non-empty file, 502 if Cloudinary fails, 503 when it is
/// not configured.
pub async fn upload(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    mut multipart: Multipart,
) -> Result<Json<UploadedImage>> {
    let client = client(&state)?;

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut folder: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                file = Some((file_name, bytes.to_vec()));
            }
            Some("folder") => {
                folder = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?,
                );
            }
            _ => {}
        }
    }

    let Some((file_name, bytes)) = file.filter(|(_, bytes)| !bytes.is_empty()) else {
        return Err(AppError::BadRequest("missing file".to_string()));
    };
    let folder = folder_name(folder.as_deref())?;

    let image = client.upload(bytes, &file_name, &folder).await?;
    tracing::info!(admin = %admin.id, public_id = %image.public_id, "Image uploaded");
    Ok(Json(image))
}

/// Body of `POST /api/cloudinary/delete`.
#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub public_id: String,
}

/// Result of a delete.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// POST /api/cloudinary/delete
///
/// # Errors
///
/// 400 for an empty id, 502 if Cloudinary fails, 503 when it is not
/// configured.
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppJson(req): AppJson<DeleteRequest>,
) -> Result<Json<DeleteResponse>> {
    let public_id = req.public_id.trim();
    if public_id.is_empty() {
        return Err(AppError::BadRequest("public_id is required".to_string()));
    }
    let deleted = client(&state)?.destroy(public_id).await?;
    tracing::info!(admin = %admin.id, public_id, deleted, "Image delete requested");
    Ok(Json(DeleteResponse { deleted }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_defaults_when_blank() {
        assert_eq!(folder_name(None).unwrap(), DEFAULT_FOLDER);
        assert_eq!(folder_name(Some("  ")).unwrap(), DEFAULT_FOLDER);
    }

    #[test]
    fn test_folder_accepts_nested_names() {
        assert_eq!(folder_name(Some("products/tea-2025")).unwrap(), "products/tea-2025");
    }

    #[test]
    fn test_folder_rejects_traversal_and_odd_characters() {
        for bad in ["../secrets", "/root", "a b", "x?y=1"] {
            assert!(folder_name(Some(bad)).is_err(), "{bad} accepted");
        }
    }
}
