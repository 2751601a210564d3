use axum::{
    Json,
    extract::{Multipart, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use trailbook_types::api::{AckResponse, ImageUploadResponse};

use crate::error::ApiError;
use crate::media::MediaStore;
use crate::routes::AppState;

/// POST /image-upload — multipart form with an `image` file field.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let original_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        if data.is_empty() {
            break;
        }

        let filename = state
            .media
            .store(&data, original_name.as_deref(), content_type.as_deref())
            .await?;

        return Ok(Json(ImageUploadResponse {
            image_url: state.media.url_for(&state.base_url, &filename),
        }));
    }

    Err(ApiError::Validation("No image uploaded".into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteImageQuery {
    #[serde(default)]
    pub image_url: Option<String>,
}

/// DELETE /delete-image?imageUrl=...
pub async fn delete_image(
    State(state): State<AppState>,
    Query(query): Query<DeleteImageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let url = query
        .image_url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::Validation("imageUrl parameter is required".into()))?;

    let filename = MediaStore::filename_from_url(&url)
        .ok_or_else(|| ApiError::NotFound("Image not found".into()))?;

    if state.media.delete(&filename).await? {
        Ok(Json(AckResponse {
            message: "Image deleted successfully".into(),
        }))
    } else {
        Err(ApiError::NotFound("Image not found".into()))
    }
}
