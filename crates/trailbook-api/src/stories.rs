use anyhow::anyhow;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use trailbook_db::models::StoryRow;
use trailbook_types::api::{
    AckResponse, AddStoryRequest, Claims, EditStoryRequest, SetFavouriteRequest, StoriesResponse,
    Story, StoryResponse,
};

use crate::error::{ApiError, join_error};
use crate::media::MediaStore;
use crate::routes::AppState;

fn placeholder_url(base_url: &str) -> String {
    format!("{}/uploads/placeholder.png", base_url.trim_end_matches('/'))
}

fn missing_fields() -> ApiError {
    ApiError::Validation("All fields are required".into())
}

fn required(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.is_empty())
}

/// Convert a stored row to the wire shape. Row contents are
/// server-written, so any conversion failure is an internal error.
fn to_story(row: StoryRow) -> Result<Story, ApiError> {
    let visited_locations = row
        .locations()
        .map_err(|e| anyhow!("corrupt visited_locations for story {}: {}", row.id, e))?;
    let visited_date = DateTime::from_timestamp_millis(row.visited_date)
        .ok_or_else(|| anyhow!("visited_date out of range for story {}", row.id))?;
    let id: Uuid = row
        .id
        .parse()
        .map_err(|e| anyhow!("stored story id unparseable: {}", e))?;
    let user_id: Uuid = row
        .user_id
        .parse()
        .map_err(|e| anyhow!("stored owner id unparseable: {}", e))?;

    Ok(Story {
        id,
        user_id,
        title: row.title,
        story: row.story,
        visited_locations,
        visited_date,
        image_url: row.image_url,
        is_favourite: row.is_favourite,
        created_at: row.created_at,
    })
}

fn to_stories(rows: Vec<StoryRow>) -> Result<Vec<Story>, ApiError> {
    rows.into_iter().map(to_story).collect()
}

pub async fn add_story(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddStoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = required(req.title).ok_or_else(missing_fields)?;
    let story_text = required(req.story).ok_or_else(missing_fields)?;
    let locations = req
        .visited_locations
        .filter(|v| !v.is_empty())
        .ok_or_else(missing_fields)?;
    let visited_date = req.visited_date.ok_or_else(missing_fields)?;
    if DateTime::<Utc>::from_timestamp_millis(visited_date).is_none() {
        return Err(ApiError::Validation("visitedDate is not a valid date".into()));
    }
    let image_url =
        required(req.image_url).unwrap_or_else(|| placeholder_url(&state.base_url));

    let locations_json =
        serde_json::to_string(&locations).map_err(|e| ApiError::Internal(e.into()))?;
    let id = Uuid::new_v4();
    let uid = claims.sub.to_string();

    let db = state.db.clone();
    let row = tokio::task::spawn_blocking(move || {
        db.insert_story(
            &id.to_string(),
            &uid,
            &title,
            &story_text,
            &locations_json,
            visited_date,
            &image_url,
        )
    })
    .await
    .map_err(join_error)?
    // a failed save is reported as a client error, not a server fault
    .map_err(|e| ApiError::Validation(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(StoryResponse {
            story: to_story(row)?,
            message: "Story added successfully".into(),
        }),
    ))
}

pub async fn get_all_stories(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let uid = claims.sub.to_string();
    let rows = tokio::task::spawn_blocking(move || db.stories_for_owner(&uid))
        .await
        .map_err(join_error)?
        .map_err(ApiError::from)?;

    Ok(Json(StoriesResponse {
        stories: to_stories(rows)?,
    }))
}

pub async fn edit_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EditStoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = required(req.title).ok_or_else(missing_fields)?;
    let story_text = required(req.story).ok_or_else(missing_fields)?;
    let locations = req
        .visited_locations
        .filter(|v| !v.is_empty())
        .ok_or_else(missing_fields)?;
    let visited_date = req.visited_date.ok_or_else(missing_fields)?;
    // unlike add, edit requires the image URL
    let image_url = required(req.image_url).ok_or_else(missing_fields)?;
    if DateTime::<Utc>::from_timestamp_millis(visited_date).is_none() {
        return Err(ApiError::Validation("visitedDate is not a valid date".into()));
    }

    let locations_json =
        serde_json::to_string(&locations).map_err(|e| ApiError::Internal(e.into()))?;
    let uid = claims.sub.to_string();

    let db = state.db.clone();
    let row = tokio::task::spawn_blocking(move || {
        db.update_story(
            &id,
            &uid,
            &title,
            &story_text,
            &locations_json,
            visited_date,
            &image_url,
        )
    })
    .await
    .map_err(join_error)?
    .map_err(ApiError::from)?
    .ok_or_else(|| ApiError::NotFound("Travel story not found".into()))?;

    Ok(Json(StoryResponse {
        story: to_story(row)?,
        message: "Travel story updated successfully".into(),
    }))
}

pub async fn delete_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let db = state.db.clone();
    let row = tokio::task::spawn_blocking(move || db.delete_story(&id, &uid))
        .await
        .map_err(join_error)?
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound("Travel story not found".into()))?;

    // Best-effort image cleanup; the story is already gone either way.
    if let Some(filename) = MediaStore::filename_from_url(&row.image_url) {
        if let Err(e) = state.media.delete(&filename).await {
            error!("failed to delete image for story {}: {:#}", row.id, e);
        }
    }

    Ok(Json(AckResponse {
        message: "Travel story deleted successfully".into(),
    }))
}

pub async fn update_is_favourite(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SetFavouriteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let is_favourite = req
        .is_favourite
        .ok_or_else(|| ApiError::Validation("isFavourite is required".into()))?;

    let uid = claims.sub.to_string();
    let db = state.db.clone();
    let row = tokio::task::spawn_blocking(move || db.set_favourite(&id, &uid, is_favourite))
        .await
        .map_err(join_error)?
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound("Travel story not found".into()))?;

    Ok(Json(StoryResponse {
        story: to_story(row)?,
        message: "Travel story updated successfully".into(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    // a missing query is reported as 404, not 400
    let query = params
        .query
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::NotFound("Please enter a search query".into()))?;

    let uid = claims.sub.to_string();
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.search_stories(&uid, &query))
        .await
        .map_err(join_error)?
        .map_err(ApiError::from)?;

    Ok(Json(StoriesResponse {
        stories: to_stories(rows)?,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateFilterQuery {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

pub async fn filter_by_date(
    State(state): State<AppState>,
    Query(params): Query<DateFilterQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    // A missing or unparseable bound leaves the range undefined, which
    // matches nothing; it is not a validation error.
    let start = params.start_date.and_then(|v| v.parse::<i64>().ok());
    let end = params.end_date.and_then(|v| v.parse::<i64>().ok());

    let uid = claims.sub.to_string();
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.filter_stories_by_date(&uid, start, end))
        .await
        .map_err(join_error)?
        .map_err(ApiError::from)?;

    Ok(Json(StoriesResponse {
        stories: to_stories(rows)?,
    }))
}
