use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Bearer token claims. Canonical definition lives here so the issuing
/// handlers and the auth middleware share one shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Auth --

/// Required-field checks happen in the handlers (missing fields are a 400
/// with an envelope, not a deserialization rejection), so every field is
/// optional at the serde level.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Public view of a user embedded in auth responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub error: bool,
    pub user: UserPublic,
    pub access_token: String,
    pub message: String,
}

/// Full profile returned by `/get-user`. The password digest never leaves
/// the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserProfile,
    pub message: String,
}

// -- Stories --

/// Wire representation of a travel story.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub story: String,
    #[serde(rename = "visitedLocation")]
    pub visited_locations: Vec<String>,
    pub visited_date: DateTime<Utc>,
    pub image_url: String,
    pub is_favourite: bool,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStoryRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub story: Option<String>,
    #[serde(default, rename = "visitedLocation")]
    pub visited_locations: Option<Vec<String>>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub visited_date: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Same fields as [`AddStoryRequest`], but `imageUrl` is required on edit
/// while add falls back to the placeholder. The asymmetry is deliberate.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditStoryRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub story: Option<String>,
    #[serde(default, rename = "visitedLocation")]
    pub visited_locations: Option<Vec<String>>,
    #[serde(default)]
    pub visited_date: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFavouriteRequest {
    #[serde(default)]
    pub is_favourite: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct StoryResponse {
    pub story: Story,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StoriesResponse {
    pub stories: Vec<Story>,
}

// -- Images --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub message: String,
}
