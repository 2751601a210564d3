use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use trailbook_db::Database;

use crate::auth;
use crate::images;
use crate::media::MediaStore;
use crate::middleware::require_auth;
use crate::stories;

/// Shared application state for all route handlers. Built once at startup;
/// no handler reads configuration from the environment.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub media: Arc<MediaStore>,
    pub jwt_secret: String,
    /// Absolute prefix for generated image URLs.
    pub base_url: String,
    pub assets_dir: PathBuf,
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/create-account", post(auth::register))
        .route("/login", post(auth::login))
        // Image endpoints sit outside the auth guard; kept that way until
        // product intent says otherwise.
        .route("/image-upload", post(images::upload_image))
        .route("/delete-image", delete(images::delete_image));

    let protected_routes = Router::new()
        .route("/get-user", get(auth::get_user))
        .route("/add-travel-story", post(stories::add_story))
        .route("/get-all-stories", get(stories::get_all_stories))
        .route("/edit-story/{id}", put(stories::edit_story))
        .route("/delete-story/{id}", delete(stories::delete_story))
        .route(
            "/update-is-favourite/{id}",
            put(stories::update_is_favourite),
        )
        .route("/search", get(stories::search))
        .route("/travel-stories/filter", get(stories::filter_by_date))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", ServeDir::new(state.media.dir()))
        .nest_service("/assets", ServeDir::new(state.assets_dir.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
