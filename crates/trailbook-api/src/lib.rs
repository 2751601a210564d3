pub mod auth;
pub mod error;
pub mod images;
pub mod media;
pub mod middleware;
pub mod routes;
pub mod stories;
