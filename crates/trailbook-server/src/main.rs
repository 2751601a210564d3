use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use trailbook_api::media::MediaStore;
use trailbook_api::routes::{self, AppState};
use trailbook_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trailbook=debug,tower_http=debug".into()),
        )
        .init();

    // Config, read once; everything downstream gets it through AppState
    let jwt_secret =
        std::env::var("TRAILBOOK_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("TRAILBOOK_DB_PATH").unwrap_or_else(|_| "trailbook.db".into());
    let host = std::env::var("TRAILBOOK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("TRAILBOOK_PORT")
        .unwrap_or_else(|_| "8000".into())
        .parse()?;
    let uploads_dir: PathBuf = std::env::var("TRAILBOOK_UPLOADS_DIR")
        .unwrap_or_else(|_| "./uploads".into())
        .into();
    let assets_dir: PathBuf = std::env::var("TRAILBOOK_ASSETS_DIR")
        .unwrap_or_else(|_| "./assets".into())
        .into();
    let base_url = std::env::var("TRAILBOOK_BASE_URL")
        .unwrap_or_else(|_| format!("http://localhost:{}", port));

    // Init database and media storage
    let db = Database::open(&PathBuf::from(&db_path))?;
    let media = MediaStore::new(uploads_dir).await?;

    let state = AppState {
        db: Arc::new(db),
        media: Arc::new(media),
        jwt_secret,
        base_url,
        assets_dir,
    };

    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Trailbook server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
