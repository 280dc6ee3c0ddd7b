use petition_api::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    photos::{FsPhotoStore, PhotoState},
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The asynchronous entry point, responsible for initializing all core
/// components: configuration, logging, database, photo storage, and the HTTP
/// server.
#[tokio::main]
async fn main() {
    // 1. Configuration & environment loading (fail-fast).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging filter setup. RUST_LOG takes priority, with sensible defaults
    // for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "petition_api=debug,tower_http=info,axum=trace".into());

    // 3. Structured logging format, selected by APP_ENV: pretty locally, JSON in
    // production for log aggregators.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database initialization (Postgres).
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Photo storage initialization. The flat photo directory is provisioned
    // at startup so the first upload never races directory creation.
    let photo_store = FsPhotoStore::new(config.photos_dir.clone());
    photo_store
        .ensure_dir_exists()
        .await
        .expect("FATAL: Failed to create the photo storage directory.");
    let photos = Arc::new(photo_store) as PhotoState;

    // 6. Unified state assembly.
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        photos,
        config,
    };

    // 7. Router and server startup.
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind HTTP listener.");

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
