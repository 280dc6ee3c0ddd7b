use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod photos;
pub mod repository;

// Routing, segregated by resource (users, petitions).
pub mod routes;
use routes::{petitions, users};

// --- Public Re-exports ---

// Makes core state types easily accessible to the binary entry point and tests.
pub use config::AppConfig;
pub use photos::{FsPhotoStore, MemoryPhotoStore, PhotoState};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation for the application. Aggregates all
/// API paths and data schemas decorated with the `#[utoipa::path]` and
/// `#[derive(utoipa::ToSchema)]` macros; the resulting JSON is served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::login, handlers::logout,
        handlers::get_user, handlers::update_user,
        handlers::get_user_photo, handlers::set_user_photo, handlers::delete_user_photo,
        handlers::list_petitions, handlers::create_petition, handlers::get_categories,
        handlers::get_petition, handlers::update_petition, handlers::delete_petition,
        handlers::list_signatures, handlers::sign_petition, handlers::remove_signature,
        handlers::get_petition_photo, handlers::set_petition_photo,
    ),
    components(
        schemas(
            models::Category, models::PetitionOverview, models::PetitionDetail,
            models::Signatory, models::UserProfile,
            models::RegisterRequest, models::LoginRequest, models::UpdateUserRequest,
            models::CreatePetitionRequest, models::UpdatePetitionRequest,
            models::RegisterResponse, models::LoginResponse, models::CreatePetitionResponse,
        )
    ),
    tags(
        (name = "petition-api", description = "Petition Platform API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all application services
/// and configuration, shared across every incoming request.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts relational store access.
    pub repo: RepositoryState,
    /// Photo Layer: abstracts the flat photo directory.
    pub photos: PhotoState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These allow extractors and handlers to pull individual components from the
// shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for PhotoState {
    fn from_ref(app_state: &AppState) -> PhotoState {
        app_state.photos.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global
/// middleware, and registers the application state. The REST surface is nested
/// under the versioned `/api/v1` root.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let api = users::user_routes().merge(petitions::petition_routes());

    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Liveness probe for monitoring and load balancer checks.
        .route("/health", axum::routing::get(|| async { "ok" }))
        // Versioned API root. Authentication is enforced per-handler via the
        // AuthUser/MaybeAuthUser extractors, since most paths mix public and
        // owner-only verbs.
        .nest("/api/v1", api)
        .with_state(state);

    // Observability and correlation layers, applied outermost.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the TraceLayer span so every log line for a single request is
/// correlated by the generated x-request-id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
