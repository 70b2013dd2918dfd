use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use tower_sessions::SessionStore;
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
pub mod query;
pub mod repository;
pub mod seed;
pub mod session;

// Routing segregated by access level (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};
use session::CurrentUser;

// --- Public Re-exports ---

pub use auth::AuthService;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::landing, handlers::list_pokemon, handlers::get_pokemon_detail,
        handlers::get_pokemon_edit, handlers::update_pokemon, handlers::list_trainers,
        handlers::get_trainer_detail, handlers::login_form, handlers::login,
        handlers::register_form, handlers::register, handlers::logout
    ),
    components(
        schemas(
            models::Pokemon, models::TrainerAffiliation, models::Trainer, models::Role,
            models::SessionUser, models::Credentials, models::UpdatePokemonRequest,
            models::PokemonEditForm, models::PokemonDetail, models::TrainerDetail,
            models::RegisterResponse, models::FormDescription, models::Welcome,
        )
    ),
    tags(
        (name = "pokedex-portal", description = "Pokémon & Trainer catalogue API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container of services and configuration, cloned into every
/// request. Handlers and extractors pull the parts they need via `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Data store adapter (Postgres or in-memory).
    pub repo: RepositoryState,
    /// Registration, login and account seeding.
    pub auth: AuthService,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Wires the services around a repository using the given configuration.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            auth: AuthService::new(repo.clone(), config.bcrypt_cost),
            repo,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(app_state: &AppState) -> AuthService {
        app_state.auth.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// session_gate
///
/// Route-layer middleware for everything that needs a login. The `CurrentUser`
/// extractor rejects anonymous requests with a redirect to `/login`, so the wrapped
/// handler only ever runs for an authenticated session.
async fn session_gate(_user: CurrentUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware, and
/// registers the application state. Sessions are kept in `session_store`.
pub fn create_router<Store>(state: AppState, session_store: Store) -> Router
where
    Store: SessionStore + Clone,
{
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Session-gated routes: authenticated and admin share the gate. The role
    // check happens in the admin handlers' `AdminUser` extractor.
    let gated = Router::new()
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes())
        .route_layer(middleware::from_fn(session_gate));

    let sessions = session::session_layer(session_store, &state.config);

    // 3. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(gated)
        .with_state(state)
        .layer(sessions);

    // 4. Observability and Correlation Layers
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
/// Builds the per-request tracing span, tagged with the `x-request-id` header so every
/// log line of one request can be correlated.
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
