use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;
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
pub mod gate;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod repository;
pub mod session;
pub mod validation;

// Route groups (public pages, admin API).
pub mod routes;
use routes::{admin, public};

// --- Public Re-exports ---

pub use config::{AppConfig, ConfigError};
pub use error::ApiError;
pub use repository::{InMemoryRepository, PostgrestRepository, RepositoryState};
pub use session::SessionResolver;

use identity::{IdentityState, JwtIdentityProvider, SupabaseIdentityProvider};

/// ApiDoc
///
/// Aggregates the `#[utoipa::path]` handlers and `ToSchema` models into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_polls, handlers::create_poll,
        handlers::update_poll, handlers::delete_poll,
    ),
    components(
        schemas(
            models::Poll, models::CreatePollRequest, models::UpdatePollRequest,
            models::PollResponse, models::PollListResponse,
            error::ErrorBody, validation::Violation,
        )
    ),
    tags(
        (name = "poll-admin", description = "Poll administration API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container for the services every request needs. Cloning it
/// only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    /// External poll store (PostgREST in production, in-memory locally).
    pub repo: RepositoryState,
    /// Cookie-backed session resolution in front of the identity provider.
    pub sessions: SessionResolver,
    /// Configuration loaded once at startup.
    pub config: AppConfig,
}

impl AppState {
    /// from_config
    ///
    /// Wires the concrete collaborators selected by the configuration: a
    /// configured Supabase project gives the GoTrue identity provider and the
    /// PostgREST store, otherwise tokens are verified locally against the JWT
    /// secret and polls live in memory.
    pub fn from_config(config: AppConfig) -> Result<Self, ConfigError> {
        let (repo, provider): (RepositoryState, IdentityState) = match &config.supabase {
            Some(supabase) => {
                let client = reqwest::Client::new();
                (
                    Arc::new(PostgrestRepository::new(
                        client.clone(),
                        &supabase.url,
                        &supabase.service_role_key,
                    )),
                    Arc::new(SupabaseIdentityProvider::new(
                        client,
                        &supabase.url,
                        &supabase.service_role_key,
                    )),
                )
            }
            None => {
                let secret = config
                    .jwt_secret
                    .as_deref()
                    .ok_or(ConfigError::Missing("SUPABASE_JWT_SECRET"))?;
                (
                    Arc::new(InMemoryRepository::new()),
                    Arc::new(JwtIdentityProvider::new(secret)),
                )
            }
        };

        Ok(Self {
            repo,
            sessions: SessionResolver::new(provider, config.session_cookies.clone()),
            config,
        })
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SessionResolver {
    fn from_ref(app_state: &AppState) -> SessionResolver {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routes, puts the access gate in front of all of them (the
/// fallback included) and wraps everything in the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Handlers re-check the admin role themselves and answer with JSON errors.
        .nest("/api/admin", admin::admin_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::access_gate,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
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
/// Opens the per-request span, tagged with the `x-request-id` set by the
/// layer above so every log line of a request can be correlated.
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
