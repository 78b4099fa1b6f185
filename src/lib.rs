use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware,
    response::IntoResponse,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Gateway core: codec, extractor, classifier, policy, orchestrator.
pub mod auth;
pub mod credentials;
pub mod gateway;
pub mod policy;
pub mod routing;

// Ambient concerns and the collaborators around the gateway.
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;

pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::{AuthUser, Role, TokenCodec};
pub use config::AppConfig;
pub use gateway::{Gateway, GatewayState, gateway_middleware};
pub use policy::AccessPolicy;
pub use repository::{IdentityStoreState, InMemoryIdentityStore, PostgresIdentityStore};
pub use routing::RouteClassifier;

/// ApiDoc
///
/// OpenAPI document for the collaborator endpoints, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::logout, handlers::register,
        handlers::get_me, handlers::change_password,
        handlers::list_users, handlers::create_user, handlers::update_user
    ),
    components(
        schemas(
            Role, models::UserProfile, models::LoginRequest, models::LoginResponse,
            models::RegisterRequest, models::RegisterResponse, models::MessageResponse,
            models::ProfileResponse, models::UserListResponse, models::ChangePasswordRequest,
            models::CreateUserRequest, models::CreatedUserResponse, models::UpdateUserRequest,
            models::UpdatedUserResponse,
        )
    ),
    tags(
        (name = "helpdesk-gateway", description = "Support desk authentication API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Everything a request may need, built once at startup and cloned cheaply per request.
/// Nothing in here is mutated after construction.
#[derive(Clone)]
pub struct AppState {
    pub repo: IdentityStoreState,
    pub config: AppConfig,
    pub codec: Arc<TokenCodec>,
    pub gateway: GatewayState,
}

impl AppState {
    /// State with the built-in route lists and access rules.
    pub fn new(config: AppConfig, repo: IdentityStoreState) -> Self {
        Self::with_tables(
            config,
            repo,
            RouteClassifier::with_default_routes(),
            AccessPolicy::with_default_rules(),
        )
    }

    /// State with caller-supplied route lists and access rules.
    pub fn with_tables(
        config: AppConfig,
        repo: IdentityStoreState,
        classifier: RouteClassifier,
        policy: AccessPolicy,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(&config.jwt_secret));
        let gateway = Arc::new(Gateway::new(
            codec.clone(),
            classifier,
            policy,
            config.cookie_name.clone(),
        ));

        Self {
            repo,
            config,
            codec,
            gateway,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for IdentityStoreState {
    fn from_ref(app_state: &AppState) -> IdentityStoreState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for GatewayState {
    fn from_ref(app_state: &AppState) -> GatewayState {
        app_state.gateway.clone()
    }
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "success": false, "message": "Not found" })),
    )
}

/// cors_layer
///
/// Cross-origin policy for the browser frontends. It sits outside the gateway, so preflight
/// `OPTIONS` requests are answered here and never reach authentication.
pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(24 * 60 * 60))
}

/// create_router
///
/// Assembles the routes, wraps all of them in the authentication gateway, and adds the
/// observability and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");
    let cors = cors_layer(&state.config);

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .nest("/api/private/admin", admin::admin_routes())
        .fallback(not_found)
        // The gateway sees every request, matched or not, and decides from the path alone.
        .layer(middleware::from_fn_with_state(
            state.gateway.clone(),
            gateway_middleware,
        ))
        .with_state(state);

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
/// Span for every HTTP request, tagged with the `x-request-id` so all log lines of one request
/// correlate. Only the path is recorded: query strings may carry secrets.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}
