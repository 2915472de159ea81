/// Application state and router builder
///
/// Defines the shared application state and builds the Axum router with all
/// routes and middleware layers.
///
/// # Example
///
/// ```no_run
/// use bountyboard_api::{app::AppState, config::Config};
/// use bountyboard_shared::license::LicenseCatalog;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config, LicenseCatalog::from_env());
/// let app = bountyboard_api::app::build_router(state);
/// # let _ = app;
/// # Ok(())
/// # }
/// ```

use axum::{
    http::{header, Method},
    routing::{delete, get, post, put},
    Router,
};
use bountyboard_shared::auth::middleware::{create_jwt_middleware, create_license_gate};
use bountyboard_shared::license::LicenseCatalog;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Config;

/// Shared application state
///
/// Cloned per request via Axum's `State` extractor; Arc keeps the clone
/// cheap. The license catalog is parsed once at startup and only ever read.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// In-memory license key catalog
    pub catalog: Arc<LicenseCatalog>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, catalog: LicenseCatalog) -> Self {
        Self {
            db,
            config: Arc::new(config),
            catalog: Arc::new(catalog),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # liveness (public)
/// ├── /v1/
/// │   ├── /auth/
/// │   │   ├── POST /register           # public
/// │   │   ├── POST /login              # public
/// │   │   ├── GET  /me                 # token
/// │   │   └── PUT  /me                 # token
/// │   ├── /teams/
/// │   │   ├── POST   /create           # token
/// │   │   ├── GET    /:id              # token, same team only
/// │   │   ├── POST   /:id/members      # token, manager+
/// │   │   ├── DELETE /:id/members/:uid # token, manager+
/// │   │   └── DELETE /:id              # token, admin
/// │   ├── /tasks/                      # token + license gate
/// │   │   ├── POST /
/// │   │   ├── GET  /
/// │   │   ├── POST /:id/assign
/// │   │   └── PUT  /:id/status
/// │   └── /bounties/                   # token + license gate
/// │       ├── POST /adjust             # admin
/// │       ├── GET  /statistics
/// │       └── GET  /transactions
/// ```
///
/// The license gate re-derives license validity from the database on every
/// request it guards; team and auth routes stay reachable for users whose
/// team has lost its license, so they can see what happened.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let jwt_layer = axum::middleware::from_fn(create_jwt_middleware(
        state.db.clone(),
        state.config.jwt.secret.clone(),
    ));
    let license_layer = axum::middleware::from_fn(create_license_gate(state.db.clone()));

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Public: no token required
    let auth_public = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let auth_private = Router::new()
        .route("/me", get(routes::auth::me))
        .route("/me", put(routes::auth::update_me))
        .layer(jwt_layer.clone());

    let team_routes = Router::new()
        .route("/create", post(routes::teams::create_team))
        .route("/:id", get(routes::teams::get_team))
        .route("/:id", delete(routes::teams::delete_team))
        .route("/:id/members", post(routes::teams::add_member))
        .route(
            "/:id/members/:user_id",
            delete(routes::teams::remove_member),
        )
        .layer(jwt_layer.clone());

    let task_routes = Router::new()
        .route("/", post(routes::tasks::create_task))
        .route("/", get(routes::tasks::list_tasks))
        .route("/:id", get(routes::tasks::get_task))
        .route("/:id/assign", post(routes::tasks::assign_task))
        .route("/:id/status", put(routes::tasks::update_status))
        .layer(license_layer.clone())
        .layer(jwt_layer.clone());

    let bounty_routes = Router::new()
        .route("/adjust", post(routes::bounties::adjust_balance))
        .route("/statistics", get(routes::bounties::statistics))
        .route("/transactions", get(routes::bounties::list_transactions))
        .layer(license_layer)
        .layer(jwt_layer);

    let v1_routes = Router::new()
        .nest("/auth", auth_public.merge(auth_private))
        .nest("/teams", team_routes)
        .nest("/tasks", task_routes)
        .nest("/bounties", bounty_routes);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
