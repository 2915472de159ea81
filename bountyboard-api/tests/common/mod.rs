/// Common test utilities for API integration tests
///
/// These tests require a running PostgreSQL database. When DATABASE_URL is
/// not set, [`TestContext::new`] returns None and the test skips itself.
/// Each context carries its own license catalog with unique keys, so tests
/// can share one database and run in parallel.

use bountyboard_api::app::{build_router, AppState};
use bountyboard_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig, LedgerConfig};
use bountyboard_shared::auth::{jwt, password};
use bountyboard_shared::db::migrations::run_migrations;
use bountyboard_shared::license::{LicenseCatalog, LicenseKeyEntry};
use bountyboard_shared::models::user::{CreateUser, User, UserRole};
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tower::Service as _;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Test context: a router wired to a real database
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,

    /// Unique catalog keys available for team creation, one per call
    keys: Vec<String>,
}

impl TestContext {
    /// Builds a context, or None when DATABASE_URL is not set
    pub async fn new() -> Option<Self> {
        let url = std::env::var("DATABASE_URL").ok()?;

        let db = PgPool::connect(&url).await.expect("Failed to connect");
        run_migrations(&db).await.expect("Failed to run migrations");

        let keys: Vec<String> = (0..8)
            .map(|_| format!("BNTY-API-{}", Uuid::new_v4().simple()))
            .collect();
        let catalog = LicenseCatalog::from_entries(
            keys.iter()
                .map(|key| LicenseKeyEntry {
                    key: key.clone(),
                    max_users: 10,
                    expiry_date: None,
                    notes: None,
                })
                .collect(),
        );

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            database: DatabaseConfig {
                url,
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: TEST_JWT_SECRET.to_string(),
            },
            ledger: LedgerConfig {
                penalty_multiplier: Decimal::new(1, 1),
            },
        };

        let state = AppState::new(db.clone(), config, catalog);
        let app = build_router(state);

        Some(TestContext { db, app, keys })
    }

    /// Takes one unused license key from the context's catalog
    pub fn fresh_license_key(&mut self) -> String {
        self.keys.pop().expect("Test context ran out of license keys")
    }

    /// Creates an active user with a unique identity and the shared test password
    pub async fn create_user(&self, role: UserRole) -> User {
        let tag = Uuid::new_v4().simple().to_string();
        let hash = password::hash_password(TEST_PASSWORD).expect("Failed to hash password");
        User::create(
            &self.db,
            CreateUser {
                username: format!("api-{}", &tag[..12]),
                email: format!("{}@api.example", &tag[..12]),
                password_hash: hash,
                role,
                team_id: None,
            },
        )
        .await
        .expect("Failed to create test user")
    }

    /// Mints a token for a user, mirroring what login would issue
    pub async fn token_for(&self, user: &User) -> String {
        let mut claims = jwt::Claims::new(user.id, user.username.clone(), user.role.clone());

        if let Some(team_id) = user.team_id {
            let team = bountyboard_shared::models::team::Team::find_by_id(&self.db, team_id)
                .await
                .expect("Failed to fetch team")
                .expect("Team should exist");
            let license = bountyboard_shared::models::license::License::find_by_team(&self.db, team_id)
                .await
                .expect("Failed to fetch license");
            claims = claims.with_team(
                team.id,
                team.name,
                license.as_ref().map(|l| l.license_key.clone()),
                license.and_then(|l| l.expiration_date).map(|d| d.timestamp()),
            );
        }

        jwt::create_token(&claims, TEST_JWT_SECRET).expect("Failed to mint token")
    }

    /// Sends a request and returns the response
    pub async fn send(&self, request: Request<Body>) -> Response<axum::body::Body> {
        self.app.clone().call(request).await.expect("App call failed")
    }
}

/// Builds a JSON request with an optional bearer token
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).expect("Bad request")
}

/// Builds an empty-bodied request with an optional bearer token
pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("Bad request")
}

/// Reads a response body as JSON, asserting the expected status first
pub async fn json_body(
    response: Response<axum::body::Body>,
    expected: StatusCode,
) -> serde_json::Value {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    if status != expected {
        panic!(
            "Expected {}, got {}: {}",
            expected,
            status,
            String::from_utf8_lossy(&body)
        );
    }
    serde_json::from_slice(&body).expect("Body is not JSON")
}
