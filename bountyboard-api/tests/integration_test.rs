/// Integration tests for the BountyBoard API
///
/// End-to-end flows over the real router and a real database:
/// - registration, login, and token claims
/// - team creation with the fresh-token swap
/// - the license gate's denial messages and lazy expiry persistence
/// - the task lifecycle through to the bounty payout
///
/// These tests require a running PostgreSQL database and are skipped when
/// DATABASE_URL is not set.

mod common;

use axum::http::StatusCode;
use bountyboard_shared::auth::jwt;
use bountyboard_shared::models::license::{CreateLicense, License};
use bountyboard_shared::models::team::{CreateTeam, Team};
use bountyboard_shared::models::user::{User, UserRole};
use chrono::{Duration, Utc};
use common::TestContext;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_health_endpoint() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let response = ctx.send(common::empty_request("GET", "/health", None)).await;
    let body = common::json_body(response, StatusCode::OK).await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_authentication_required() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let response = ctx
        .send(common::empty_request("GET", "/v1/auth/me", None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_login_and_token_claims() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let tag = Uuid::new_v4().simple().to_string();
    let username = format!("flow-{}", &tag[..12]);
    let email = format!("{}@flow.example", &tag[..12]);

    let response = ctx
        .send(common::json_request(
            "POST",
            "/v1/auth/register",
            None,
            json!({
                "username": username,
                "email": email,
                "password": common::TEST_PASSWORD,
            }),
        ))
        .await;
    let registered = common::json_body(response, StatusCode::CREATED).await;
    assert_eq!(registered["username"], username.as_str());
    assert!(registered.get("password_hash").is_none());

    // Login by email works too
    let response = ctx
        .send(common::json_request(
            "POST",
            "/v1/auth/login",
            None,
            json!({
                "identifier": email,
                "password": common::TEST_PASSWORD,
            }),
        ))
        .await;
    let login = common::json_body(response, StatusCode::OK).await;

    assert_eq!(login["no_team"], true);
    assert!(login.get("team").is_none());

    // The token carries an 8-hour lifetime and no team claims yet
    let token = login["token"].as_str().expect("Token should be a string");
    let claims = jwt::validate_token(token, common::TEST_JWT_SECRET).expect("Token should verify");
    assert_eq!(claims.exp - claims.iat, jwt::TOKEN_LIFETIME_SECONDS);
    assert_eq!(claims.username, username);
    assert!(claims.team_id.is_none());
}

#[tokio::test]
async fn test_invalid_credentials_are_indistinguishable() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let user = ctx.create_user(UserRole::Member).await;

    // Wrong password
    let response = ctx
        .send(common::json_request(
            "POST",
            "/v1/auth/login",
            None,
            json!({ "identifier": user.username, "password": "not the password" }),
        ))
        .await;
    let wrong_pw = common::json_body(response, StatusCode::UNAUTHORIZED).await;

    // Unknown identifier
    let response = ctx
        .send(common::json_request(
            "POST",
            "/v1/auth/login",
            None,
            json!({ "identifier": "nobody@nowhere.example", "password": "whatever" }),
        ))
        .await;
    let unknown = common::json_body(response, StatusCode::UNAUTHORIZED).await;

    assert_eq!(wrong_pw["message"], unknown["message"]);
    assert_eq!(wrong_pw["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_team_creation_swaps_token() {
    let Some(mut ctx) = TestContext::new().await else {
        return;
    };

    let user = ctx.create_user(UserRole::Member).await;
    let old_token = ctx.token_for(&user).await;

    // Teamless token cannot reach the task routes
    let response = ctx
        .send(common::empty_request("GET", "/v1/tasks", Some(&old_token)))
        .await;
    let denied = common::json_body(response, StatusCode::FORBIDDEN).await;
    assert_eq!(denied["message"], "No team assigned");

    let key = ctx.fresh_license_key();
    let response = ctx
        .send(common::json_request(
            "POST",
            "/v1/teams/create",
            Some(&old_token),
            json!({ "name": format!("Swap {}", Uuid::new_v4().simple()), "license_key": key }),
        ))
        .await;
    let created = common::json_body(response, StatusCode::CREATED).await;

    // The response carries a replacement token with the team claims baked in
    let new_token = created["token"].as_str().expect("Token should be a string");
    let claims =
        jwt::validate_token(new_token, common::TEST_JWT_SECRET).expect("Token should verify");
    assert_eq!(
        claims.team_id.map(|id| id.to_string()),
        created["team"]["id"].as_str().map(String::from)
    );
    assert_eq!(claims.license_key.as_deref(), Some(key.as_str()));

    let response = ctx
        .send(common::empty_request("GET", "/v1/tasks", Some(new_token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_team_detail_is_isolated() {
    let Some(mut ctx) = TestContext::new().await else {
        return;
    };

    let alice = ctx.create_user(UserRole::Member).await;
    let alice_key = ctx.fresh_license_key();
    let response = ctx
        .send(common::json_request(
            "POST",
            "/v1/teams/create",
            Some(&ctx.token_for(&alice).await),
            json!({ "name": format!("Iso {}", Uuid::new_v4().simple()), "license_key": alice_key }),
        ))
        .await;
    let created = common::json_body(response, StatusCode::CREATED).await;
    let alice_team = created["team"]["id"].as_str().expect("Team id").to_string();

    // An outsider gets 403, not 404
    let bob = ctx.create_user(UserRole::Member).await;
    let response = ctx
        .send(common::empty_request(
            "GET",
            &format!("/v1/teams/{}", alice_team),
            Some(&ctx.token_for(&bob).await),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // A member sees team and member list
    let alice = User::find_by_id(&ctx.db, alice.id).await.unwrap().unwrap();
    let response = ctx
        .send(common::empty_request(
            "GET",
            &format!("/v1/teams/{}", alice_team),
            Some(&ctx.token_for(&alice).await),
        ))
        .await;
    let detail = common::json_body(response, StatusCode::OK).await;
    assert_eq!(detail["members"].as_array().map(Vec::len), Some(1));
}

/// Inserts a team and license row directly, bypassing the catalog
async fn seed_team_with_license(
    ctx: &TestContext,
    user: &User,
    is_active: bool,
    expiration: Option<chrono::DateTime<Utc>>,
) -> (Team, License) {
    let mut conn = ctx.db.acquire().await.expect("Failed to acquire conn");

    let team = Team::insert(
        &mut conn,
        CreateTeam {
            name: format!("Seed {}", Uuid::new_v4().simple()),
            description: None,
            created_by: user.id,
        },
    )
    .await
    .expect("Failed to insert team");

    let license = License::insert(
        &mut conn,
        CreateLicense {
            team_id: team.id,
            license_key: format!("BNTY-SEED-{}", Uuid::new_v4().simple()),
            max_users: 10,
            expiration_date: expiration,
        },
    )
    .await
    .expect("Failed to insert license");

    User::set_team(&mut conn, user.id, Some(team.id))
        .await
        .expect("Failed to attach user");
    drop(conn);

    if !is_active {
        License::deactivate(&ctx.db, license.id)
            .await
            .expect("Failed to deactivate license");
    }

    (team, license)
}

#[tokio::test]
async fn test_expired_license_is_denied_and_persisted() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let user = ctx.create_user(UserRole::Member).await;
    let (_team, license) =
        seed_team_with_license(&ctx, &user, true, Some(Utc::now() - Duration::days(1))).await;

    let user = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    let response = ctx
        .send(common::empty_request(
            "GET",
            "/v1/tasks",
            Some(&ctx.token_for(&user).await),
        ))
        .await;
    let denied = common::json_body(response, StatusCode::FORBIDDEN).await;
    assert_eq!(denied["message"], "Your team's license has expired");

    // The gate persisted the expiry on first contact
    let license = License::find_by_team(&ctx.db, license.team_id)
        .await
        .expect("Failed to fetch license")
        .expect("License should exist");
    assert!(!license.is_active);
}

#[tokio::test]
async fn test_revoked_license_is_denied() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let user = ctx.create_user(UserRole::Member).await;
    seed_team_with_license(&ctx, &user, false, Some(Utc::now() + Duration::days(30))).await;

    let user = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    let response = ctx
        .send(common::empty_request(
            "GET",
            "/v1/tasks",
            Some(&ctx.token_for(&user).await),
        ))
        .await;
    let denied = common::json_body(response, StatusCode::FORBIDDEN).await;
    assert_eq!(denied["message"], "Your team's license has been revoked");
}

#[tokio::test]
async fn test_task_lifecycle_pays_bounty() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let user = ctx.create_user(UserRole::Member).await;
    seed_team_with_license(&ctx, &user, true, None).await;
    let user = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    let token = ctx.token_for(&user).await;

    let deadline = Utc::now() + Duration::days(3);
    let response = ctx
        .send(common::json_request(
            "POST",
            "/v1/tasks",
            Some(&token),
            json!({
                "title": "Ship the release notes",
                "bounty_amount": "100.00",
                "deadline": deadline.to_rfc3339(),
            }),
        ))
        .await;
    let task = common::json_body(response, StatusCode::CREATED).await;
    let task_id = task["id"].as_str().expect("Task id").to_string();
    assert_eq!(task["status"], "available");

    // An unclaimed task cannot skip ahead in the lifecycle
    let response = ctx
        .send(common::json_request(
            "PUT",
            &format!("/v1/tasks/{}/status", task_id),
            Some(&token),
            json!({ "status": "review" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .send(common::empty_request(
            "POST",
            &format!("/v1/tasks/{}/assign", task_id),
            Some(&token),
        ))
        .await;
    let task = common::json_body(response, StatusCode::OK).await;
    assert_eq!(task["status"], "in_progress");

    // Claiming twice is a client error
    let response = ctx
        .send(common::empty_request(
            "POST",
            &format!("/v1/tasks/{}/assign", task_id),
            Some(&token),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .send(common::json_request(
            "PUT",
            &format!("/v1/tasks/{}/status", task_id),
            Some(&token),
            json!({ "status": "review" }),
        ))
        .await;
    let task = common::json_body(response, StatusCode::OK).await;
    assert_eq!(task["status"], "review");

    let response = ctx
        .send(common::json_request(
            "PUT",
            &format!("/v1/tasks/{}/status", task_id),
            Some(&token),
            json!({ "status": "completed" }),
        ))
        .await;
    let completed = common::json_body(response, StatusCode::OK).await;
    assert_eq!(completed["on_time"], true);
    assert_eq!(completed["transaction"]["kind"], "bounty");
    assert_eq!(completed["transaction"]["amount"], "100.00");

    // Completing again must not double-pay
    let response = ctx
        .send(common::json_request(
            "PUT",
            &format!("/v1/tasks/{}/status", task_id),
            Some(&token),
            json!({ "status": "completed" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .send(common::empty_request(
            "GET",
            "/v1/bounties/transactions",
            Some(&token),
        ))
        .await;
    let entries = common::json_body(response, StatusCode::OK).await;
    assert_eq!(entries.as_array().map(Vec::len), Some(1));

    let response = ctx
        .send(common::empty_request("GET", "/v1/auth/me", Some(&token)))
        .await;
    let me = common::json_body(response, StatusCode::OK).await;
    assert_eq!(me["balance"], "100.00");
}

#[tokio::test]
async fn test_balance_adjustment_requires_admin() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let member = ctx.create_user(UserRole::Member).await;
    seed_team_with_license(&ctx, &member, true, None).await;
    let member = User::find_by_id(&ctx.db, member.id).await.unwrap().unwrap();

    let response = ctx
        .send(common::json_request(
            "POST",
            "/v1/bounties/adjust",
            Some(&ctx.token_for(&member).await),
            json!({ "user_id": member.id, "amount": "50.00", "reason": "nice try" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
