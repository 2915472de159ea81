/// Integration tests for the team-creation saga and membership management
///
/// These tests require a running PostgreSQL database and are skipped when
/// DATABASE_URL is not set.

mod common;

use bountyboard_shared::license::LicenseError;
use bountyboard_shared::models::user::{User, UserRole};
use bountyboard_shared::teams::{self, AddMemberRequest, CreateTeamRequest, TeamError};
use chrono::Utc;
use uuid::Uuid;

fn unique_name(prefix: &str) -> String {
    format!("{} {}", prefix, Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_create_team_binds_license_and_creator() {
    let Some(pool) = common::setup().await else {
        return;
    };

    let creator = common::create_user(&pool, UserRole::Member).await;
    let (catalog, key) = common::test_catalog(10, None);

    let (team, license) = teams::create_team(
        &pool,
        &catalog,
        creator.id,
        CreateTeamRequest {
            name: unique_name("Platform"),
            description: Some("Infra team".to_string()),
            license_key: key.clone(),
        },
        Utc::now(),
    )
    .await
    .expect("Team creation should succeed");

    assert_eq!(license.team_id, team.id);
    assert_eq!(license.license_key, key);
    assert_eq!(license.max_users, 10);

    // The creator was re-pointed in the same transaction
    let creator = User::find_by_id(&pool, creator.id)
        .await
        .expect("Failed to fetch creator")
        .expect("Creator should exist");
    assert_eq!(creator.team_id, Some(team.id));
}

#[tokio::test]
async fn test_unknown_key_rolls_back_everything() {
    let Some(pool) = common::setup().await else {
        return;
    };

    let creator = common::create_user(&pool, UserRole::Member).await;
    let (catalog, _key) = common::test_catalog(10, None);
    let name = unique_name("Ghost");

    let result = teams::create_team(
        &pool,
        &catalog,
        creator.id,
        CreateTeamRequest {
            name: name.clone(),
            description: None,
            license_key: "BNTY-NOT-IN-CATALOG".to_string(),
        },
        Utc::now(),
    )
    .await;

    assert!(matches!(
        result,
        Err(TeamError::License(LicenseError::InvalidKey))
    ));

    // Nothing was committed: no team row, creator still teamless
    let team = bountyboard_shared::models::team::Team::find_by_name(&pool, &name)
        .await
        .expect("Failed to query team");
    assert!(team.is_none());

    let creator = User::find_by_id(&pool, creator.id)
        .await
        .expect("Failed to fetch creator")
        .expect("Creator should exist");
    assert_eq!(creator.team_id, None);
}

#[tokio::test]
async fn test_consumed_key_cannot_be_reused() {
    let Some(pool) = common::setup().await else {
        return;
    };

    let first = common::create_user(&pool, UserRole::Member).await;
    let second = common::create_user(&pool, UserRole::Member).await;
    let (catalog, key) = common::test_catalog(10, None);

    teams::create_team(
        &pool,
        &catalog,
        first.id,
        CreateTeamRequest {
            name: unique_name("First"),
            description: None,
            license_key: key.clone(),
        },
        Utc::now(),
    )
    .await
    .expect("First team creation should succeed");

    let result = teams::create_team(
        &pool,
        &catalog,
        second.id,
        CreateTeamRequest {
            name: unique_name("Second"),
            description: None,
            license_key: key,
        },
        Utc::now(),
    )
    .await;

    assert!(matches!(
        result,
        Err(TeamError::License(LicenseError::KeyAlreadyAssigned))
    ));
}

#[tokio::test]
async fn test_user_cannot_create_second_team() {
    let Some(pool) = common::setup().await else {
        return;
    };

    let creator = common::create_user(&pool, UserRole::Member).await;
    let (catalog_a, key_a) = common::test_catalog(10, None);
    let (catalog_b, key_b) = common::test_catalog(10, None);

    teams::create_team(
        &pool,
        &catalog_a,
        creator.id,
        CreateTeamRequest {
            name: unique_name("Original"),
            description: None,
            license_key: key_a,
        },
        Utc::now(),
    )
    .await
    .expect("First team creation should succeed");

    let result = teams::create_team(
        &pool,
        &catalog_b,
        creator.id,
        CreateTeamRequest {
            name: unique_name("Moonlight"),
            description: None,
            license_key: key_b,
        },
        Utc::now(),
    )
    .await;

    assert!(matches!(result, Err(TeamError::AlreadyOnTeam)));
}

#[tokio::test]
async fn test_duplicate_team_name_is_rejected() {
    let Some(pool) = common::setup().await else {
        return;
    };

    let first = common::create_user(&pool, UserRole::Member).await;
    let second = common::create_user(&pool, UserRole::Member).await;
    let (catalog_a, key_a) = common::test_catalog(10, None);
    let (catalog_b, key_b) = common::test_catalog(10, None);
    let name = unique_name("Shared");

    teams::create_team(
        &pool,
        &catalog_a,
        first.id,
        CreateTeamRequest {
            name: name.clone(),
            description: None,
            license_key: key_a,
        },
        Utc::now(),
    )
    .await
    .expect("First team creation should succeed");

    let result = teams::create_team(
        &pool,
        &catalog_b,
        second.id,
        CreateTeamRequest {
            name,
            description: None,
            license_key: key_b,
        },
        Utc::now(),
    )
    .await;

    assert!(matches!(result, Err(TeamError::NameTaken)));
}

#[tokio::test]
async fn test_capacity_boundary() {
    let Some(pool) = common::setup().await else {
        return;
    };

    let creator = common::create_user(&pool, UserRole::Member).await;
    let (catalog, key) = common::test_catalog(2, None);

    let (team, _license) = teams::create_team(
        &pool,
        &catalog,
        creator.id,
        CreateTeamRequest {
            name: unique_name("Tiny"),
            description: None,
            license_key: key,
        },
        Utc::now(),
    )
    .await
    .expect("Team creation should succeed");

    fn member_request() -> AddMemberRequest {
        let tag = Uuid::new_v4().simple().to_string();
        AddMemberRequest {
            username: format!("member-{}", &tag[..12]),
            email: format!("{}@test.example", &tag[..12]),
            password_hash: "$argon2id$fake-hash-for-tests".to_string(),
            role: UserRole::Member,
        }
    }

    // Creator occupies one seat, so exactly one more fits
    teams::add_member(&pool, team.id, member_request())
        .await
        .expect("Second seat should be available");

    let result = teams::add_member(&pool, team.id, member_request()).await;
    assert!(matches!(result, Err(TeamError::CapacityReached)));
}

#[tokio::test]
async fn test_add_member_rejects_duplicate_identity() {
    let Some(pool) = common::setup().await else {
        return;
    };

    let creator = common::create_user(&pool, UserRole::Member).await;
    let (catalog, key) = common::test_catalog(10, None);

    let (team, _license) = teams::create_team(
        &pool,
        &catalog,
        creator.id,
        CreateTeamRequest {
            name: unique_name("Dup"),
            description: None,
            license_key: key,
        },
        Utc::now(),
    )
    .await
    .expect("Team creation should succeed");

    // Reuse the creator's username
    let result = teams::add_member(
        &pool,
        team.id,
        AddMemberRequest {
            username: creator.username.clone(),
            email: "fresh@test.example".to_string(),
            password_hash: "$argon2id$fake-hash-for-tests".to_string(),
            role: UserRole::Member,
        },
    )
    .await;

    assert!(matches!(result, Err(TeamError::DuplicateIdentity)));
}

#[tokio::test]
async fn test_add_member_rejects_admin_role() {
    let Some(pool) = common::setup().await else {
        return;
    };

    let creator = common::create_user(&pool, UserRole::Member).await;
    let (catalog, key) = common::test_catalog(10, None);

    let (team, _license) = teams::create_team(
        &pool,
        &catalog,
        creator.id,
        CreateTeamRequest {
            name: unique_name("NoAdmins"),
            description: None,
            license_key: key,
        },
        Utc::now(),
    )
    .await
    .expect("Team creation should succeed");

    let tag = Uuid::new_v4().simple().to_string();
    let result = teams::add_member(
        &pool,
        team.id,
        AddMemberRequest {
            username: format!("admin-{}", &tag[..12]),
            email: format!("{}@test.example", &tag[..12]),
            password_hash: "$argon2id$fake-hash-for-tests".to_string(),
            role: UserRole::Admin,
        },
    )
    .await;

    assert!(matches!(result, Err(TeamError::InvalidRole(_))));
}

#[tokio::test]
async fn test_remove_member_detaches_user() {
    let Some(pool) = common::setup().await else {
        return;
    };

    let creator = common::create_user(&pool, UserRole::Member).await;
    let (catalog, key) = common::test_catalog(10, None);

    let (team, _license) = teams::create_team(
        &pool,
        &catalog,
        creator.id,
        CreateTeamRequest {
            name: unique_name("Churn"),
            description: None,
            license_key: key,
        },
        Utc::now(),
    )
    .await
    .expect("Team creation should succeed");

    let tag = Uuid::new_v4().simple().to_string();
    let member = teams::add_member(
        &pool,
        team.id,
        AddMemberRequest {
            username: format!("member-{}", &tag[..12]),
            email: format!("{}@test.example", &tag[..12]),
            password_hash: "$argon2id$fake-hash-for-tests".to_string(),
            role: UserRole::Member,
        },
    )
    .await
    .expect("Member creation should succeed");

    teams::remove_member(&pool, team.id, member.id)
        .await
        .expect("Removal should succeed");

    let member = User::find_by_id(&pool, member.id)
        .await
        .expect("Failed to fetch member")
        .expect("Member should still exist");
    assert_eq!(member.team_id, None);

    // Removing someone who is not on the team fails cleanly
    let outsider = common::create_user(&pool, UserRole::Member).await;
    let result = teams::remove_member(&pool, team.id, outsider.id).await;
    assert!(matches!(result, Err(TeamError::NotAMember)));
}
