/// License expiry job
///
/// Runs daily, as the backstop behind the request-time license gate: the
/// gate already denies expired licenses lazily, this job persists the
/// flip for teams with no traffic and warns creators ahead of time.
///
/// Two passes:
/// 1. Deactivate licenses whose expiration has passed but are still
///    marked active, notifying the team creator.
/// 2. Warn creators whose license expires within the next 7 days.

use bountyboard_shared::models::{
    license::License,
    notification::{notify_best_effort, CreateNotification},
    team::Team,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, warn};

/// How far ahead of expiration creators are warned
const WARNING_WINDOW_DAYS: i64 = 7;

/// Outcome of one license expiry sweep
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LicenseExpiryReport {
    /// Licenses flipped from active to inactive
    pub deactivated: usize,

    /// Licenses expiring within the warning window
    pub expiring_soon: usize,
}

/// Deactivates expired licenses and warns creators of upcoming expiry
pub async fn run(pool: &PgPool, now: DateTime<Utc>) -> Result<LicenseExpiryReport, sqlx::Error> {
    let mut report = LicenseExpiryReport::default();

    for license in License::list_newly_expired(pool, now).await? {
        if License::deactivate(pool, license.id).await? {
            report.deactivated += 1;
            info!(
                license_id = %license.id,
                team_id = %license.team_id,
                "Deactivated expired license"
            );
            notify_creator(
                pool,
                license.team_id,
                "license_expired",
                "Team license expired",
                "The license for your team has expired. Members can no longer \
                 access tasks or the bounty ledger."
                    .to_string(),
            )
            .await;
        }
    }

    for license in License::list_expiring_within(pool, now, WARNING_WINDOW_DAYS).await? {
        report.expiring_soon += 1;
        let when = license
            .expiration_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "soon".to_string());
        notify_creator(
            pool,
            license.team_id,
            "license_expiring",
            "Team license expiring soon",
            format!("The license for your team expires on {}.", when),
        )
        .await;
    }

    info!(
        deactivated = report.deactivated,
        expiring_soon = report.expiring_soon,
        "License expiry sweep complete"
    );

    Ok(report)
}

/// Notifies the creator of a team, best effort
async fn notify_creator(pool: &PgPool, team_id: uuid::Uuid, kind: &str, title: &str, message: String) {
    let creator = match Team::find_by_id(pool, team_id).await {
        Ok(Some(team)) => team.created_by,
        Ok(None) => {
            warn!(team_id = %team_id, "License references a missing team");
            return;
        }
        Err(e) => {
            warn!(team_id = %team_id, "Failed to load team for notification: {}", e);
            return;
        }
    };

    notify_best_effort(
        pool,
        CreateNotification {
            user_id: creator,
            kind: kind.to_string(),
            title: title.to_string(),
            message,
        },
    )
    .await;
}
