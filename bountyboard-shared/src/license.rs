/// License key catalog and registry checks
///
/// The catalog is the *source* list of purchasable license keys, loaded once
/// at process start from the `LICENSE_KEYS` environment variable (a JSON
/// array of `{key, max_users, expiry_date, notes?}`) and passed by reference
/// into whatever needs it. It is distinct from the `licenses` database
/// table, which records keys already consumed and bound to a team.
///
/// Catalog parsing is defensive: a missing variable, malformed JSON, or a
/// non-array value degrades to an empty catalog ("no licenses available")
/// and never errors.
///
/// # Example
///
/// ```
/// use bountyboard_shared::license::LicenseCatalog;
/// use chrono::Utc;
///
/// let catalog = LicenseCatalog::from_json(
///     r#"[{"key": "BNTY-ACME-2026", "max_users": 10, "expiry_date": "2099-01-01"}]"#,
/// );
///
/// assert!(catalog.validate_key("BNTY-ACME-2026", Utc::now()).is_some());
/// assert!(catalog.validate_key("bnty-acme-2026", Utc::now()).is_none()); // case-sensitive
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgConnection;

use crate::models::license::License;

/// Error type for license key validation
#[derive(Debug, thiserror::Error)]
pub enum LicenseError {
    /// Key not in the catalog, or its catalog entry has expired
    #[error("Invalid or expired license key")]
    InvalidKey,

    /// Key has already been consumed by some team
    #[error("License key is already assigned to another team")]
    KeyAlreadyAssigned,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One purchasable key from the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseKeyEntry {
    /// The key itself (matched exactly, case-sensitive)
    pub key: String,

    /// Member capacity the key grants
    pub max_users: i32,

    /// When the key stops being redeemable and the resulting license
    /// expires (None = never)
    #[serde(default, deserialize_with = "deserialize_expiry")]
    pub expiry_date: Option<DateTime<Utc>>,

    /// Free-form sales notes, ignored by the server
    #[serde(default)]
    pub notes: Option<String>,
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC)
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
                return Ok(Some(dt.with_timezone(&Utc)));
            }
            if let Ok(date) = NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
                let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
                return Ok(Some(midnight.and_utc()));
            }
            Err(serde::de::Error::custom(format!(
                "unrecognized expiry date: {}",
                s
            )))
        }
    }
}

/// The catalog of purchasable license keys
///
/// Loaded once at startup and injected (held in the API's app state), not
/// re-read from the environment per call.
#[derive(Debug, Clone, Default)]
pub struct LicenseCatalog {
    entries: Vec<LicenseKeyEntry>,
}

impl LicenseCatalog {
    /// Parses a catalog from raw JSON
    ///
    /// Never fails: malformed JSON, a non-array value, or an entry with an
    /// unreadable field all degrade to an empty catalog.
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str::<Vec<LicenseKeyEntry>>(raw) {
            Ok(entries) => Self { entries },
            Err(e) => {
                tracing::warn!("LICENSE_KEYS is not a valid license array, treating as empty: {}", e);
                Self::default()
            }
        }
    }

    /// Loads the catalog from the `LICENSE_KEYS` environment variable
    ///
    /// A missing variable degrades to an empty catalog.
    pub fn from_env() -> Self {
        match std::env::var("LICENSE_KEYS") {
            Ok(raw) => Self::from_json(&raw),
            Err(_) => {
                tracing::warn!("LICENSE_KEYS is not set, no license keys available");
                Self::default()
            }
        }
    }

    /// Builds a catalog from already-parsed entries (tests, hot reload)
    pub fn from_entries(entries: Vec<LicenseKeyEntry>) -> Self {
        Self { entries }
    }

    /// Number of entries in the catalog
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves a key against the catalog
    ///
    /// Exact-match and case-sensitive. Returns None for unknown keys, empty
    /// keys, and entries whose `expiry_date` is in the past.
    pub fn validate_key(&self, key: &str, now: DateTime<Utc>) -> Option<&LicenseKeyEntry> {
        if key.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .filter(|entry| match entry.expiry_date {
                Some(expiry) => expiry >= now,
                None => true,
            })
    }
}

/// Validates a key for team creation
///
/// Three-step gate, in priority order:
/// 1. the key must resolve via the catalog, else [`LicenseError::InvalidKey`];
/// 2. the key must not already be bound to an existing license row, else
///    [`LicenseError::KeyAlreadyAssigned`];
/// 3. the resolved entry is returned for the saga to consume.
///
/// Takes an open connection so the team-creation saga can run the bound
/// check inside its own transaction.
pub async fn validate_for_team_creation<'a>(
    conn: &mut PgConnection,
    catalog: &'a LicenseCatalog,
    key: &str,
    now: DateTime<Utc>,
) -> Result<&'a LicenseKeyEntry, LicenseError> {
    let entry = catalog
        .validate_key(key, now)
        .ok_or(LicenseError::InvalidKey)?;

    if License::key_is_bound(conn, key).await? {
        return Err(LicenseError::KeyAlreadyAssigned);
    }

    Ok(entry)
}
