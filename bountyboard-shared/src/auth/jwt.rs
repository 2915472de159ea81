/// JWT token generation and validation module
///
/// Tokens are signed with HS256 (HMAC-SHA256) and carry the user's identity
/// plus a snapshot of their team and license at issue time. The snapshot is
/// advisory: every request re-derives team membership and license validity
/// from the database, so a stale token cannot smuggle revoked access past
/// the gate.
///
/// # Security
///
/// - **Algorithm**: HS256, pinned at validation time
/// - **Expiration**: 8 hours, not configurable per token
/// - **Validation**: signature, expiration, nbf, and issuer checks
/// - **Secret Management**: secrets should be at least 32 bytes (256 bits)
///
/// # Example
///
/// ```
/// use bountyboard_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = Claims::new(Uuid::new_v4(), "alice".to_string(), "member".to_string());
/// let token = create_token(&claims, "your-secret-key-at-least-32-bytes")?;
///
/// let validated = validate_token(&token, "your-secret-key-at-least-32-bytes")?;
/// assert_eq!(validated.sub, claims.sub);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token lifetime: 8 hours
pub const TOKEN_LIFETIME_SECONDS: i64 = 8 * 60 * 60;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer")]
    InvalidIssuer,
}

/// JWT claims structure
///
/// Standard claims (`sub`, `iss`, `iat`, `exp`, `nbf`) plus a snapshot of
/// the user's team and license at issue time. The team and license fields
/// are all `None` for users without a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: Uuid,

    /// Issuer - always "bountyboard"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Username at issue time
    pub username: String,

    /// Role at issue time
    pub role: String,

    /// Team ID at issue time, if any
    pub team_id: Option<Uuid>,

    /// Team name at issue time, if any
    pub team_name: Option<String>,

    /// License key bound to the team at issue time, if any
    pub license_key: Option<String>,

    /// License expiration at issue time (Unix timestamp), if any
    pub license_expiry: Option<i64>,
}

impl Claims {
    /// Creates claims for a user with no team context
    pub fn new(user_id: Uuid, username: String, role: String) -> Self {
        let now = Utc::now();
        let expiration = now + Duration::seconds(TOKEN_LIFETIME_SECONDS);

        Self {
            sub: user_id,
            iss: "bountyboard".to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            username,
            role,
            team_id: None,
            team_name: None,
            license_key: None,
            license_expiry: None,
        }
    }

    /// Attaches the team/license snapshot to the claims
    pub fn with_team(
        mut self,
        team_id: Uuid,
        team_name: String,
        license_key: Option<String>,
        license_expiry: Option<i64>,
    ) -> Self {
        self.team_id = Some(team_id);
        self.team_name = Some(team_name);
        self.license_key = license_key;
        self.license_expiry = license_expiry;
        self
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Creates a JWT token from claims
///
/// Signs the token using HS256 with the provided secret. The secret should
/// be at least 32 bytes, randomly generated, and supplied via environment.
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a JWT token and extracts claims
///
/// Verifies the signature, expiration, nbf window, and that the issuer is
/// "bountyboard".
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&["bountyboard"]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}
