/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`jwt`]: JWT token generation and validation
/// - [`middleware`]: Axum auth and license-gate layers
/// - [`authorization`]: role checks over the auth context
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 signing, 8-hour lifetime
/// - **Per-request re-derivation**: role, team, and license validity come
///   from the database on every request, never from token claims alone

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
