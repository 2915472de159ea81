//! # BountyBoard Shared Library
//!
//! Shared types, data access, and business logic used by the BountyBoard
//! API server and the maintenance worker.
//!
//! ## Module Organization
//!
//! - `models`: database models and data structures
//! - `auth`: JWT auth, password hashing, and the license-gate middleware
//! - `license`: license key catalog and validation rules
//! - `teams`: the team-creation saga and membership operations
//! - `ledger`: balance mutations and the transaction audit trail
//! - `db`: connection pooling and migrations

pub mod auth;
pub mod db;
pub mod ledger;
pub mod license;
pub mod models;
pub mod teams;

/// Current version of the BountyBoard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
