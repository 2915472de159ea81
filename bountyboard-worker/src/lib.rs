//! # BountyBoard Worker Library
//!
//! Background maintenance for the BountyBoard tracker: the hourly deadline
//! scan, the daily license expiry sweep, and notification cleanup.
//!
//! ## Modules
//!
//! - `config`: Worker configuration
//! - `jobs`: Individual maintenance jobs
//! - `scheduler`: Interval-driven job loop

pub mod config;
pub mod jobs;
pub mod scheduler;
