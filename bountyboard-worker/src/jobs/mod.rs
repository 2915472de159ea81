/// Maintenance jobs
///
/// Each job is a free-standing async function over a pool, so jobs can be
/// run individually in tests without the scheduler.

pub mod deadline_scan;
pub mod license_expiry;
pub mod notification_cleanup;
