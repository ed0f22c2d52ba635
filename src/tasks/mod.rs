//! Background scheduled tasks for the application.
//!
//! Currently one recurring job: the daily point-expiry sweep. Call
//! `spawn_all` once during startup to launch it.

use crate::services::PointService;

/// Spawn all background tasks.
///
/// Notes
/// - The expiry sweep is idempotent (each lapsed grant is offset at most
///   once), so overlapping or restarted runs are harmless.
/// - This function detaches tasks via `tokio::spawn`; it does not block.
pub fn spawn_all(point_service: PointService) {
    // Daily point expiry sweep
    {
        let svc = point_service.clone();
        tokio::spawn(async move {
            loop {
                match svc.expire_points().await {
                    Ok(n) if n > 0 => log::info!("Expired point grants processed: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to expire points: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(24 * 3600)).await;
            }
        });
    }
}
