//! Background task that periodically releases overdue reservations.
//!
//! Only started when reservations carry a hold time. Each tick asks the
//! [`ReservationManager`] to expire reservations past their `expires_at`,
//! which returns their spots to the lots.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::ReservationManager;
use crate::shared::shutdown::ShutdownSignal;

/// Start the reservation expiry background task.
///
/// The task runs every `check_interval_secs` until `shutdown` fires.
pub fn start_reservation_expiry_task(
    manager: Arc<ReservationManager>,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            check_interval = check_interval_secs,
            "📅 Reservation expiry task started"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let notified = shutdown.notified();
        tokio::pin!(notified);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match manager.expire_overdue().await {
                        Ok(0) => {}
                        Ok(count) => debug!(count, "Expired overdue reservations"),
                        Err(e) => warn!(error = %e, "Reservation expiry check error"),
                    }
                }
                _ = &mut notified => {
                    info!("📅 Reservation expiry task shutting down");
                    break;
                }
            }
        }

        info!("📅 Reservation expiry task stopped");
    })
}
