use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::services::scanner::{ExpiryScanner, ScanError, ScanReport};

/// Runs one scan against the current time and logs its outcome.
pub async fn run_expiry_scan(scanner: &ExpiryScanner) -> Result<ScanReport, ScanError> {
    log::info!("🔁 Running expiry scan");

    match scanner.run_scan(Utc::now()).await {
        Ok(report) => {
            log::info!(
                "✅ Expiry scan done: {} reminders created across {} items",
                report.notifications_created,
                report.items_scanned
            );
            Ok(report)
        }
        Err(ScanError::AlreadyRunning) => {
            log::warn!("⚠️ Skipping expiry scan, previous run still in progress");
            Err(ScanError::AlreadyRunning)
        }
        Err(e) => {
            log::error!("❌ Expiry scan failed: {}", e);
            Err(e)
        }
    }
}

/// Scans every `interval_hours`, starting one interval from now unless
/// `run_on_startup` is set. Returns `None` when the interval is zero.
pub fn spawn_periodic_scan(scanner: Arc<ExpiryScanner>) -> Option<JoinHandle<()>> {
    let hours = scanner.config().interval_hours;
    if hours == 0 {
        log::info!("Periodic expiry scan disabled");
        return None;
    }

    let period = Duration::from_secs(hours * 60 * 60);
    let run_on_startup = scanner.config().run_on_startup;

    Some(tokio::spawn(async move {
        let mut ticker = if run_on_startup {
            tokio::time::interval(period)
        } else {
            tokio::time::interval_at(tokio::time::Instant::now() + period, period)
        };
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        log::info!("Periodic expiry scan every {}h", hours);
        loop {
            ticker.tick().await;
            // Errors are logged inside; the loop keeps going.
            let _ = run_expiry_scan(&scanner).await;
        }
    }))
}
