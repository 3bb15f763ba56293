use std::time::Duration;

use log::{error, info};

use crate::services::request::RequestService;
use crate::store::Store;

/// Periodic sweep that expires stale pending requests. Runs independently
/// of user traffic; overlapping runs (scheduler plus the manual ops route)
/// are harmless because the sweep itself is idempotent.
pub struct ExpiryReaper;

impl ExpiryReaper {
    pub fn spawn<S: Store>(lifecycle: RequestService<S>, every: Duration) {
        tokio::spawn(async move {
            info!("expiry reaper running every {}s", every.as_secs());
            let mut ticker = tokio::time::interval(every);
            // The first tick fires immediately; skip it so startup stays quiet.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match lifecycle.expire_stale().await {
                    Ok(0) => {}
                    Ok(count) => info!("reaper expired {count} requests"),
                    Err(e) => error!("expiry sweep failed: {e}"),
                }
            }
        });
    }
}
