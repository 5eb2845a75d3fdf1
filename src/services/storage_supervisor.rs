use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::state::SharedState;

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Watch the store and keep the shared state in degraded mode while it is unreachable.
///
/// The match keeps running in degraded mode; actions that need the store are
/// abandoned or reset by the controller on their own.
pub async fn run(state: SharedState) {
    let store = state.store();

    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(err) => {
                warn!(error = %err, "storage health check failed; entering degraded mode");
                state.update_degraded(true);

                let mut delay = INITIAL_DELAY;
                let mut attempt = 0u32;
                loop {
                    sleep(delay).await;
                    attempt += 1;
                    match store.try_reconnect().await {
                        Ok(()) => {
                            info!(attempt, "storage reconnection succeeded; leaving degraded mode");
                            state.update_degraded(false);
                            break;
                        }
                        Err(err) => {
                            warn!(attempt, error = %err, "storage reconnect attempt failed");
                            delay = (delay * 2).min(MAX_DELAY);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::time::timeout;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::match_store::{MemoryMatchStore, memory::StoreOperation},
        state::AppState,
    };

    #[tokio::test]
    async fn degraded_flag_follows_store_health() {
        let store = MemoryMatchStore::new();
        store.fail(StoreOperation::HealthCheck);
        let (state, _receivers) = AppState::new(AppConfig::default(), Arc::new(store.clone()));
        let mut degraded = state.degraded_watcher();

        let supervisor = tokio::spawn(run(state.clone()));

        timeout(Duration::from_secs(2), degraded.wait_for(|value| *value))
            .await
            .expect("entered degraded mode")
            .unwrap();
        assert!(state.is_degraded());

        store.recover(StoreOperation::HealthCheck);
        timeout(Duration::from_secs(4), degraded.wait_for(|value| !*value))
            .await
            .expect("left degraded mode")
            .unwrap();
        assert!(!state.is_degraded());

        supervisor.abort();
    }
}
