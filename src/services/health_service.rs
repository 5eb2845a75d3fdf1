use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report degraded mode and the number of attached clients.
pub fn health_status(state: &SharedState) -> HealthResponse {
    let degraded = state.is_degraded();
    if degraded {
        warn!("storage unavailable (degraded mode)");
    }
    HealthResponse::new(degraded, state.connections().len())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::match_store::MemoryMatchStore, state::AppState};

    #[test]
    fn reports_degraded_mode() {
        let (state, _receivers) =
            AppState::new(AppConfig::default(), Arc::new(MemoryMatchStore::new()));
        assert_eq!(health_status(&state), HealthResponse::new(false, 0));

        state.update_degraded(true);
        let status = health_status(&state);
        assert_eq!(status.status, "degraded");
    }
}
