use crate::room::RoomManager;
use crate::signaling::{SignalingService, ws_handler};
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tandem_core::IceServerConfig;
use tandem_core::utils::default_ice_servers;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// STUN/TURN servers announced to every participant with `ice-config`.
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
        }
    }
}

pub struct AppState {
    pub signaling: SignalingService,
    pub room_manager: RoomManager,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Arc<Self> {
        let signaling = SignalingService::new(config.ice_servers);
        let room_manager = RoomManager::new(Arc::new(signaling.clone()));

        Arc::new(Self {
            signaling,
            room_manager,
        })
    }
}

/// `GET /ws` for signaling, `GET /health` for probes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}
