pub mod relay_tests;
pub mod routing_tests;

use tandem_server::RoomManager;
use tracing::Level;

use crate::utils::{Delivery, MockSignalingOutput};
use std::sync::Arc;
use tokio::sync::mpsc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_test_registry() -> (
    RoomManager,
    MockSignalingOutput,
    mpsc::UnboundedReceiver<Delivery>,
) {
    let (signaling, signal_rx) = MockSignalingOutput::new();
    let rooms = RoomManager::new(Arc::new(signaling.clone()));

    (rooms, signaling, signal_rx)
}
