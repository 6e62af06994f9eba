use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tandem_core::{ParticipantId, SignalError, SignalMessage};
use tandem_server::SignalingOutput;
use tokio::sync::{Mutex, mpsc};

/// Delivered message as seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: ParticipantId,
    pub msg: SignalMessage,
}

/// Mock SignalingOutput that captures all outgoing signals.
#[derive(Clone)]
pub struct MockSignalingOutput {
    /// Channel to send captured signals.
    tx: mpsc::UnboundedSender<Delivery>,
    /// All captured signals (for verification).
    signals: Arc<Mutex<Vec<Delivery>>>,
    /// Participants whose transport is considered gone.
    offline: Arc<Mutex<HashSet<ParticipantId>>>,
}

impl MockSignalingOutput {
    /// Create a new MockSignalingOutput and its receiver channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let signaling = Self {
            tx,
            signals: Arc::new(Mutex::new(Vec::new())),
            offline: Arc::new(Mutex::new(HashSet::new())),
        };
        (signaling, rx)
    }

    /// Simulate a participant whose socket has died.
    pub async fn set_offline(&self, participant_id: &ParticipantId) {
        self.offline.lock().await.insert(participant_id.clone());
    }

    /// All messages delivered to `participant_id`, in order.
    pub async fn delivered_to(&self, participant_id: &ParticipantId) -> Vec<SignalMessage> {
        self.signals
            .lock()
            .await
            .iter()
            .filter(|d| &d.to == participant_id)
            .map(|d| d.msg.clone())
            .collect()
    }

    pub async fn total(&self) -> usize {
        self.signals.lock().await.len()
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn deliver(
        &self,
        participant_id: &ParticipantId,
        msg: SignalMessage,
    ) -> Result<(), SignalError> {
        tracing::debug!("[MockSignaling] '{}' to {}", msg.kind(), participant_id);

        if self.offline.lock().await.contains(participant_id) {
            return Err(SignalError::ParticipantUnreachable(participant_id.clone()));
        }

        let delivery = Delivery {
            to: participant_id.clone(),
            msg,
        };
        self.signals.lock().await.push(delivery.clone());
        let _ = self.tx.send(delivery);
        Ok(())
    }
}
