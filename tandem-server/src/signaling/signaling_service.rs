use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use std::sync::Arc;
use tandem_core::{IceServerConfig, ParticipantId, RoomId, SignalError, SignalMessage};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Соединение, которому сейчас доставляются сообщения участника.
struct PeerBinding {
    tx: mpsc::UnboundedSender<Message>,
    room_id: RoomId,
}

struct SignalingInner {
    peers: DashMap<ParticipantId, PeerBinding>,
    ice_servers: Vec<IceServerConfig>,
}

/// Доставка сообщений в WebSocket-соединения участников.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                peers: DashMap::new(),
                ice_servers,
            }),
        }
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    /// Binds a participant id to a connection. A second connection with the
    /// same id takes over delivery; the room the replaced connection was bound
    /// to is returned so the caller can detach it.
    pub fn add_peer(
        &self,
        participant_id: ParticipantId,
        room_id: RoomId,
        tx: mpsc::UnboundedSender<Message>,
    ) -> Option<RoomId> {
        let binding = PeerBinding {
            tx: tx.clone(),
            room_id,
        };
        let previous = self.inner.peers.insert(participant_id.clone(), binding)?;
        if previous.tx.same_channel(&tx) {
            return None;
        }

        if !previous.tx.is_closed() {
            warn!(
                "Participant {} connected again, previous connection stops receiving",
                participant_id
            );
        }
        Some(previous.room_id)
    }

    /// Drops the binding only if it still points at `tx`. Returns whether
    /// `tx` owned it.
    pub fn remove_peer(
        &self,
        participant_id: &ParticipantId,
        tx: &mpsc::UnboundedSender<Message>,
    ) -> bool {
        self.inner
            .peers
            .remove_if(participant_id, |_, current| current.tx.same_channel(tx))
            .is_some()
    }

    pub fn is_bound_to(
        &self,
        participant_id: &ParticipantId,
        tx: &mpsc::UnboundedSender<Message>,
    ) -> bool {
        self.inner
            .peers
            .get(participant_id)
            .is_some_and(|binding| binding.tx.same_channel(tx))
    }

    pub fn is_connected(&self, participant_id: &ParticipantId) -> bool {
        self.inner.peers.contains_key(participant_id)
    }

    pub fn send_signal(
        &self,
        participant_id: &ParticipantId,
        msg: SignalMessage,
    ) -> Result<(), SignalError> {
        let Some(peer) = self.inner.peers.get(participant_id).map(|p| p.tx.clone()) else {
            warn!(
                "Attempted to send '{}' to disconnected participant {}",
                msg.kind(),
                participant_id
            );
            return Err(SignalError::ParticipantUnreachable(participant_id.clone()));
        };

        if !send_to(&peer, &msg) {
            error!(
                "Failed to send WS message to {}: connection closed",
                participant_id
            );
            return Err(SignalError::ParticipantUnreachable(participant_id.clone()));
        }
        Ok(())
    }
}

/// Serializes and queues `msg` on one connection's writer.
pub(crate) fn send_to(tx: &mpsc::UnboundedSender<Message>, msg: &SignalMessage) -> bool {
    match tandem_core::encode(msg) {
        Ok(json) => tx.send(Message::Text(json.into())).is_ok(),
        Err(e) => {
            error!("Failed to serialize signal message: {}", e);
            false
        }
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn deliver(
        &self,
        participant_id: &ParticipantId,
        msg: SignalMessage,
    ) -> Result<(), SignalError> {
        self.send_signal(participant_id, msg)
    }
}
