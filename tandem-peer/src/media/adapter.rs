use crate::media::{MediaTrack, RemoteTrack, SessionDescription};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tandem_core::{IceCandidate, IceServerConfig, ParticipantId};
use tokio::sync::mpsc;

/// Raw connectivity signal as reported by the media engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSignal {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

/// События медиа-движка. Адаптер получает `mpsc::Sender<AdapterEvent>` при
/// создании и пишет в него из своих колбэков.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterEvent {
    NegotiationNeeded,
    IceCandidateGathered(IceCandidate),
    TrackReceived(RemoteTrack),
    ConnectionStateChanged(LinkSignal),
}

/// Media capability of one peer connection. The session calls at most one
/// method at a time.
#[async_trait]
pub trait MediaAdapter: Send + Sync {
    async fn create_local_offer(&self) -> Result<SessionDescription>;

    async fn create_local_answer(&self, remote: &SessionDescription) -> Result<SessionDescription>;

    async fn apply_local_description(&self, description: SessionDescription) -> Result<()>;

    async fn apply_remote_description(&self, description: SessionDescription) -> Result<()>;

    /// Returns the connection to the state before the last local offer.
    async fn rollback_local_description(&self) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn add_track(&self, track: MediaTrack) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Создаёт по адаптеру на каждую сессию с удалённым участником.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    async fn create(
        &self,
        local: &ParticipantId,
        remote: &ParticipantId,
        ice_servers: &[IceServerConfig],
        events: mpsc::Sender<AdapterEvent>,
    ) -> Result<Arc<dyn MediaAdapter>>;
}
