use crate::media::{AdapterFactory, MediaTrack};
use crate::session::{CloseReason, PeerSession, SessionConfig, SessionEvent, SessionHandle, SessionParts};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tandem_core::utils::default_ice_servers;
use tandem_core::{ErrorCode, IceServerConfig, ParticipantId, RoomId, SignalMessage};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const ADAPTER_EVENT_CAPACITY: usize = 64;

/// Команды приложения для `RoomClient::run`.
#[derive(Debug, Clone)]
pub enum ClientCommand {
    Join(RoomId),
    AddTrack(MediaTrack),
    Leave,
}

/// То, что `RoomClient::run` сообщает приложению.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    Joined {
        room_id: RoomId,
        participants: Vec<ParticipantId>,
    },
    ParticipantJoined(ParticipantId),
    ParticipantLeft(ParticipantId),
    Session(SessionEvent),
}

/// Сторона участника: одна сессия на каждого удалённого участника комнаты.
///
/// Вошедший последним ждёт offer; offer шлют те, кто уже был в комнате.
pub struct RoomClient {
    local: ParticipantId,
    room: Option<RoomId>,
    config: SessionConfig,
    factory: Arc<dyn AdapterFactory>,
    outbound: mpsc::UnboundedSender<SignalMessage>,
    sessions: HashMap<ParticipantId, SessionHandle>,
    members: Vec<ParticipantId>,
    local_tracks: Vec<MediaTrack>,
    ice_servers: Vec<IceServerConfig>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl RoomClient {
    pub fn new(
        local: ParticipantId,
        config: SessionConfig,
        factory: Arc<dyn AdapterFactory>,
        outbound: mpsc::UnboundedSender<SignalMessage>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            local,
            room: None,
            config,
            factory,
            outbound,
            sessions: HashMap::new(),
            members: Vec::new(),
            local_tracks: Vec::new(),
            ice_servers: default_ice_servers(),
            events_tx,
            events_rx,
        }
    }

    pub fn local(&self) -> &ParticipantId {
        &self.local
    }

    pub fn room(&self) -> Option<&RoomId> {
        self.room.as_ref()
    }

    pub fn session(&self, peer: &ParticipantId) -> Option<&SessionHandle> {
        self.sessions.get(peer)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn members(&self) -> &[ParticipantId] {
        &self.members
    }

    pub fn ice_servers(&self) -> &[IceServerConfig] {
        &self.ice_servers
    }

    /// Drives the client until the relay link or the command channel closes.
    pub async fn run(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<SignalMessage>,
        mut commands: mpsc::UnboundedReceiver<ClientCommand>,
        app_events: mpsc::UnboundedSender<RoomEvent>,
    ) {
        let notify = |event: RoomEvent| {
            if app_events.send(event).is_err() {
                debug!("Application stopped listening to room events");
            }
        };

        loop {
            tokio::select! {
                msg = inbound.recv() => match msg {
                    Some(msg) => {
                        if let Some(event) = self.handle_relay_message(msg).await {
                            notify(event);
                        }
                    }
                    None => {
                        info!("Relay link closed");
                        break;
                    }
                },

                cmd = commands.recv() => match cmd {
                    Some(ClientCommand::Join(room_id)) => self.join(room_id),
                    Some(ClientCommand::AddTrack(track)) => self.add_track(track),
                    Some(ClientCommand::Leave) => self.leave(),
                    None => break,
                },

                Some(event) = self.events_rx.recv() => {
                    self.handle_session_event(&event);
                    notify(RoomEvent::Session(event));
                }
            }
        }

        self.leave();
    }

    pub fn join(&mut self, room_id: RoomId) {
        if self.room.as_ref().is_some_and(|r| *r != room_id) {
            self.leave();
        }

        info!("Joining room '{}' as {}", room_id, self.local);
        self.room = Some(room_id.clone());
        self.send(SignalMessage::JoinRoom {
            room_id,
            participant_id: self.local.clone(),
        });
    }

    /// Sends `leave` and closes every session.
    pub fn leave(&mut self) {
        let Some(room_id) = self.room.take() else {
            return;
        };

        info!("Leaving room '{}'", room_id);
        self.send(SignalMessage::Leave {
            participant_id: self.local.clone(),
        });
        for (_, session) in self.sessions.drain() {
            session.close(CloseReason::LocalClose);
        }
        self.members.clear();
    }

    /// Публикует дорожку во всех текущих и будущих сессиях.
    pub fn add_track(&mut self, track: MediaTrack) {
        for session in self.sessions.values() {
            if let Err(e) = session.add_track(track.clone()) {
                warn!("Cannot add track to session with {}: {}", session.remote(), e);
            }
        }
        self.local_tracks.push(track);
    }

    /// Applies one message from the relay. Membership changes are returned
    /// for the application.
    pub async fn handle_relay_message(&mut self, msg: SignalMessage) -> Option<RoomEvent> {
        match msg {
            SignalMessage::IceConfig { ice_servers } => {
                debug!("Relay announced {} ICE servers", ice_servers.len());
                self.ice_servers = ice_servers;
            }

            SignalMessage::RoomJoined {
                room_id,
                participants,
            } => {
                info!(
                    "Joined room '{}' with {} participants, waiting for offers",
                    room_id,
                    participants.len()
                );
                self.members = participants.clone();
                return Some(RoomEvent::Joined {
                    room_id,
                    participants,
                });
            }

            SignalMessage::UserJoined { participant_id } => {
                if participant_id == self.local {
                    return None;
                }
                info!("{} joined, calling", participant_id);
                if !self.members.contains(&participant_id) {
                    self.members.push(participant_id.clone());
                }
                if let Some(session) = self.ensure_session(&participant_id).await {
                    if let Err(e) = session.start_negotiation() {
                        warn!("Cannot call {}: {}", participant_id, e);
                    }
                }
                return Some(RoomEvent::ParticipantJoined(participant_id));
            }

            SignalMessage::Answer { .. } => {
                let Some(from) = msg.sender().cloned() else {
                    warn!("Answer without sender, dropping");
                    return None;
                };
                match self.sessions.get(&from) {
                    Some(session) => self.dispatch(session.clone(), msg),
                    None => debug!("Answer from {} without a session, dropping", from),
                }
            }

            SignalMessage::Offer { .. } | SignalMessage::IceCandidate { .. } => {
                let Some(from) = msg.sender().cloned() else {
                    warn!("'{}' without sender, dropping", msg.kind());
                    return None;
                };
                if let Some(session) = self.ensure_session(&from).await {
                    self.dispatch(session, msg);
                }
            }

            SignalMessage::Leave { participant_id } => {
                self.members.retain(|m| *m != participant_id);
                if let Some(session) = self.sessions.remove(&participant_id) {
                    info!("{} left, closing session", participant_id);
                    session.close(CloseReason::PeerLeft);
                }
                return Some(RoomEvent::ParticipantLeft(participant_id));
            }

            SignalMessage::Error {
                code: ErrorCode::ParticipantUnreachable,
                to_participant_id: Some(to),
                message,
            } => {
                warn!("Relay cannot reach {}: {}", to, message);
                if let Some(session) = self.sessions.get(&to) {
                    if let Err(e) = session.link_lost() {
                        warn!("Session with {} cannot track link loss: {}", to, e);
                    }
                }
            }

            SignalMessage::Error { code, message, .. } => {
                warn!("Relay error {:?}: {}", code, message);
            }

            SignalMessage::JoinRoom { .. } => {
                warn!("Unexpected 'join-room' from relay, ignoring");
            }
        }
        None
    }

    /// Removes sessions that closed on their own.
    pub fn handle_session_event(&mut self, event: &SessionEvent) {
        let SessionEvent::Closed {
            peer,
            session_id,
            reason,
        } = event
        else {
            return;
        };

        let current = self.sessions.get(peer).is_some_and(|s| s.id() == *session_id);
        if current {
            info!("Session with {} ended: {}", peer, reason);
            self.sessions.remove(peer);
        }
    }

    pub async fn next_session_event(&mut self) -> Option<SessionEvent> {
        let event = self.events_rx.recv().await?;
        self.handle_session_event(&event);
        Some(event)
    }

    async fn ensure_session(&mut self, peer: &ParticipantId) -> Option<SessionHandle> {
        if let Some(session) = self.sessions.get(peer) {
            if !session.is_closed() {
                return Some(session.clone());
            }
        }

        match self.spawn_session(peer).await {
            Ok(session) => {
                self.sessions.insert(peer.clone(), session.clone());
                Some(session)
            }
            Err(e) => {
                error!("Failed to create media session with {}: {:#}", peer, e);
                None
            }
        }
    }

    async fn spawn_session(&self, peer: &ParticipantId) -> Result<SessionHandle> {
        let (adapter_tx, adapter_rx) = mpsc::channel(ADAPTER_EVENT_CAPACITY);
        let adapter = self
            .factory
            .create(&self.local, peer, &self.ice_servers, adapter_tx)
            .await?;

        let session = PeerSession::spawn(
            &self.config,
            SessionParts {
                local: self.local.clone(),
                remote: peer.clone(),
                adapter,
                adapter_events: adapter_rx,
                outbound: self.outbound.clone(),
                events: self.events_tx.clone(),
            },
        );

        for track in &self.local_tracks {
            session.add_track(track.clone())?;
        }
        Ok(session)
    }

    fn dispatch(&self, session: SessionHandle, msg: SignalMessage) {
        if let Err(e) = session.signal(msg) {
            warn!("Session with {} rejected message: {}", session.remote(), e);
        }
    }

    fn send(&self, msg: SignalMessage) {
        if self.outbound.send(msg).is_err() {
            warn!("Relay link is gone, message dropped");
        }
    }
}
