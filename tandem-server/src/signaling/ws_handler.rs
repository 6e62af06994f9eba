use crate::app_state::AppState;
use crate::signaling::signaling_service::send_to;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tandem_core::{ErrorCode, ParticipantId, RoomId, SignalError, SignalMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Участник, привязанный к соединению после `join-room`.
struct Membership {
    participant_id: ParticipantId,
    room_id: RoomId,
}

struct Connection {
    state: Arc<AppState>,
    tx: mpsc::UnboundedSender<Message>,
    membership: Option<Membership>,
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("New WebSocket connection");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut conn = Connection {
        state,
        tx,
        membership: None,
    };

    loop {
        tokio::select! {
            _ = (&mut send_task) => break,

            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => match tandem_core::decode(text.as_str()) {
                    Ok(signal) => conn.handle_signal(signal).await,
                    Err(e) => warn!("Invalid SignalMessage from {}: {}", conn.who(), e),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!("WebSocket error for {}: {}", conn.who(), e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    let who = conn.who();
    conn.leave_room().await;
    send_task.abort();
    info!("WebSocket disconnected: {}", who);
}

impl Connection {
    fn who(&self) -> String {
        match &self.membership {
            Some(m) => format!("{}@{}", m.participant_id, m.room_id),
            None => "<anonymous>".to_string(),
        }
    }

    async fn handle_signal(&mut self, signal: SignalMessage) {
        match signal {
            SignalMessage::JoinRoom {
                room_id,
                participant_id,
            } => self.join_room(room_id, participant_id).await,

            SignalMessage::Leave { .. } => self.leave_room().await,

            msg @ (SignalMessage::Offer { .. }
            | SignalMessage::Answer { .. }
            | SignalMessage::IceCandidate { .. }) => self.route(msg).await,

            other => warn!(
                "Ignoring relay-only message '{}' from {}",
                other.kind(),
                self.who()
            ),
        }
    }

    async fn join_room(&mut self, room_id: RoomId, participant_id: ParticipantId) {
        let same = self
            .membership
            .as_ref()
            .is_some_and(|m| m.room_id == room_id && m.participant_id == participant_id);
        if !same {
            self.leave_room().await;
        }

        info!("Participant {} wants to join room '{}'", participant_id, room_id);
        let replaced = self.state.signaling.add_peer(
            participant_id.clone(),
            room_id.clone(),
            self.tx.clone(),
        );
        if let Some(previous_room) = replaced.filter(|r| *r != room_id) {
            info!(
                "{} moved from room '{}' on a new connection",
                participant_id, previous_room
            );
            self.state
                .room_manager
                .leave(&previous_room, participant_id.clone())
                .await;
        }
        self.membership = Some(Membership {
            participant_id: participant_id.clone(),
            room_id: room_id.clone(),
        });

        self.send(SignalMessage::IceConfig {
            ice_servers: self.state.signaling.get_ice_servers(),
        });

        let participants = self
            .state
            .room_manager
            .join(&room_id, participant_id)
            .await;
        self.send(SignalMessage::RoomJoined {
            room_id,
            participants,
        });
    }

    async fn leave_room(&mut self) {
        let Some(m) = self.membership.take() else {
            return;
        };

        // Участник переподключился: членством теперь владеет новое соединение.
        if !self.state.signaling.remove_peer(&m.participant_id, &self.tx) {
            info!(
                "{} is served by a newer connection, keeping its membership",
                m.participant_id
            );
            return;
        }

        self.state
            .room_manager
            .leave(&m.room_id, m.participant_id.clone())
            .await;
    }

    async fn route(&mut self, msg: SignalMessage) {
        let Some(m) = &self.membership else {
            warn!("'{}' before join-room, rejecting", msg.kind());
            self.send(error_message(&SignalError::NotInRoom, msg.recipient().cloned()));
            return;
        };

        if !self.state.signaling.is_bound_to(&m.participant_id, &self.tx) {
            warn!(
                "'{}' from a replaced connection of {}, rejecting",
                msg.kind(),
                m.participant_id
            );
            self.send(error_message(&SignalError::NotInRoom, msg.recipient().cloned()));
            return;
        }

        debug!("'{}' from {}", msg.kind(), m.participant_id);
        let result = self
            .state
            .room_manager
            .route(&m.room_id, m.participant_id.clone(), msg)
            .await;

        if let Err(e) = result {
            let to = match &e {
                SignalError::ParticipantUnreachable(to) => Some(to.clone()),
                _ => None,
            };
            self.send(error_message(&e, to));
        }
    }

    fn send(&self, msg: SignalMessage) {
        if !send_to(&self.tx, &msg) {
            debug!("Connection writer is gone, dropping '{}'", msg.kind());
        }
    }
}

fn error_message(e: &SignalError, to_participant_id: Option<ParticipantId>) -> SignalMessage {
    let code = match e {
        SignalError::ParticipantUnreachable(_) => ErrorCode::ParticipantUnreachable,
        SignalError::NotInRoom | SignalError::NotRoutable(_) => ErrorCode::NotInRoom,
    };
    SignalMessage::Error {
        code,
        message: e.to_string(),
        to_participant_id,
    }
}
