use crate::room::room_command::RoomCommand;
use crate::room::room_manager::RoomHandle;
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use tandem_core::{ParticipantId, RoomId, SignalError, SignalMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Актор одной комнаты. Все изменения состава комнаты проходят через его
/// очередь команд, поэтому они сериализованы.
pub struct Room {
    id: RoomId,
    generation: u64,
    members: Vec<ParticipantId>,
    command_rx: mpsc::Receiver<RoomCommand>,
    signaling: Arc<dyn SignalingOutput>,
    registry: Arc<DashMap<RoomId, RoomHandle>>,
}

impl Room {
    pub(crate) fn new(
        id: RoomId,
        generation: u64,
        command_rx: mpsc::Receiver<RoomCommand>,
        signaling: Arc<dyn SignalingOutput>,
        registry: Arc<DashMap<RoomId, RoomHandle>>,
    ) -> Self {
        Self {
            id,
            generation,
            members: Vec::new(),
            command_rx,
            signaling,
            registry,
        }
    }

    pub async fn run(mut self) {
        info!("Room '{}' event loop started", self.id);

        while let Some(cmd) = self.command_rx.recv().await {
            if self.handle_command(cmd).await.is_break() {
                break;
            }
        }

        // Handle may still be registered if every sender went away first.
        self.unregister();
        info!("Room '{}' event loop finished", self.id);
    }

    async fn handle_command(&mut self, cmd: RoomCommand) -> ControlFlow<()> {
        match cmd {
            RoomCommand::Join {
                participant_id,
                reply,
            } => {
                let existing = self.join(participant_id).await;
                let _ = reply.send(existing);
            }

            RoomCommand::Route {
                from,
                message,
                reply,
            } => {
                let result = self.route(from, message).await;
                let _ = reply.send(result);
            }

            RoomCommand::Leave {
                participant_id,
                reply,
            } => {
                self.leave(&participant_id).await;

                if self.members.is_empty() {
                    info!("Room '{}' is empty, closing", self.id);
                    self.unregister();
                    let _ = reply.send(());
                    return ControlFlow::Break(());
                }
                let _ = reply.send(());
            }

            RoomCommand::Members { reply } => {
                let _ = reply.send(self.members.clone());
            }
        }

        ControlFlow::Continue(())
    }

    async fn join(&mut self, participant_id: ParticipantId) -> Vec<ParticipantId> {
        let existing: Vec<ParticipantId> = self
            .members
            .iter()
            .filter(|m| **m != participant_id)
            .cloned()
            .collect();

        if self.members.contains(&participant_id) {
            debug!(
                "Participant {} re-joined room '{}', nothing to announce",
                participant_id, self.id
            );
            return existing;
        }

        info!(
            "Participant {} joined room '{}' ({} already inside)",
            participant_id,
            self.id,
            existing.len()
        );
        self.members.push(participant_id.clone());

        let announcement = SignalMessage::UserJoined {
            participant_id: participant_id.clone(),
        };
        self.broadcast(&existing, announcement).await;

        existing
    }

    async fn route(
        &mut self,
        from: ParticipantId,
        message: SignalMessage,
    ) -> Result<(), SignalError> {
        let Some(to) = message.recipient().cloned() else {
            return Err(SignalError::NotRoutable(message.kind()));
        };

        if !self.members.contains(&from) {
            return Err(SignalError::NotInRoom);
        }
        if !self.members.contains(&to) {
            warn!(
                "Dropping '{}' from {}: {} is not in room '{}'",
                message.kind(),
                from,
                to,
                self.id
            );
            return Err(SignalError::ParticipantUnreachable(to));
        }

        debug!("Routing '{}' {} -> {}", message.kind(), from, to);
        self.signaling.deliver(&to, message.with_sender(from)).await
    }

    async fn leave(&mut self, participant_id: &ParticipantId) {
        let Some(pos) = self.members.iter().position(|m| m == participant_id) else {
            debug!(
                "Participant {} is not in room '{}', ignoring leave",
                participant_id, self.id
            );
            return;
        };
        self.members.remove(pos);
        info!("Participant {} left room '{}'", participant_id, self.id);

        let notice = SignalMessage::Leave {
            participant_id: participant_id.clone(),
        };
        let remaining = self.members.clone();
        self.broadcast(&remaining, notice).await;
    }

    async fn broadcast(&self, recipients: &[ParticipantId], msg: SignalMessage) {
        for recipient in recipients {
            if let Err(e) = self.signaling.deliver(recipient, msg.clone()).await {
                warn!(
                    "Failed to deliver '{}' to {} in room '{}': {}",
                    msg.kind(),
                    recipient,
                    self.id,
                    e
                );
            }
        }
    }

    fn unregister(&self) {
        let generation = self.generation;
        self.registry
            .remove_if(&self.id, |_, handle| handle.generation == generation);
    }
}
