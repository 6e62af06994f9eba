use crate::room::{Room, RoomCommand};
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tandem_core::{ParticipantId, RoomId, SignalError, SignalMessage};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

const ROOM_QUEUE_CAPACITY: usize = 100;

#[derive(Clone)]
pub(crate) struct RoomHandle {
    pub(crate) tx: mpsc::Sender<RoomCommand>,
    pub(crate) generation: u64,
}

/// Реестр комнат: room id -> очередь команд актора комнаты.
///
/// Комната создаётся при первом входе и удаляет себя сама, когда из неё
/// выходит последний участник.
#[derive(Clone)]
pub struct RoomManager {
    rooms: Arc<DashMap<RoomId, RoomHandle>>,
    signaling: Arc<dyn SignalingOutput>,
    next_generation: Arc<AtomicU64>,
}

impl RoomManager {
    pub fn new(signaling: Arc<dyn SignalingOutput>) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            signaling,
            next_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registers `participant_id` in `room_id` and returns who was already
    /// there. Existing members are told with `user-joined`.
    pub async fn join(&self, room_id: &RoomId, participant_id: ParticipantId) -> Vec<ParticipantId> {
        loop {
            let handle = self.get_or_create(room_id);
            let (reply, reply_rx) = oneshot::channel();
            let cmd = RoomCommand::Join {
                participant_id: participant_id.clone(),
                reply,
            };

            if handle.tx.send(cmd).await.is_ok() {
                if let Ok(existing) = reply_rx.await {
                    return existing;
                }
            }

            // The room emptied and shut down between lookup and delivery.
            debug!("Room '{}' closed during join, retrying", room_id);
            self.forget(room_id, handle.generation);
        }
    }

    pub async fn route(
        &self,
        room_id: &RoomId,
        from: ParticipantId,
        message: SignalMessage,
    ) -> Result<(), SignalError> {
        let to = message.recipient().cloned();
        let Some(handle) = self.get(room_id) else {
            return Err(SignalError::NotInRoom);
        };

        let (reply, reply_rx) = oneshot::channel();
        let cmd = RoomCommand::Route {
            from,
            message,
            reply,
        };
        if handle.tx.send(cmd).await.is_err() {
            return Err(unreachable_or_not_in_room(to));
        }
        reply_rx
            .await
            .unwrap_or_else(|_| Err(unreachable_or_not_in_room(to)))
    }

    /// Removes the participant; remaining members get `leave`. Returns once the
    /// room has processed the request (and unregistered itself if empty).
    pub async fn leave(&self, room_id: &RoomId, participant_id: ParticipantId) {
        let Some(handle) = self.get(room_id) else {
            return;
        };

        let (reply, reply_rx) = oneshot::channel();
        let cmd = RoomCommand::Leave {
            participant_id,
            reply,
        };
        if handle.tx.send(cmd).await.is_ok() {
            let _ = reply_rx.await;
        }
    }

    pub async fn members(&self, room_id: &RoomId) -> Vec<ParticipantId> {
        let Some(handle) = self.get(room_id) else {
            return Vec::new();
        };

        let (reply, reply_rx) = oneshot::channel();
        if handle.tx.send(RoomCommand::Members { reply }).await.is_err() {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }

    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms.get(room_id).map(|h| h.clone())
    }

    fn get_or_create(&self, room_id: &RoomId) -> RoomHandle {
        if let Some(handle) = self.get(room_id) {
            return handle;
        }

        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                info!("Creating new room: {}", room_id);
                let (tx, rx) = mpsc::channel(ROOM_QUEUE_CAPACITY);
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

                let room = Room::new(
                    room_id.clone(),
                    generation,
                    rx,
                    self.signaling.clone(),
                    self.rooms.clone(),
                );
                tokio::spawn(room.run());

                RoomHandle { tx, generation }
            })
            .clone()
    }

    fn forget(&self, room_id: &RoomId, generation: u64) {
        self.rooms
            .remove_if(room_id, |_, handle| handle.generation == generation);
    }
}

fn unreachable_or_not_in_room(to: Option<ParticipantId>) -> SignalError {
    match to {
        Some(to) => SignalError::ParticipantUnreachable(to),
        None => SignalError::NotInRoom,
    }
}
