use crate::error::SessionError;
use crate::media::{MediaAdapter, MediaTrack, SessionDescription};
use crate::negotiation::{IceCandidateBuffer, NegotiationState, SessionRole};
use crate::session::CloseReason;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tandem_core::{IceCandidate, ParticipantId, SignalMessage};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Отложенный запрос на согласование, пришедший не в `Stable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingNegotiation {
    Renegotiate,
}

/// Offer/answer state machine for one remote participant.
///
/// Every state change goes through the methods below; callers run them one at
/// a time, so an adapter call in flight blocks the next input.
pub struct NegotiationController {
    local: ParticipantId,
    remote: ParticipantId,
    polite: bool,
    state: NegotiationState,
    role: Option<SessionRole>,
    has_remote_description: bool,
    candidates: IceCandidateBuffer,
    pending: VecDeque<PendingNegotiation>,
    adapter: Arc<dyn MediaAdapter>,
    outbound: mpsc::UnboundedSender<SignalMessage>,
    cancel: watch::Receiver<Option<CloseReason>>,
}

impl NegotiationController {
    pub fn new(
        local: ParticipantId,
        remote: ParticipantId,
        adapter: Arc<dyn MediaAdapter>,
        outbound: mpsc::UnboundedSender<SignalMessage>,
        cancel: watch::Receiver<Option<CloseReason>>,
    ) -> Self {
        let polite = is_polite(&local, &remote);
        Self {
            local,
            remote,
            polite,
            state: NegotiationState::Idle,
            role: None,
            has_remote_description: false,
            candidates: IceCandidateBuffer::new(),
            pending: VecDeque::new(),
            adapter,
            outbound,
            cancel,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn role(&self) -> Option<SessionRole> {
        self.role
    }

    pub fn is_polite(&self) -> bool {
        self.polite
    }

    pub fn remote(&self) -> &ParticipantId {
        &self.remote
    }

    pub fn buffered_candidates(&self) -> usize {
        self.candidates.len()
    }

    pub fn queued_negotiations(&self) -> usize {
        self.pending.len()
    }

    /// Sends a fresh offer from `Idle`/`Stable`, queues the request otherwise.
    pub async fn start_negotiation(&mut self) -> Result<(), SessionError> {
        match self.state {
            NegotiationState::Closed => Err(SessionError::Closed),
            NegotiationState::Idle | NegotiationState::Stable => self.send_offer().await,
            state => {
                debug!(
                    "Negotiation with {} requested in {}, queued",
                    self.remote, state
                );
                self.pending.push_back(PendingNegotiation::Renegotiate);
                Ok(())
            }
        }
    }

    /// Dispatches an inbound offer, answer or candidate from the remote peer.
    pub async fn handle_signal(&mut self, msg: SignalMessage) -> Result<(), SessionError> {
        if self.state == NegotiationState::Closed {
            debug!("Session with {} is closed, dropping '{}'", self.remote, msg.kind());
            return Ok(());
        }

        match msg {
            SignalMessage::Offer { sdp, .. } => self.on_remote_offer(sdp).await,
            SignalMessage::Answer { sdp, .. } => self.on_remote_answer(sdp).await,
            SignalMessage::IceCandidate { candidate, .. } => {
                self.on_remote_candidate(candidate).await
            }
            other => {
                warn!(
                    "'{}' is not a negotiation message, ignoring",
                    other.kind()
                );
                Ok(())
            }
        }
    }

    /// Media engine asked for renegotiation. Honoured only in `Stable`: in any
    /// other state the engine raises it again once it is back to stable.
    pub async fn on_negotiation_needed(&mut self) -> Result<(), SessionError> {
        if self.state != NegotiationState::Stable {
            debug!(
                "negotiation-needed for {} in {}, ignoring",
                self.remote, self.state
            );
            return Ok(());
        }
        self.start_negotiation().await
    }

    pub async fn add_track(&mut self, track: MediaTrack) -> Result<(), SessionError> {
        if self.state == NegotiationState::Closed {
            return Err(SessionError::Closed);
        }

        info!("Adding {} track '{}' for {}", track.kind, track.id, self.remote);
        let adapter = self.adapter.clone();
        self.guard(adapter.add_track(track)).await?;

        // До первого обмена дорожка уйдёт в начальный offer/answer.
        if self.role.is_some() {
            self.start_negotiation().await?;
        }
        Ok(())
    }

    pub fn send_local_candidate(&self, candidate: IceCandidate) {
        if self.state == NegotiationState::Closed {
            return;
        }
        self.emit(SignalMessage::IceCandidate {
            to_participant_id: self.remote.clone(),
            candidate,
            from_participant_id: None,
        });
    }

    /// Moves to `Closed`, drops buffered candidates and queued requests and
    /// closes the adapter. Calling it again does nothing.
    pub async fn close(&mut self) {
        if self.state == NegotiationState::Closed {
            return;
        }
        self.state = NegotiationState::Closed;
        self.candidates.clear();
        self.pending.clear();

        if let Err(e) = self.adapter.close().await {
            error!("Failed to close media adapter for {}: {:#}", self.remote, e);
        }
    }

    async fn send_offer(&mut self) -> Result<(), SessionError> {
        if self.role.is_none() {
            self.role = Some(SessionRole::Caller);
        }

        let adapter = self.adapter.clone();
        let offer = self.guard(adapter.create_local_offer()).await?;
        self.guard(adapter.apply_local_description(offer.clone()))
            .await?;
        self.state = NegotiationState::HaveLocalOffer;

        debug!("{} -> {}: offer", self.local, self.remote);
        self.emit(SignalMessage::Offer {
            to_participant_id: self.remote.clone(),
            sdp: offer.sdp,
            from_participant_id: None,
        });
        Ok(())
    }

    async fn on_remote_offer(&mut self, sdp: String) -> Result<(), SessionError> {
        match self.state {
            NegotiationState::Idle | NegotiationState::Stable => self.accept_offer(sdp).await,

            NegotiationState::HaveLocalOffer if !self.polite => {
                info!(
                    "Offer collision with {}: keeping our offer, ignoring theirs",
                    self.remote
                );
                Ok(())
            }

            NegotiationState::HaveLocalOffer => {
                info!(
                    "Offer collision with {}: rolling back our offer",
                    self.remote
                );
                self.state = NegotiationState::RollingBack;
                let adapter = self.adapter.clone();
                self.guard(adapter.rollback_local_description()).await?;
                self.state = NegotiationState::Idle;
                self.accept_offer(sdp).await
            }

            state => {
                warn!("Offer from {} in {}, dropping", self.remote, state);
                Ok(())
            }
        }
    }

    async fn accept_offer(&mut self, sdp: String) -> Result<(), SessionError> {
        if self.role.is_none() {
            self.role = Some(SessionRole::Callee);
        }

        let offer = SessionDescription::offer(sdp);
        self.state = NegotiationState::HaveRemoteOffer;

        let adapter = self.adapter.clone();
        self.guard(adapter.apply_remote_description(offer.clone()))
            .await?;
        self.has_remote_description = true;
        self.flush_candidates().await?;

        let answer = self.guard(adapter.create_local_answer(&offer)).await?;
        self.guard(adapter.apply_local_description(answer.clone()))
            .await?;

        debug!("{} -> {}: answer", self.local, self.remote);
        self.emit(SignalMessage::Answer {
            to_participant_id: self.remote.clone(),
            sdp: answer.sdp,
            from_participant_id: None,
        });

        self.reach_stable().await
    }

    async fn on_remote_answer(&mut self, sdp: String) -> Result<(), SessionError> {
        if self.state != NegotiationState::HaveLocalOffer {
            debug!(
                "Answer from {} in {}, nothing to complete",
                self.remote, self.state
            );
            return Ok(());
        }

        let adapter = self.adapter.clone();
        self.guard(adapter.apply_remote_description(SessionDescription::answer(sdp)))
            .await?;
        self.has_remote_description = true;
        self.flush_candidates().await?;

        self.reach_stable().await
    }

    async fn on_remote_candidate(&mut self, candidate: IceCandidate) -> Result<(), SessionError> {
        if !self.has_remote_description {
            debug!("Buffering candidate from {}", self.remote);
            self.candidates.push(candidate);
            return Ok(());
        }

        let adapter = self.adapter.clone();
        self.guard(adapter.add_ice_candidate(candidate)).await
    }

    async fn flush_candidates(&mut self) -> Result<(), SessionError> {
        let buffered = self.candidates.drain();
        if buffered.is_empty() {
            return Ok(());
        }

        debug!(
            "Applying {} buffered candidates from {}",
            buffered.len(),
            self.remote
        );
        let adapter = self.adapter.clone();
        for candidate in buffered {
            self.guard(adapter.add_ice_candidate(candidate)).await?;
        }
        Ok(())
    }

    async fn reach_stable(&mut self) -> Result<(), SessionError> {
        self.state = NegotiationState::Stable;
        info!("Negotiation with {} is stable", self.remote);

        if self.pending.pop_front().is_some() {
            debug!(
                "Replaying queued negotiation with {} ({} left)",
                self.remote,
                self.pending.len()
            );
            self.send_offer().await?;
        }
        Ok(())
    }

    fn emit(&self, msg: SignalMessage) {
        if self.outbound.send(msg).is_err() {
            warn!("Relay link is gone, dropping message for {}", self.remote);
        }
    }

    /// Ждёт вызов адаптера, пока сессию не закрыли.
    async fn guard<T>(
        &self,
        op: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, SessionError> {
        let mut cancel = self.cancel.clone();
        if cancel.borrow().is_some() {
            return Err(SessionError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.wait_for(Option::is_some) => Err(SessionError::Cancelled),
            res = op => res.map_err(|e| SessionError::Adapter(format!("{e:#}"))),
        }
    }
}

/// The lexicographically smaller id is impolite and wins offer collisions.
pub fn is_polite(local: &ParticipantId, remote: &ParticipantId) -> bool {
    local > remote
}
