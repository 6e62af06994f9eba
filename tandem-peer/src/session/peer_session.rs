use crate::error::SessionError;
use crate::media::{AdapterEvent, MediaAdapter};
use crate::monitor::{ConnectionMonitor, LinkState};
use crate::negotiation::{NegotiationController, NegotiationState};
use crate::session::{CloseReason, SessionCommand, SessionConfig, SessionEvent, SessionHandle};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tandem_core::{ParticipantId, SignalMessage};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Всё, что нужно сессии помимо конфигурации.
pub struct SessionParts {
    pub local: ParticipantId,
    pub remote: ParticipantId,
    pub adapter: Arc<dyn MediaAdapter>,
    pub adapter_events: mpsc::Receiver<AdapterEvent>,
    /// Исходящие сообщения для реле.
    pub outbound: mpsc::UnboundedSender<SignalMessage>,
    /// События для приложения.
    pub events: mpsc::UnboundedSender<SessionEvent>,
}

/// Актор сессии с одним удалённым участником. Владеет контроллером
/// согласования и монитором связи; команды обрабатываются строго по одной.
pub struct PeerSession {
    id: u64,
    remote: ParticipantId,
    controller: NegotiationController,
    last_state: NegotiationState,
    monitor: ConnectionMonitor,
    command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    adapter_rx: mpsc::Receiver<AdapterEvent>,
    adapter_open: bool,
    close_rx: watch::Receiver<Option<CloseReason>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl PeerSession {
    pub fn spawn(config: &SessionConfig, parts: SessionParts) -> SessionHandle {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = watch::channel(None);

        let controller = NegotiationController::new(
            parts.local,
            parts.remote.clone(),
            parts.adapter,
            parts.outbound,
            close_rx.clone(),
        );

        let session = PeerSession {
            id,
            remote: parts.remote.clone(),
            controller,
            last_state: NegotiationState::Idle,
            monitor: ConnectionMonitor::new(config.disconnect_timeout),
            command_rx,
            adapter_rx: parts.adapter_events,
            adapter_open: true,
            close_rx,
            events: parts.events,
        };
        tokio::spawn(session.run());

        SessionHandle {
            id,
            remote: parts.remote,
            command_tx,
            close_tx: Arc::new(close_tx),
        }
    }

    async fn run(mut self) {
        info!(
            "Session {} with {} started (polite: {})",
            self.id,
            self.remote,
            self.controller.is_polite()
        );

        let reason = loop {
            let deadline = self.monitor.deadline();

            tokio::select! {
                biased;

                closed = close_requested(&mut self.close_rx) => {
                    break closed.unwrap_or(CloseReason::LocalClose);
                }

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if self.monitor.poll_expired(Instant::now()) {
                        warn!("Link to {} did not recover in time", self.remote);
                        break CloseReason::ConnectionTimeout;
                    }
                }

                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => {
                        if let ControlFlow::Break(reason) = self.handle_command(cmd).await {
                            break reason;
                        }
                    }
                    None => break CloseReason::LocalClose,
                },

                event = self.adapter_rx.recv(), if self.adapter_open => match event {
                    Some(event) => {
                        if let ControlFlow::Break(reason) = self.handle_adapter_event(event).await {
                            break reason;
                        }
                    }
                    None => {
                        debug!("Adapter event feed for {} closed", self.remote);
                        self.adapter_open = false;
                    }
                },
            }
        };

        self.shutdown(reason).await;
    }

    async fn handle_command(&mut self, cmd: SessionCommand) -> ControlFlow<CloseReason> {
        let result = match cmd {
            SessionCommand::Signal(msg) => self.controller.handle_signal(msg).await,
            SessionCommand::StartNegotiation => self.controller.start_negotiation().await,
            SessionCommand::AddTrack(track) => self.controller.add_track(track).await,
            SessionCommand::LinkLost => {
                if let Some(state) = self.monitor.mark_disconnected() {
                    self.link_changed(state);
                }
                Ok(())
            }
        };
        self.settle(result)
    }

    async fn handle_adapter_event(&mut self, event: AdapterEvent) -> ControlFlow<CloseReason> {
        let result = match event {
            AdapterEvent::NegotiationNeeded => self.controller.on_negotiation_needed().await,
            AdapterEvent::IceCandidateGathered(candidate) => {
                self.controller.send_local_candidate(candidate);
                Ok(())
            }
            AdapterEvent::TrackReceived(track) => {
                info!("Received {} track '{}' from {}", track.kind, track.id, self.remote);
                self.emit(SessionEvent::TrackReceived {
                    peer: self.remote.clone(),
                    track,
                });
                Ok(())
            }
            AdapterEvent::ConnectionStateChanged(signal) => {
                if let Some(state) = self.monitor.observe(signal) {
                    self.link_changed(state);
                }
                Ok(())
            }
        };
        self.settle(result)
    }

    /// Reports the state change, if any, and turns adapter failures into a
    /// close reason.
    fn settle(&mut self, result: Result<(), SessionError>) -> ControlFlow<CloseReason> {
        self.report_state();

        match result {
            Ok(()) => ControlFlow::Continue(()),
            // Причина закрытия уже лежит в watch-канале.
            Err(SessionError::Cancelled) => ControlFlow::Continue(()),
            Err(SessionError::Closed) => ControlFlow::Break(CloseReason::LocalClose),
            Err(SessionError::Adapter(e)) => {
                warn!("Media adapter for {} failed: {}", self.remote, e);
                ControlFlow::Break(CloseReason::AdapterFailure(e))
            }
        }
    }

    fn link_changed(&self, state: LinkState) {
        info!("Link to {} is {}", self.remote, state);
        self.emit(SessionEvent::LinkChanged {
            peer: self.remote.clone(),
            state,
        });
    }

    fn report_state(&mut self) {
        let state = self.controller.state();
        if state == self.last_state {
            return;
        }
        self.last_state = state;
        self.emit(SessionEvent::StateChanged {
            peer: self.remote.clone(),
            state,
        });
    }

    async fn shutdown(mut self, reason: CloseReason) {
        info!("Session {} with {} closing: {}", self.id, self.remote, reason);

        self.controller.close().await;
        self.report_state();

        self.emit(SessionEvent::Closed {
            peer: self.remote.clone(),
            session_id: self.id,
            reason,
        });
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("Nobody listens to session {} events", self.id);
        }
    }
}

/// Resolves with the close reason once one is set; `None` if the handle side
/// is gone.
async fn close_requested(
    close_rx: &mut watch::Receiver<Option<CloseReason>>,
) -> Option<CloseReason> {
    close_rx.wait_for(Option::is_some).await.ok()?.clone()
}
