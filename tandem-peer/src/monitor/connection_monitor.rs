use crate::media::LinkSignal;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Connected,
    Disconnected,
}

impl From<LinkSignal> for LinkState {
    fn from(signal: LinkSignal) -> Self {
        match signal {
            LinkSignal::Connected | LinkSignal::Completed => LinkState::Connected,
            LinkSignal::Disconnected | LinkSignal::Failed | LinkSignal::Closed => {
                LinkState::Disconnected
            }
            LinkSignal::New | LinkSignal::Checking => LinkState::Connecting,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Connecting => f.write_str("connecting"),
            LinkState::Connected => f.write_str("connected"),
            LinkState::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Сводит сигналы медиа-движка к трём состояниям и держит дедлайн
/// отключения. Таймером владеет сессия: она ждёт `deadline()` и зовёт
/// `poll_expired`.
#[derive(Debug)]
pub struct ConnectionMonitor {
    state: LinkState,
    timeout: Duration,
    deadline: Option<Instant>,
}

impl ConnectionMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: LinkState::Connecting,
            timeout,
            deadline: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the new state when the signal changes it.
    pub fn observe(&mut self, signal: LinkSignal) -> Option<LinkState> {
        self.transition(signal.into(), Instant::now())
    }

    /// The relay could not reach the peer; treated like a dropped link.
    pub fn mark_disconnected(&mut self) -> Option<LinkState> {
        self.transition(LinkState::Disconnected, Instant::now())
    }

    /// True once, when the disconnect deadline has passed.
    pub fn poll_expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    fn transition(&mut self, next: LinkState, now: Instant) -> Option<LinkState> {
        if next == self.state {
            return None;
        }
        self.state = next;

        match next {
            LinkState::Disconnected if self.deadline.is_none() => {
                self.deadline = Some(now + self.timeout);
            }
            LinkState::Connected => self.deadline = None,
            _ => {}
        }
        Some(next)
    }
}
