use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tandem_core::{ParticipantId, SignalMessage};
use tandem_server::{AppState, RelayConfig, router};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Timeout for a single expected signal (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 2000;

/// Start a relay on an ephemeral port.
pub async fn spawn_relay() -> Result<SocketAddr> {
    let state = AppState::new(RelayConfig::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, router(state)).await;
    });

    Ok(addr)
}

/// Bare WebSocket participant that speaks the wire protocol by hand.
pub struct RelayClient {
    pub participant_id: ParticipantId,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RelayClient {
    pub async fn connect(addr: SocketAddr, participant_id: &str) -> Result<Self> {
        let (ws, _) = connect_async(format!("ws://{}/ws", addr))
            .await
            .context("Failed to connect to relay")?;

        Ok(Self {
            participant_id: participant_id.into(),
            ws,
        })
    }

    pub async fn send(&mut self, msg: &SignalMessage) -> Result<()> {
        let json = tandem_core::encode(msg)?;
        self.ws.send(Message::text(json)).await?;
        Ok(())
    }

    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.ws.send(Message::text(text.to_string())).await?;
        Ok(())
    }

    pub async fn join(&mut self, room: &str) -> Result<Vec<ParticipantId>> {
        let msg = SignalMessage::JoinRoom {
            room_id: room.into(),
            participant_id: self.participant_id.clone(),
        };
        self.send(&msg).await?;

        match self
            .expect(|m| matches!(m, SignalMessage::RoomJoined { .. }))
            .await?
        {
            SignalMessage::RoomJoined { participants, .. } => Ok(participants),
            other => anyhow::bail!("unexpected {:?}", other),
        }
    }

    /// Next message matching `pred`; non-matching messages are skipped.
    pub async fn expect<F>(&mut self, pred: F) -> Result<SignalMessage>
    where
        F: Fn(&SignalMessage) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(SIGNAL_TIMEOUT_MS);

        loop {
            let frame = tokio::time::timeout_at(deadline, self.ws.next())
                .await
                .context("Timeout waiting for signal")?;

            match frame {
                Some(Ok(Message::Text(text))) => {
                    let msg = tandem_core::decode(text.as_str())?;
                    if pred(&msg) {
                        return Ok(msg);
                    }
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => anyhow::bail!("Relay closed the connection"),
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
