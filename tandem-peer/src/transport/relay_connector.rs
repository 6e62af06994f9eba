use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tandem_core::SignalMessage;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Канал к ретранслятору: входящие и исходящие сигнальные сообщения.
pub struct RelayLink {
    pub inbound: mpsc::UnboundedReceiver<SignalMessage>,
    pub outbound: mpsc::UnboundedSender<SignalMessage>,
}

/// Opens a WebSocket to the relay. `inbound` closes when the socket does;
/// dropping every `outbound` sender closes the socket.
pub async fn connect_relay(url: &str) -> Result<RelayLink> {
    let (ws, _) = connect_async(url)
        .await
        .with_context(|| format!("Failed to connect to relay at {url}"))?;
    info!("Connected to relay {}", url);

    let (mut sink, mut stream) = ws.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<SignalMessage>();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let json = match tandem_core::encode(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize signal message: {}", e);
                    continue;
                }
            };
            if sink.send(Message::text(json)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => match tandem_core::decode(text.as_str()) {
                    Ok(msg) => {
                        if inbound_tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Invalid SignalMessage from relay: {}", e),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("Relay WebSocket error: {}", e);
                    break;
                }
            }
        }
        debug!("Relay reader finished");
    });

    Ok(RelayLink {
        inbound: inbound_rx,
        outbound: outbound_tx,
    })
}
