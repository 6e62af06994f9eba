use crate::media::{
    AdapterEvent, AdapterFactory, LinkSignal, MediaAdapter, MediaTrack, RemoteTrack, SdpKind,
    SessionDescription, TrackKind,
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tandem_core::{IceCandidate, IceServerConfig, ParticipantId};
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

/// Медиа-адаптер поверх `RTCPeerConnection` из webrtc-rs.
///
/// Движок не умеет откатывать локальный offer, поэтому до первого обмена
/// откат заменяет соединение новым с теми же дорожками.
pub struct WebRtcAdapter {
    remote: ParticipantId,
    rtc_config: RTCConfiguration,
    event_tx: mpsc::Sender<AdapterEvent>,
    generation: Arc<AtomicU64>,
    peer_connection: RwLock<Arc<RTCPeerConnection>>,
    local_tracks: Mutex<Vec<Arc<TrackLocalStaticSample>>>,
}

/// Delivers engine callbacks of one connection generation; events from a
/// replaced connection are dropped.
#[derive(Clone)]
struct EventGate {
    tx: mpsc::Sender<AdapterEvent>,
    current: Arc<AtomicU64>,
    generation: u64,
}

impl EventGate {
    async fn send(&self, event: AdapterEvent) {
        if self.current.load(Ordering::SeqCst) != self.generation {
            return;
        }
        let _ = self.tx.send(event).await;
    }
}

impl WebRtcAdapter {
    /// Создаёт соединение и подключает колбэки, которые пишут в `event_tx`.
    pub async fn new(
        remote: ParticipantId,
        ice_servers: &[IceServerConfig],
        event_tx: mpsc::Sender<AdapterEvent>,
    ) -> Result<Self> {
        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let generation = Arc::new(AtomicU64::new(0));
        let gate = EventGate {
            tx: event_tx.clone(),
            current: Arc::clone(&generation),
            generation: 0,
        };
        let peer_connection = connect(&remote, &rtc_config, gate).await?;

        Ok(Self {
            remote,
            rtc_config,
            event_tx,
            generation,
            peer_connection: RwLock::new(peer_connection),
            local_tracks: Mutex::new(Vec::new()),
        })
    }

    /// The connection currently in use; replaced by a rollback.
    pub async fn peer_connection(&self) -> Arc<RTCPeerConnection> {
        Arc::clone(&*self.peer_connection.read().await)
    }

    /// Local track by id, for writing samples into it.
    pub async fn local_track(&self, id: &str) -> Option<Arc<TrackLocalStaticSample>> {
        self.local_tracks
            .lock()
            .await
            .iter()
            .find(|t| t.id() == id)
            .cloned()
    }
}

async fn connect(
    remote: &ParticipantId,
    rtc_config: &RTCConfiguration,
    gate: EventGate,
) -> Result<Arc<RTCPeerConnection>> {
    let mut m = MediaEngine::default();
    m.register_default_codecs()?;
    let registry = register_default_interceptors(Registry::new(), &mut m)?;

    let api = APIBuilder::new()
        .with_media_engine(m)
        .with_interceptor_registry(registry)
        .build();

    let peer_connection = Arc::new(api.new_peer_connection(rtc_config.clone()).await?);

    let state_gate = gate.clone();
    let uid_state = remote.clone();
    peer_connection.on_ice_connection_state_change(Box::new(
        move |s: RTCIceConnectionState| {
            let gate = state_gate.clone();
            let uid = uid_state.clone();

            Box::pin(async move {
                debug!("ICE connection state for {}: {}", uid, s);
                let Some(signal) = link_signal(s) else {
                    return;
                };
                gate.send(AdapterEvent::ConnectionStateChanged(signal)).await;
            })
        },
    ));

    let ice_gate = gate.clone();
    peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
        let gate = ice_gate.clone();

        Box::pin(async move {
            let Some(candidate) = c else { return };
            let Ok(init) = candidate.to_json() else {
                return;
            };
            gate.send(AdapterEvent::IceCandidateGathered(IceCandidate {
                candidate: init.candidate,
                sdp_mid: init.sdp_mid,
                sdp_m_line_index: init.sdp_mline_index,
                username_fragment: init.username_fragment,
            }))
            .await;
        })
    }));

    let negotiation_gate = gate.clone();
    peer_connection.on_negotiation_needed(Box::new(move || {
        let gate = negotiation_gate.clone();
        Box::pin(async move {
            gate.send(AdapterEvent::NegotiationNeeded).await;
        })
    }));

    let track_gate = gate;
    let uid_track = remote.clone();
    peer_connection.on_track(Box::new(
        move |track: Arc<TrackRemote>,
              _receiver: Arc<RTCRtpReceiver>,
              _transceiver: Arc<RTCRtpTransceiver>| {
            let gate = track_gate.clone();
            let uid = uid_track.clone();

            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => TrackKind::Audio,
                    RTPCodecType::Video => TrackKind::Video,
                    other => {
                        warn!("Track of unknown kind {} from {}", other, uid);
                        return;
                    }
                };
                gate.send(AdapterEvent::TrackReceived(RemoteTrack {
                    id: track.id(),
                    stream_id: track.stream_id(),
                    kind,
                }))
                .await;
            })
        },
    ));

    Ok(peer_connection)
}

#[async_trait]
impl MediaAdapter for WebRtcAdapter {
    async fn create_local_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection().await.create_offer(None).await?;
        from_rtc(offer)
    }

    async fn create_local_answer(&self, _remote: &SessionDescription) -> Result<SessionDescription> {
        let answer = self.peer_connection().await.create_answer(None).await?;
        from_rtc(answer)
    }

    async fn apply_local_description(&self, description: SessionDescription) -> Result<()> {
        self.peer_connection()
            .await
            .set_local_description(to_rtc(description)?)
            .await?;
        Ok(())
    }

    async fn apply_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.peer_connection()
            .await
            .set_remote_description(to_rtc(description)?)
            .await
            .with_context(|| format!("remote description from {} rejected", self.remote))?;
        Ok(())
    }

    async fn rollback_local_description(&self) -> Result<()> {
        let mut current = self.peer_connection.write().await;
        if current.signaling_state() != RTCSignalingState::HaveLocalOffer {
            bail!("no local offer to roll back");
        }
        if current.remote_description().await.is_some() {
            bail!("engine cannot roll back an offer after the first exchange");
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let gate = EventGate {
            tx: self.event_tx.clone(),
            current: Arc::clone(&self.generation),
            generation,
        };
        let fresh = connect(&self.remote, &self.rtc_config, gate).await?;
        for track in self.local_tracks.lock().await.iter() {
            fresh
                .add_track(Arc::clone(track) as Arc<dyn TrackLocal + Send + Sync>)
                .await?;
        }

        let stale = std::mem::replace(&mut *current, fresh);
        drop(current);
        debug!("Replaced connection to {} to drop our offer", self.remote);
        if let Err(e) = stale.close().await {
            warn!("Failed to close replaced connection to {}: {}", self.remote, e);
        }
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection().await.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn add_track(&self, track: MediaTrack) -> Result<()> {
        let mime_type = match track.kind {
            TrackKind::Audio => MIME_TYPE_OPUS,
            TrackKind::Video => MIME_TYPE_VP8,
        };
        let local = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            track.id.clone(),
            track.stream_id.clone(),
        ));

        self.peer_connection()
            .await
            .add_track(Arc::clone(&local) as Arc<dyn TrackLocal + Send + Sync>)
            .await?;
        self.local_tracks.lock().await.push(local);
        info!("Publishing {} track '{}' to {}", track.kind, track.id, self.remote);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection().await.close().await?;
        Ok(())
    }
}

/// Creates a `WebRtcAdapter` per session.
#[derive(Debug, Default, Clone)]
pub struct WebRtcAdapterFactory;

#[async_trait]
impl AdapterFactory for WebRtcAdapterFactory {
    async fn create(
        &self,
        _local: &ParticipantId,
        remote: &ParticipantId,
        ice_servers: &[IceServerConfig],
        events: mpsc::Sender<AdapterEvent>,
    ) -> Result<Arc<dyn MediaAdapter>> {
        let adapter = WebRtcAdapter::new(remote.clone(), ice_servers, events).await?;
        Ok(Arc::new(adapter))
    }
}

fn link_signal(state: RTCIceConnectionState) -> Option<LinkSignal> {
    match state {
        RTCIceConnectionState::New => Some(LinkSignal::New),
        RTCIceConnectionState::Checking => Some(LinkSignal::Checking),
        RTCIceConnectionState::Connected => Some(LinkSignal::Connected),
        RTCIceConnectionState::Completed => Some(LinkSignal::Completed),
        RTCIceConnectionState::Disconnected => Some(LinkSignal::Disconnected),
        RTCIceConnectionState::Failed => Some(LinkSignal::Failed),
        RTCIceConnectionState::Closed => Some(LinkSignal::Closed),
        _ => None,
    }
}

fn to_rtc(description: SessionDescription) -> Result<RTCSessionDescription> {
    let desc = match description.kind {
        SdpKind::Offer => RTCSessionDescription::offer(description.sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(description.sdp)?,
    };
    Ok(desc)
}

fn from_rtc(description: RTCSessionDescription) -> Result<SessionDescription> {
    match description.sdp_type {
        RTCSdpType::Offer => Ok(SessionDescription::offer(description.sdp)),
        RTCSdpType::Answer | RTCSdpType::Pranswer => {
            Ok(SessionDescription::answer(description.sdp))
        }
        other => bail!("unexpected local description type {}", other),
    }
}
