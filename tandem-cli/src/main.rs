use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::sync::Arc;
use std::time::Duration;
use tandem_core::utils::default_ice_servers;
use tandem_core::IceServerConfig;
use tandem_peer::{
    ClientCommand, MediaTrack, RoomClient, RoomEvent, SessionConfig, SessionEvent, TrackKind,
    WebRtcAdapterFactory, connect_relay,
};
use tandem_server::{AppState, RelayConfig, router};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "tandem", about = "WebRTC signaling relay and test participant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Serve(ServeArgs),
    /// Join a room as a participant and negotiate with everyone in it.
    Dial(DialArgs),
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, env = "TANDEM_ADDR", default_value = "0.0.0.0:3000")]
    addr: String,

    /// STUN server announced to participants; repeatable.
    #[arg(long = "stun-url", env = "TANDEM_STUN_URLS", value_delimiter = ',')]
    stun_urls: Vec<String>,

    #[arg(long, env = "TURN_URL")]
    turn_url: Option<String>,

    #[arg(long, env = "TURN_USERNAME")]
    turn_username: Option<String>,

    #[arg(long, env = "TURN_CREDENTIAL")]
    turn_credential: Option<String>,
}

#[derive(Args)]
struct DialArgs {
    #[arg(long, env = "TANDEM_RELAY_URL", default_value = "ws://127.0.0.1:3000/ws")]
    relay: String,

    #[arg(long)]
    room: String,

    /// Participant id; a random UUID when omitted.
    #[arg(long)]
    id: Option<String>,

    #[arg(long)]
    audio: bool,

    #[arg(long)]
    video: bool,

    #[arg(long, default_value_t = 6)]
    disconnect_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve(args) => serve(args).await,
        Commands::Dial(args) => dial(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut ice_servers = if args.stun_urls.is_empty() {
        default_ice_servers()
    } else {
        vec![IceServerConfig::stun(args.stun_urls)]
    };
    if let Some(url) = args.turn_url {
        ice_servers.push(IceServerConfig {
            urls: vec![url],
            username: args.turn_username,
            credential: args.turn_credential,
        });
    }

    let state = AppState::new(RelayConfig { ice_servers });
    let listener = TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;

    println!(
        "{}",
        format!("🚀 Relay listening on ws://{}/ws", listener.local_addr()?)
            .green()
            .bold()
    );
    axum::serve(listener, router(state))
        .await
        .context("Relay server stopped")?;
    Ok(())
}

async fn dial(args: DialArgs) -> Result<()> {
    let id = args.id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let link = connect_relay(&args.relay).await?;

    let config = SessionConfig {
        disconnect_timeout: Duration::from_secs(args.disconnect_timeout_secs),
    };
    let client = RoomClient::new(
        id.as_str().into(),
        config,
        Arc::new(WebRtcAdapterFactory),
        link.outbound,
    );

    let (commands, command_rx) = mpsc::unbounded_channel();
    let (event_tx, mut events) = mpsc::unbounded_channel();

    if args.audio {
        commands.send(ClientCommand::AddTrack(MediaTrack::new(
            "audio",
            id.as_str(),
            TrackKind::Audio,
        )))?;
    }
    if args.video {
        commands.send(ClientCommand::AddTrack(MediaTrack::new(
            "video",
            id.as_str(),
            TrackKind::Video,
        )))?;
    }
    commands.send(ClientCommand::Join(args.room.as_str().into()))?;

    println!(
        "{}",
        format!("📡 Dialing room '{}' as {}", args.room, id).cyan()
    );
    let client_task = tokio::spawn(client.run(link.inbound, command_rx, event_tx));

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, leaving room");
                let _ = commands.send(ClientCommand::Leave);
                break;
            }
        }
    }

    drop(commands);
    let _ = client_task.await;
    println!("{}", "👋 Bye".green());
    Ok(())
}

fn print_event(event: &RoomEvent) {
    match event {
        RoomEvent::Joined {
            room_id,
            participants,
        } => println!(
            "{} room '{}', {} already inside",
            "joined".green().bold(),
            room_id,
            participants.len()
        ),
        RoomEvent::ParticipantJoined(p) => println!("{} {}", "+".green(), p),
        RoomEvent::ParticipantLeft(p) => println!("{} {}", "-".yellow(), p),
        RoomEvent::Session(SessionEvent::StateChanged { peer, state }) => {
            println!("   {} negotiation: {}", peer, state)
        }
        RoomEvent::Session(SessionEvent::LinkChanged { peer, state }) => {
            println!("   {} link: {}", peer, state.to_string().cyan())
        }
        RoomEvent::Session(SessionEvent::TrackReceived { peer, track }) => {
            println!("   {} sends {} track '{}'", peer, track.kind, track.id)
        }
        RoomEvent::Session(SessionEvent::Closed { peer, reason, .. }) => {
            println!("   {} session closed: {}", peer, reason.to_string().red())
        }
    }
}
