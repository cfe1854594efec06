use std::io::{self, Read};
use std::time::Duration;

use canvas::{ApplyOutcome, Replica};
use clap::{Args, Parser, Subcommand};
use frames::{ClientMessage, FullState, Point, ServerMessage, SnapshotBody, Stroke};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("message decode failed: {0}")]
    Decode(#[from] frames::CodecError),
    #[error("timed out waiting for server message")]
    Timeout,
    #[error("server rejected request ({code}): {message}")]
    Server { code: String, message: String },
    #[error("invalid points `{0}`: expected space-separated x,y pairs")]
    InvalidPoints(String),
    #[error("invalid stroke: {0}")]
    Stroke(#[from] frames::StrokeError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("io failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "strokeboard-cli", about = "Strokeboard session and snapshot CLI")]
struct Cli {
    #[arg(long, env = "STROKEBOARD_BASE_URL", default_value = "http://127.0.0.1:5001")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    Snapshot(SnapshotCommand),
    Session(SessionCommand),
}

#[derive(Args, Debug)]
struct SnapshotCommand {
    #[command(subcommand)]
    command: SnapshotSubcommand,
}

#[derive(Subcommand, Debug)]
enum SnapshotSubcommand {
    /// Upload a `{log}` body or a bare `Point[][]` file.
    Save {
        name: String,
        #[arg(long, default_value = "-", help = "Input file path, or - for stdin")]
        input: String,
    },
    Load {
        name: String,
    },
    List,
}

#[derive(Args, Debug)]
struct SessionCommand {
    id: String,

    #[command(subcommand)]
    command: SessionSubcommand,
}

#[derive(Subcommand, Debug)]
enum SessionSubcommand {
    State,
    Draw {
        #[arg(long, help = "Space-separated x,y pairs, e.g. \"0,0 10,10\"")]
        points: String,
        #[arg(long, default_value = "#000000")]
        color: String,
        #[arg(long, default_value_t = 3.0)]
        width: f64,
    },
    Undo,
    Redo,
    Clear,
    Save {
        name: String,
    },
    Load {
        name: String,
    },
    Render {
        #[arg(long)]
        out: String,
        #[arg(long, default_value_t = canvas::consts::DEFAULT_WIDTH)]
        width: u32,
        #[arg(long, default_value_t = canvas::consts::DEFAULT_HEIGHT)]
        height: u32,
    },
    Watch {
        #[arg(long, help = "Stop after this many applied states")]
        count: Option<usize>,
    },
}

/// Snapshot upload accepts the HTTP body shape or the raw on-disk layout.
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotInput {
    Body(SnapshotBody),
    Bare(Vec<Stroke>),
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let base_url = cli.base_url.trim_end_matches('/').to_owned();

    match cli.command {
        Command::Ping => run_ping(&base_url).await,
        Command::Snapshot(snapshot) => run_snapshot(&base_url, snapshot).await,
        Command::Session(session) => run_session(&base_url, session).await,
    }
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let response = reqwest::Client::new().get(format!("{base_url}/healthz")).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::HttpStatus { status: status.as_u16(), body: "health check failed".to_owned() });
    }
    println!("ok");
    Ok(())
}

// =============================================================================
// SNAPSHOTS (HTTP)
// =============================================================================

async fn run_snapshot(base_url: &str, snapshot: SnapshotCommand) -> Result<(), CliError> {
    let json = match snapshot.command {
        SnapshotSubcommand::Save { name, input } => {
            let log = parse_snapshot_input(&read_input(&input)?)?;
            api_request(base_url, reqwest::Method::POST, &format!("/snapshots/{name}"), Some(&SnapshotBody { log }))
                .await?
        }
        SnapshotSubcommand::Load { name } => {
            api_request(base_url, reqwest::Method::GET, &format!("/snapshots/{name}"), None).await?
        }
        SnapshotSubcommand::List => api_request(base_url, reqwest::Method::GET, "/snapshots", None).await?,
    };
    print_json(&json)
}

async fn api_request(
    base_url: &str,
    method: reqwest::Method,
    path: &str,
    body: Option<&SnapshotBody>,
) -> Result<Value, CliError> {
    let request = reqwest::Client::new().request(method, format!("{base_url}{path}"));
    let request = if let Some(body) = body { request.json(body) } else { request };

    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(CliError::HttpStatus { status: status.as_u16(), body: text });
    }
    Ok(serde_json::from_str(&text)?)
}

fn read_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    Ok(std::fs::read_to_string(input)?)
}

fn parse_snapshot_input(text: &str) -> Result<Vec<Stroke>, CliError> {
    Ok(match serde_json::from_str::<SnapshotInput>(text)? {
        SnapshotInput::Body(body) => body.log,
        SnapshotInput::Bare(log) => log,
    })
}

// =============================================================================
// SESSIONS (WEBSOCKET)
// =============================================================================

async fn run_session(base_url: &str, session: SessionCommand) -> Result<(), CliError> {
    let url = ws_url(base_url, &session.id)?;
    let (mut stream, _) = connect_async(url).await.map_err(|error| CliError::WsConnect(Box::new(error)))?;

    let (width, height) = match &session.command {
        SessionSubcommand::Render { width, height, .. } => (*width, *height),
        _ => (canvas::consts::DEFAULT_WIDTH, canvas::consts::DEFAULT_HEIGHT),
    };
    let mut replica = Replica::new(width, height);
    let joined = wait_for_state(&mut stream, &mut replica).await?;

    match session.command {
        SessionSubcommand::State => print_state(&joined),
        // Intent commands print the first newer canonical state, which may
        // already include other members' changes. It is not a per-intent ack.
        SessionSubcommand::Draw { points, color, width } => {
            let stroke = stroke_from_points(&mut replica, parse_points(&points, &color, width)?)?;
            send(&mut stream, &ClientMessage::SubmitStroke { points: stroke.into() }).await?;
            print_state(&wait_for_state(&mut stream, &mut replica).await?);
        }
        SessionSubcommand::Undo => send_and_print(&mut stream, &mut replica, ClientMessage::Undo).await?,
        SessionSubcommand::Redo => send_and_print(&mut stream, &mut replica, ClientMessage::Redo).await?,
        SessionSubcommand::Clear => send_and_print(&mut stream, &mut replica, ClientMessage::Clear).await?,
        SessionSubcommand::Save { name } => {
            send(&mut stream, &ClientMessage::SaveSnapshot { name }).await?;
            loop {
                match recv_next(&mut stream, Duration::from_secs(15)).await? {
                    ServerMessage::SnapshotSaved { name, strokes } => {
                        println!("saved {name}: {strokes} strokes");
                        break;
                    }
                    ServerMessage::Error(payload) => {
                        return Err(CliError::Server { code: payload.code, message: payload.message });
                    }
                    ServerMessage::FullState(state) => {
                        replica.apply(state);
                    }
                }
            }
        }
        SessionSubcommand::Load { name } => {
            send_and_print(&mut stream, &mut replica, ClientMessage::LoadSnapshot { name }).await?;
        }
        SessionSubcommand::Render { out, .. } => {
            let ppm = replica.frame().to_ppm(canvas::consts::WHITE);
            std::fs::write(&out, ppm)?;
            eprintln!("rendered {} visible strokes to {out}", replica.visible().len());
        }
        SessionSubcommand::Watch { count } => {
            let mut applied = 0_usize;
            while count.is_none_or(|limit| applied < limit) {
                let ServerMessage::FullState(state) = recv_message(&mut stream).await? else {
                    continue;
                };
                match replica.apply(state) {
                    ApplyOutcome::Applied { .. } => {
                        print_state(replica.state());
                        applied = applied.saturating_add(1);
                    }
                    ApplyOutcome::Stale { received, current } => {
                        eprintln!("skipped stale state: version {received} <= {current}");
                    }
                }
            }
        }
    }

    stream.close(None).await.map_err(|error| CliError::WsConnect(Box::new(error)))
}

fn ws_url(base_url: &str, session_id: &str) -> Result<String, CliError> {
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/ws/{session_id}"));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/ws/{session_id}"));
    }
    Err(CliError::InvalidBaseUrl(base_url.to_owned()))
}

/// Parse `"x,y x,y ..."` into points sharing one colour and width.
fn parse_points(text: &str, color: &str, width: f64) -> Result<Vec<Point>, CliError> {
    text.split_whitespace()
        .map(|pair| {
            let (x, y) = pair.split_once(',').ok_or_else(|| CliError::InvalidPoints(pair.to_owned()))?;
            let x = x.trim().parse::<f64>().map_err(|_| CliError::InvalidPoints(pair.to_owned()))?;
            let y = y.trim().parse::<f64>().map_err(|_| CliError::InvalidPoints(pair.to_owned()))?;
            Ok(Point::new(x, y, color, width))
        })
        .collect()
}

/// Run points through the replica's gesture so short strokes are rejected
/// before anything is sent.
fn stroke_from_points(replica: &mut Replica, points: Vec<Point>) -> Result<Stroke, CliError> {
    let mut iter = points.into_iter();
    if let Some(first) = iter.next() {
        replica.begin_gesture(first);
        for point in iter {
            replica.extend_gesture(point);
        }
    }
    Ok(replica.finish_gesture()?)
}

/// Send an intent and print the session's latest canonical state.
async fn send_and_print(stream: &mut WsStream, replica: &mut Replica, message: ClientMessage) -> Result<(), CliError> {
    send(stream, &message).await?;
    print_state(&wait_for_state(stream, replica).await?);
    Ok(())
}

async fn send(stream: &mut WsStream, message: &ClientMessage) -> Result<(), CliError> {
    let json = frames::encode(message)?;
    stream.send(Message::text(json)).await.map_err(|error| CliError::WsConnect(Box::new(error)))
}

/// Wait until the replica applies a newer `fullState`.
///
/// The server acks nothing per intent: the state returned is simply the
/// next broadcast the replica accepts, so with concurrent writers it can
/// reflect other intents on top of (or ordered before) ours.
async fn wait_for_state(stream: &mut WsStream, replica: &mut Replica) -> Result<FullState, CliError> {
    loop {
        match recv_next(stream, Duration::from_secs(15)).await? {
            ServerMessage::FullState(state) => {
                if let ApplyOutcome::Applied { .. } = replica.apply(state) {
                    return Ok(replica.state().clone());
                }
            }
            ServerMessage::Error(payload) => {
                return Err(CliError::Server { code: payload.code, message: payload.message });
            }
            ServerMessage::SnapshotSaved { .. } => {}
        }
    }
}

async fn recv_next(stream: &mut WsStream, timeout: Duration) -> Result<ServerMessage, CliError> {
    tokio::time::timeout(timeout, recv_message(stream)).await.map_err(|_| CliError::Timeout)?
}

async fn recv_message(stream: &mut WsStream) -> Result<ServerMessage, CliError> {
    loop {
        let Some(message) = stream.next().await else {
            return Err(CliError::WsClosed);
        };
        match message.map_err(|error| CliError::WsConnect(Box::new(error)))? {
            Message::Text(text) => return frames::decode_server(text.as_str()).map_err(CliError::from),
            Message::Close(_) => return Err(CliError::WsClosed),
            _ => {}
        }
    }
}

fn print_state(state: &FullState) {
    println!(
        "version={} strokes={} horizon={} visible={}",
        state.version,
        state.log.len(),
        state.horizon,
        state.visible().len()
    );
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
