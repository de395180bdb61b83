use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use maze_chase::config::LevelConfig;
use maze_chase::constants::TICK_MS;
use maze_chase::engine::GameEngine;
use maze_chase::error::ConfigError;
use maze_chase::log::{emit_log, LogLevel};
use maze_chase::types::Direction;
use rand::Rng;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    level: LevelConfig,
    game: GameEngine,
    session_id: String,
    pending_input: Option<Direction>,
    game_over_sent: bool,
}

impl ServerState {
    fn new(level: LevelConfig, seed: u32) -> Result<Self, ConfigError> {
        let game = GameEngine::new(level.clone(), seed)?;
        Ok(Self {
            clients: HashMap::new(),
            level,
            game,
            session_id: make_id("session"),
            pending_input: None,
            game_over_sent: false,
        })
    }

    fn restart(&mut self, seed: u32) -> Result<(), ConfigError> {
        self.game = GameEngine::new(self.level.clone(), seed)?;
        self.session_id = make_id("session");
        self.pending_input = None;
        self.game_over_sent = false;
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
enum ParsedClientMessage {
    Input { dir: Direction },
    Restart,
    Ping { t: f64 },
}

#[tokio::main]
async fn main() {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let seed = resolve_seed(std::env::var("SEED").ok().as_deref());

    let level = match std::env::var("LEVEL_PATH") {
        Ok(path) => LevelConfig::from_json_file(&PathBuf::from(path)),
        Err(_) => Ok(LevelConfig::default()),
    };
    let state = match level.and_then(|level| ServerState::new(level, seed)) {
        Ok(state) => state,
        Err(error) => {
            emit_log(
                LogLevel::Error,
                "level_invalid",
                "server",
                Some(seed),
                None,
                json!({ "error": error.to_string() }),
            );
            std::process::exit(2);
        }
    };
    emit_log(
        LogLevel::Info,
        "session_started",
        &state.session_id,
        Some(seed),
        None,
        json!({ "remainingCollectibles": state.game.grid().remaining_collectibles() }),
    );

    let state = Arc::new(Mutex::new(state));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        println!(
            "[server] static file root: {}",
            static_dir.to_string_lossy()
        );
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        eprintln!("[server] static file root not found; serving the websocket only");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            eprintln!("[server] failed to bind {bind_addr}: {error}");
            std::process::exit(1);
        }
    };

    println!("[server] listening on :{port}");
    if let Err(error) = axum::serve(listener, app).await {
        eprintln!("[server] runtime failed: {error}");
        std::process::exit(1);
    }
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }
    let fallback = PathBuf::from("static");
    fallback.join("index.html").is_file().then_some(fallback)
}

fn resolve_seed(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or_else(|| rand::rng().random())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<String>(256);

    {
        let mut guard = state.lock().await;
        guard
            .clients
            .insert(client_id.clone(), ClientContext { tx: tx.clone() });
        send_world_init(&mut guard, &client_id);
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };
        match message {
            Message::Text(raw) => handle_client_message(&state, &client_id, raw.as_str()).await,
            Message::Binary(raw) => match std::str::from_utf8(&raw) {
                Ok(text) => handle_client_message(&state, &client_id, text).await,
                Err(_) => send_error(&state, &client_id, "invalid utf8 message").await,
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.lock().await.clients.remove(&client_id);
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: &SharedState, client_id: &str, raw: &str) {
    let Some(message) = parse_client_message(raw) else {
        send_error(state, client_id, "invalid message").await;
        return;
    };

    let mut guard = state.lock().await;
    match message {
        ParsedClientMessage::Input { dir } => {
            if dir != Direction::None {
                guard.pending_input = Some(dir);
            }
        }
        ParsedClientMessage::Restart => {
            let seed = resolve_seed(None);
            if let Err(error) = guard.restart(seed) {
                // The level was valid at startup, so this only reports.
                emit_log(
                    LogLevel::Error,
                    "restart_failed",
                    &guard.session_id,
                    Some(seed),
                    None,
                    json!({ "error": error.to_string() }),
                );
                return;
            }
            emit_log(
                LogLevel::Info,
                "session_started",
                &guard.session_id,
                Some(seed),
                None,
                json!({ "requestedBy": client_id }),
            );
            let client_ids: Vec<String> = guard.clients.keys().cloned().collect();
            for id in client_ids {
                send_world_init(&mut guard, &id);
            }
        }
        ParsedClientMessage::Ping { t } => {
            send_to_client(
                &mut guard,
                client_id,
                &json!({ "type": "pong", "t": t }),
                QueuePolicy::DisconnectOnFull,
            );
        }
    }
}

fn send_world_init(state: &mut ServerState, client_id: &str) {
    let message = json!({
        "type": "world_init",
        "sessionId": state.session_id,
        "seed": state.game.seed(),
        "world": state.game.get_world_init(),
        "snapshot": state.game.build_snapshot(false),
    });
    send_to_client(state, client_id, &message, QueuePolicy::DisconnectOnFull);
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_game(&mut guard);
        }
    });
}

fn tick_game(state: &mut ServerState) {
    if state.game_over_sent {
        return;
    }
    let input = state.pending_input.take();
    state.game.step(input);
    let snapshot = state.game.build_snapshot(true);
    broadcast(
        state,
        &json!({ "type": "state", "snapshot": snapshot }),
        QueuePolicy::DropOnFull,
    );

    if !state.game.is_ended() {
        return;
    }
    let summary = state.game.build_summary();
    emit_log(
        LogLevel::Info,
        "session_finished",
        &state.session_id,
        Some(state.game.seed()),
        Some(summary.ticks),
        json!({
            "reason": summary.reason,
            "score": summary.score,
            "lives": summary.lives,
            "ghostsEaten": summary.ghosts_eaten,
        }),
    );
    broadcast(
        state,
        &json!({ "type": "game_over", "summary": summary }),
        QueuePolicy::DisconnectOnFull,
    );
    state.game_over_sent = true;
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = state
        .clients
        .get(client_id)
        .is_some_and(|client| client.tx.try_send(message.to_string()).is_err());
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        state.clients.remove(client_id);
    }
}

fn broadcast(state: &mut ServerState, message: &Value, policy: QueuePolicy) {
    let payload = message.to_string();
    let failed: Vec<String> = state
        .clients
        .iter()
        .filter(|(_, client)| client.tx.try_send(payload.clone()).is_err())
        .map(|(id, _)| id.clone())
        .collect();
    if policy == QueuePolicy::DisconnectOnFull {
        for client_id in failed {
            state.clients.remove(&client_id);
        }
    }
}

async fn send_error(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_to_client(
        &mut guard,
        client_id,
        &json!({ "type": "error", "message": message }),
        QueuePolicy::DropOnFull,
    );
}

fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    match object.get("type")?.as_str()? {
        "input" => {
            let dir = Direction::parse_move(object.get("dir")?.as_str()?)?;
            Some(ParsedClientMessage::Input { dir })
        }
        "restart" => Some(ParsedClientMessage::Restart),
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ServerState {
        ServerState::new(LevelConfig::default(), 77).expect("classic level")
    }

    #[test]
    fn parse_input_message() {
        let parsed = parse_client_message(r#"{"type":"input","dir":"left"}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::Input {
                dir: Direction::Left
            })
        );
    }

    #[test]
    fn parse_input_rejects_invalid_or_missing_direction() {
        assert!(parse_client_message(r#"{"type":"input","dir":"invalid"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"input"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"input","dir":3}"#).is_none());
    }

    #[test]
    fn parse_input_accepts_none_direction() {
        assert_eq!(
            parse_client_message(r#"{"type":"input","dir":"none"}"#),
            Some(ParsedClientMessage::Input {
                dir: Direction::None
            })
        );
    }

    #[test]
    fn parse_restart_and_ping() {
        assert_eq!(
            parse_client_message(r#"{"type":"restart"}"#),
            Some(ParsedClientMessage::Restart)
        );
        assert!(matches!(
            parse_client_message(r#"{"type":"ping","t":12.5}"#),
            Some(ParsedClientMessage::Ping { .. })
        ));
        assert!(parse_client_message(r#"{"type":"hello"}"#).is_none());
        assert!(parse_client_message("not json").is_none());
    }

    #[test]
    fn seed_env_parsing_falls_back_to_random() {
        assert_eq!(resolve_seed(Some(" 42 ")), 42);
        let _ = resolve_seed(Some("abc"));
        let _ = resolve_seed(None);
    }

    #[test]
    fn tick_consumes_pending_input_once() {
        let mut state = state();
        state.pending_input = Some(Direction::Left);
        tick_game(&mut state);
        assert_eq!(state.pending_input, None);
        assert_eq!(state.game.tick(), 1);
        assert_eq!(state.game.player().direction(), Direction::Left);
    }

    #[test]
    fn clients_receive_state_and_full_queues_are_dropped() {
        let mut state = state();
        let (tx, mut rx) = mpsc::channel::<String>(1);
        state.clients.insert("client_a".to_string(), ClientContext { tx });

        tick_game(&mut state);
        let payload = rx.try_recv().expect("state message queued");
        let value: Value = serde_json::from_str(&payload).expect("valid json");
        assert_eq!(value["type"], "state");
        assert_eq!(value["snapshot"]["tick"], 1);

        send_to_client(
            &mut state,
            "client_a",
            &json!({ "type": "pong" }),
            QueuePolicy::DisconnectOnFull,
        );
        send_to_client(
            &mut state,
            "client_a",
            &json!({ "type": "pong" }),
            QueuePolicy::DisconnectOnFull,
        );
        assert!(state.clients.is_empty());
    }

    #[test]
    fn restart_replaces_the_session() {
        let mut state = state();
        let before = state.session_id.clone();
        tick_game(&mut state);
        state.game_over_sent = true;
        state.restart(5).expect("level stays valid");
        assert_ne!(state.session_id, before);
        assert_eq!(state.game.tick(), 0);
        assert_eq!(state.game.seed(), 5);
        assert!(!state.game_over_sent);
    }
}
