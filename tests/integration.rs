//! Integration tests for linplayer-remote.
//!
//! Every test drives a real `RemoteServer` over loopback TCP.

use std::sync::{Arc, Mutex};

use linplayer_remote::bridge::PlaybackBridge;
use linplayer_remote::constants::{PlaybackState, ServerType};
use linplayer_remote::error::PlayerError;
use linplayer_remote::proxy::ProxyPrefs;
use linplayer_remote::store::{ConfigStore, ServerStore};
use linplayer_remote::{AppState, Player, RemoteServer, playback_channel};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const TOKEN: &str = "k3y9x2m1q0";

struct Harness {
    server: RemoteServer,
    store: Arc<ServerStore>,
    bridge: PlaybackBridge,
    port: u16,
}

async fn start_server() -> Harness {
    let store = Arc::new(ServerStore::in_memory());
    let (bridge, scheduler) = playback_channel();
    scheduler.spawn().unwrap();
    let state = AppState::new(store.clone(), Arc::new(ProxyPrefs::new()), bridge.clone());
    let server = RemoteServer::new(state);
    let port = server.start(TOKEN, 0).await.unwrap();
    Harness {
        server,
        store,
        bridge,
        port,
    }
}

async fn send_raw(port: u16, raw: &[u8]) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    stream.write_all(raw).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    String::from_utf8_lossy(&out).into_owned()
}

fn split_response(raw: &str) -> (u16, &str, &str) {
    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head
        .split(' ')
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap();
    (status, head, body)
}

async fn get(port: u16, target: &str) -> (u16, String) {
    let raw = send_raw(port, format!("GET {} HTTP/1.1\r\nHost: tv\r\n\r\n", target).as_bytes()).await;
    let (status, _, body) = split_response(&raw);
    (status, body.to_string())
}

async fn post(port: u16, path: &str, body: Value) -> Value {
    let body = body.to_string();
    let raw = format!(
        "POST {} HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        path,
        body.len(),
        body
    );
    let raw = send_raw(port, raw.as_bytes()).await;
    let (status, _, body) = split_response(&raw);
    assert_eq!(status, 200);
    serde_json::from_str(body).unwrap()
}

#[derive(Clone)]
struct FakePlayer(Arc<Mutex<(i64, bool)>>);

impl FakePlayer {
    const DURATION: i64 = 90_000;

    fn new(position: i64) -> Self {
        FakePlayer(Arc::new(Mutex::new((position, true))))
    }
}

impl Player for FakePlayer {
    fn position_ms(&self) -> i64 {
        self.0.lock().unwrap().0
    }

    fn duration_ms(&self) -> Option<i64> {
        Some(Self::DURATION)
    }

    fn play_when_ready(&self) -> bool {
        self.0.lock().unwrap().1
    }

    fn playback_state(&self) -> PlaybackState {
        PlaybackState::Ready
    }

    fn set_play_when_ready(&mut self, play: bool) -> Result<(), PlayerError> {
        self.0.lock().unwrap().1 = play;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PlayerError> {
        self.0.lock().unwrap().0 = 0;
        Ok(())
    }

    fn seek_to(&mut self, position_ms: i64) -> Result<(), PlayerError> {
        self.0.lock().unwrap().0 = position_ms;
        Ok(())
    }
}

mod wire {
    use super::*;

    #[tokio::test]
    async fn test_response_headers() {
        let h = start_server().await;
        let raw = send_raw(h.port, b"GET /nope HTTP/1.1\r\n\r\n").await;
        let (status, head, body) = split_response(&raw);
        assert_eq!(status, 404);
        assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(head.contains("Content-Type: text/plain; charset=utf-8"));
        assert!(head.contains("Cache-Control: no-store"));
        assert!(head.contains("Connection: close"));
        assert!(head.contains("Content-Length: 9"));
        assert_eq!(body, "not found");
    }

    #[tokio::test]
    async fn test_malformed_request_line_is_400() {
        let h = start_server().await;
        let raw = send_raw(h.port, b"GARBAGE\r\n\r\n").await;
        let (status, _, body) = split_response(&raw);
        assert_eq!(status, 400);
        assert_eq!(body, "bad request");
    }

    #[tokio::test]
    async fn test_empty_connection_gets_no_response() {
        let h = start_server().await;
        let mut stream = TcpStream::connect(("127.0.0.1", h.port)).await.unwrap();
        stream.shutdown().await.unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_stalled_peer_does_not_block_others() {
        let h = start_server().await;
        let mut stalled = TcpStream::connect(("127.0.0.1", h.port)).await.unwrap();
        stalled.write_all(b"GET /api/info HTTP/1.1\r\n").await.unwrap();

        let (status, _) = get(h.port, &format!("/api/info?token={}", TOKEN)).await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_index_page() {
        let h = start_server().await;
        let raw = send_raw(h.port, b"GET /index.html HTTP/1.1\r\n\r\n").await;
        let (status, head, body) = split_response(&raw);
        assert_eq!(status, 200);
        assert!(head.contains("Content-Type: text/html; charset=utf-8"));
        assert!(body.contains("/api/bulkAddServers"));
    }
}

mod routing {
    use super::*;

    #[tokio::test]
    async fn test_unknown_paths_are_404() {
        let h = start_server().await;
        for target in ["/api", "/api/player", "/favicon.ico", "/API/INFO"] {
            assert_eq!(get(h.port, target).await.0, 404, "{}", target);
        }
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let h = start_server().await;
        assert_eq!(get(h.port, "/api/addServer").await.0, 405);
        assert_eq!(get(h.port, "/api/player/control").await.0, 405);

        let raw = send_raw(h.port, b"POST /api/info HTTP/1.1\r\nContent-Length: 0\r\n\r\n").await;
        let (status, _, body) = split_response(&raw);
        assert_eq!(status, 405);
        assert_eq!(body, "method not allowed");
    }

    #[tokio::test]
    async fn test_get_token_checks() {
        let h = start_server().await;
        for path in ["/api/info", "/api/player/status"] {
            assert_eq!(get(h.port, path).await.0, 401);
            assert_eq!(get(h.port, &format!("{}?token=wrong", path)).await.0, 401);
            assert_eq!(get(h.port, &format!("{}?token={}", path, TOKEN)).await.0, 200);
        }
    }

    #[tokio::test]
    async fn test_post_token_mismatch_is_200_with_error() {
        let h = start_server().await;
        let v = post(
            h.port,
            "/api/setProxySettings",
            json!({ "token": "nope", "enabled": true }),
        )
        .await;
        assert_eq!(v, json!({ "ok": false, "error": "unauthorized" }));
    }
}

mod servers {
    use super::*;

    #[tokio::test]
    async fn test_add_server_plex_requires_token() {
        let h = start_server().await;
        let v = post(
            h.port,
            "/api/addServer",
            json!({ "token": TOKEN, "type": "plex", "baseUrl": "http://plex:32400", "apiKey": "" }),
        )
        .await;
        assert_eq!(v, json!({ "ok": false, "error": "missing token" }));
        assert!(h.store.list_servers().is_empty());
    }

    #[tokio::test]
    async fn test_add_server_then_info() {
        let h = start_server().await;
        let v = post(
            h.port,
            "/api/addServer",
            json!({
                "token": TOKEN,
                "type": "jellyfin",
                "baseUrl": "192.168.1.5:8096/",
                "apiKey": "abc",
                "displayName": "Living room",
            }),
        )
        .await;
        assert_eq!(v["ok"], true);
        let id = v["serverId"].as_str().unwrap().to_string();
        assert_eq!(v["activeServerId"], id.as_str());

        let (status, body) = get(h.port, &format!("/api/info?token={}", TOKEN)).await;
        assert_eq!(status, 200);
        let info: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(info["server"]["activeServerId"], id.as_str());
        assert_eq!(info["server"]["activeServerName"], "Living room");
        assert_eq!(info["server"]["activeServerBaseUrl"], "http://192.168.1.5:8096");
        assert_eq!(info["server"]["activeServerType"], "jellyfin");
    }

    #[tokio::test]
    async fn test_bulk_add_json_with_one_invalid() {
        let h = start_server().await;
        let text = json!([
            { "baseUrl": "http://a", "apiKey": "1" },
            { "baseUrl": "", "apiKey": "2" },
            { "type": "webdav", "baseUrl": "http://c", "username": "u", "password": "p" },
        ])
        .to_string();
        let v = post(
            h.port,
            "/api/bulkAddServers",
            json!({ "token": TOKEN, "text": text }),
        )
        .await;
        assert_eq!(v["added"], 2);
        assert_eq!(v["errors"].as_array().unwrap().len(), 1);

        let servers = h.store.list_servers();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[1].kind, ServerType::Webdav);
        assert_eq!(v["activeServerId"], servers[0].id.as_str());
    }

    #[tokio::test]
    async fn test_bulk_add_lines() {
        let h = start_server().await;
        let text = "# home\nwebdav|http://h|user|pass|remark\nemby|http://h|key|disp|remark|true\nbroken";
        let v = post(
            h.port,
            "/api/bulkAddServers",
            json!({ "token": TOKEN, "text": text, "defaultType": "plex" }),
        )
        .await;
        assert_eq!(v["added"], 2);
        assert_eq!(v["errors"], json!(["line 4: invalid format"]));

        let servers = h.store.list_servers();
        assert_eq!(servers[0].remark, "remark");
        assert_eq!(servers[1].display_name, "disp");
        assert_eq!(v["activeServerId"], servers[1].id.as_str());
    }
}

mod player {
    use super::*;

    #[tokio::test]
    async fn test_status_and_control() {
        let h = start_server().await;
        let (_, body) = get(h.port, &format!("/api/player/status?token={}", TOKEN)).await;
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!({ "ok": true, "active": false })
        );

        let player = FakePlayer::new(20_000);
        h.bridge.attach(Box::new(player.clone()), "Episode 4");

        let (_, body) = get(h.port, &format!("/api/player/status?token={}", TOKEN)).await;
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            v,
            json!({
                "ok": true,
                "active": true,
                "title": "Episode 4",
                "playing": true,
                "positionMs": 20_000,
                "durationMs": FakePlayer::DURATION,
            })
        );

        let v = post(
            h.port,
            "/api/player/control",
            json!({ "token": TOKEN, "action": "seekByMs", "value": -100_000 }),
        )
        .await;
        assert_eq!(v["positionMs"], 0);

        let v = post(
            h.port,
            "/api/player/control",
            json!({ "token": TOKEN, "action": "seekToMs", "value": "500000" }),
        )
        .await;
        assert_eq!(v["positionMs"], FakePlayer::DURATION);

        let v = post(
            h.port,
            "/api/player/control",
            json!({ "token": TOKEN, "action": "pause" }),
        )
        .await;
        assert_eq!(v["playing"], false);

        let v = post(
            h.port,
            "/api/player/control",
            json!({ "token": TOKEN, "action": "jump" }),
        )
        .await;
        assert_eq!(v, json!({ "ok": false, "error": "unknown action" }));
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_stop_clears_port_and_token() {
        let h = start_server().await;
        assert!(h.server.is_running());
        assert_eq!(h.server.token(), TOKEN);
        assert_ne!(h.port, 0);

        h.server.stop().await;
        assert!(!h.server.is_running());
        assert_eq!(h.server.port(), 0);
        assert_eq!(h.server.token(), "");
        assert!(TcpStream::connect(("127.0.0.1", h.port)).await.is_err());
    }

    #[tokio::test]
    async fn test_restart_reuses_free_port() {
        let h = start_server().await;
        assert_eq!(get(h.port, "/").await.0, 200);
        h.server.stop().await;

        let port = h.server.start(TOKEN, h.port).await.unwrap();
        assert_eq!(port, h.port);
        assert_eq!(get(port, "/").await.0, 200);
    }

    #[tokio::test]
    async fn test_occupied_port_falls_back() {
        let blocker = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let taken = blocker.local_addr().unwrap().port();

        let store = Arc::new(ServerStore::in_memory());
        let (bridge, _scheduler) = playback_channel();
        let server = RemoteServer::new(AppState::new(store, Arc::new(ProxyPrefs::new()), bridge));
        let port = server.start(" token ", taken).await.unwrap();
        assert_ne!(port, taken);
        assert_ne!(port, 0);
        assert_eq!(server.token(), "token");
        server.stop().await;
    }

    #[tokio::test]
    async fn test_start_while_running_is_a_no_op() {
        let h = start_server().await;
        let again = h.server.start("other", 0).await.unwrap();
        assert_eq!(again, h.port);
        assert_eq!(h.server.token(), TOKEN);
    }

    #[tokio::test]
    async fn test_ensure_started_persists_token_and_port() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("remote.json");
        let store = Arc::new(ServerStore::load_or_default(&path).unwrap());
        let (bridge, _scheduler) = playback_channel();
        let server = RemoteServer::new(AppState::new(
            store.clone(),
            Arc::new(ProxyPrefs::new()),
            bridge,
        ));

        let info = server.ensure_started().await.unwrap();
        assert_eq!(info.token.len(), 10);
        assert_eq!(store.token(), info.token);
        assert_eq!(store.port(), info.port);
        assert_eq!(server.port(), info.port);

        let again = server.ensure_started().await.unwrap();
        assert_eq!(again.token, info.token);
        assert_eq!(again.port, info.port);
        server.stop().await;

        let reloaded = ServerStore::load_or_default(&path).unwrap();
        assert_eq!(reloaded.token(), info.token);
        assert_eq!(reloaded.port(), info.port);
    }
}
