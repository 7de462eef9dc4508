//! Route table and token checks.
//!
//! GET endpoints take the token from the `token` query parameter and answer
//! 401 on mismatch. POST endpoints take it from the `token` field of the JSON
//! body and answer 200 with `{"ok":false,"error":"unauthorized"}`. Clients
//! depend on both behaviors.

use serde_json::{Map, Value};

use crate::entry::opt_string;
use crate::handlers;
use crate::protocol::{Request, Response};
use crate::state::AppState;

/// The embedded control page.
pub const INDEX_HTML: &str = include_str!("../assets/remote_index.html");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Index,
    Info,
    AddServer,
    BulkAddServers,
    SetProxySettings,
    PlayerStatus,
    PlayerControl,
}

impl Route {
    /// Exact-match lookup.
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/" | "/index.html" => Some(Route::Index),
            "/api/info" => Some(Route::Info),
            "/api/addServer" => Some(Route::AddServer),
            "/api/bulkAddServers" => Some(Route::BulkAddServers),
            "/api/setProxySettings" => Some(Route::SetProxySettings),
            "/api/player/status" => Some(Route::PlayerStatus),
            "/api/player/control" => Some(Route::PlayerControl),
            _ => None,
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Route::Index | Route::Info | Route::PlayerStatus => "GET",
            Route::AddServer
            | Route::BulkAddServers
            | Route::SetProxySettings
            | Route::PlayerControl => "POST",
        }
    }
}

/// Dispatches requests for one running server.
pub struct Router {
    token: String,
    state: AppState,
}

impl Router {
    pub fn new(token: impl Into<String>, state: AppState) -> Self {
        Self {
            token: token.into(),
            state,
        }
    }

    pub async fn route(&self, req: &Request) -> Response {
        let Some(route) = Route::from_path(&req.path) else {
            return Response::plain(404, "not found");
        };
        if req.method != route.method() {
            return Response::plain(405, "method not allowed");
        }

        match route {
            Route::Index => Response::html(INDEX_HTML),
            Route::Info | Route::PlayerStatus => {
                if !self.check_token(req.query_param("token").unwrap_or_default()) {
                    return Response::plain(401, "unauthorized");
                }
                if route == Route::Info {
                    handlers::info(&self.state)
                } else {
                    handlers::player_status(&self.state).await
                }
            }
            _ => {
                let Some(body) = json_object(&req.body) else {
                    return Response::json_error("invalid json");
                };
                if !self.check_token(&opt_string(&body, "token", "")) {
                    return Response::json_error("unauthorized");
                }
                match route {
                    Route::AddServer => handlers::add_server(&self.state, &body),
                    Route::BulkAddServers => handlers::bulk_add_servers(&self.state, &body),
                    Route::SetProxySettings => handlers::set_proxy_settings(&self.state, &body),
                    _ => handlers::player_control(&self.state, &body).await,
                }
            }
        }
    }

    /// Exact, case-sensitive comparison of the trimmed caller token.
    /// An empty server token never matches.
    fn check_token(&self, supplied: &str) -> bool {
        !self.token.is_empty() && self.token == supplied.trim()
    }
}

fn json_object(body: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}
