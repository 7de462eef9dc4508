//! Endpoint bodies. Authentication has already been checked by the router.

use serde_json::{Map, Value, json};

use crate::bulk::parse_bulk;
use crate::constants::ServerType;
use crate::entry::{EntryFields, ServerEntry, opt_string, read_bool, read_i64};
use crate::protocol::Response;
use crate::state::AppState;

type JsonObject = Map<String, Value>;

/// `GET /api/info`
pub fn info(state: &AppState) -> Response {
    let active_id = state.store.active_server_id();
    let summary = if active_id.is_empty() {
        None
    } else {
        state.store.server_summary(&active_id)
    };
    let (name, base_url, kind) = match &summary {
        Some(s) => (s.name.as_str(), s.base_url.as_str(), s.kind.as_str()),
        None => ("", "", ""),
    };

    Response::json(&json!({
        "ok": true,
        "app": {
            "name": state.app.name,
            "version": state.app.version,
        },
        "server": {
            "activeServerId": active_id,
            "activeServerName": name,
            "activeServerBaseUrl": base_url,
            "activeServerType": kind,
        },
        "proxy": {
            "enabled": state.proxy.is_enabled(),
            "subscriptionUrl": state.proxy.subscription_url(),
            "status": state.proxy.last_status(),
        },
    }))
}

/// `POST /api/addServer`
pub fn add_server(state: &AppState, body: &JsonObject) -> Response {
    let fields = EntryFields::from_json(body, ServerType::Emby, true);
    let entry = match ServerEntry::validate(fields) {
        Ok(entry) => entry,
        Err(e) => return Response::json_error(&e.to_string()),
    };

    match state.store.upsert(&entry, entry.activate) {
        Ok(saved) => Response::json(&json!({
            "ok": true,
            "serverId": saved.id,
            "activeServerId": state.store.active_server_id(),
        })),
        Err(e) => {
            tracing::warn!("failed to save server {}: {}", entry.base_url, e);
            Response::json_error(&format!("save failed: {}", e))
        }
    }
}

/// `POST /api/bulkAddServers`
///
/// Only the first saved entry is force-activated, and only when
/// `activateFirst` holds and no earlier entry already activated itself.
pub fn bulk_add_servers(state: &AppState, body: &JsonObject) -> Response {
    let text = opt_string(body, "text", "");
    let default_type = opt_string(body, "defaultType", ServerType::Emby.as_str());
    let activate_first = read_bool(body.get("activateFirst"), true);

    let import = parse_bulk(&text, &default_type);
    let mut errors = import.errors;
    let mut added = 0usize;
    let mut activated_any = false;

    for entry in &import.entries {
        let activate = entry.activate || (!activated_any && activate_first && added == 0);
        match state.store.upsert(entry, activate) {
            Ok(_) => {
                added += 1;
                activated_any |= activate;
            }
            Err(e) => errors.push(format!("save failed: {}", e)),
        }
    }

    tracing::info!("bulk import: {} added, {} rejected", added, errors.len());

    Response::json(&json!({
        "ok": true,
        "added": added,
        "activeServerId": state.store.active_server_id(),
        "errors": errors,
    }))
}

/// `POST /api/setProxySettings`
pub fn set_proxy_settings(state: &AppState, body: &JsonObject) -> Response {
    let enabled = read_bool(body.get("enabled"), false);
    let subscription_url = opt_string(body, "subscriptionUrl", "");

    let proxy = &state.proxy;
    proxy.set_subscription_url(&subscription_url);
    proxy.set_enabled(enabled);
    if enabled {
        proxy.apply_config();
        proxy.start();
    } else {
        proxy.stop();
    }

    Response::json(&json!({
        "ok": true,
        "enabled": proxy.is_enabled(),
        "subscriptionUrl": proxy.subscription_url(),
        "status": proxy.last_status(),
    }))
}

/// `GET /api/player/status`
pub async fn player_status(state: &AppState) -> Response {
    Response::json(&state.bridge.status().await.to_json())
}

/// `POST /api/player/control`
pub async fn player_control(state: &AppState, body: &JsonObject) -> Response {
    let action = opt_string(body, "action", "");
    let value = read_i64(body.get("value"));
    Response::json(&state.bridge.control(&action, value).await.to_json())
}
