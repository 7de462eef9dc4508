//! Media-server registration entries and their validation.
//!
//! `/api/addServer` and every bulk-import item go through [`ServerEntry::validate`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::ServerType;
use crate::error::ValidationError;

/// A server registration produced by the API or the bulk parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerEntry {
    pub kind: ServerType,
    pub base_url: String,
    pub api_key: String,
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub remark: String,
    pub activate: bool,
}

/// Unvalidated fields, as read from a request, a JSON object or a text line.
#[derive(Debug, Clone, Default)]
pub struct EntryFields {
    pub kind: ServerType,
    pub base_url: String,
    pub api_key: String,
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub remark: String,
    pub activate: bool,
}

impl EntryFields {
    /// Read the fields of a JSON object.
    ///
    /// `apiKey` falls back to `token`; an unknown `type` falls back to `default_kind`.
    pub fn from_json(obj: &Map<String, Value>, default_kind: ServerType, activate_default: bool) -> Self {
        let kind = opt_string(obj, "type", default_kind.as_str());
        let api_key = match obj.get("apiKey") {
            Some(v) if !v.is_null() => value_to_string(v),
            _ => opt_string(obj, "token", ""),
        };
        EntryFields {
            kind: ServerType::parse_or(&kind, default_kind),
            base_url: opt_string(obj, "baseUrl", ""),
            api_key,
            username: opt_string(obj, "username", ""),
            password: opt_string(obj, "password", ""),
            display_name: opt_string(obj, "displayName", ""),
            remark: opt_string(obj, "remark", ""),
            activate: read_bool(obj.get("activate"), activate_default),
        }
    }
}

impl ServerEntry {
    /// Normalize and check the type-specific required fields.
    ///
    /// Every field except the password is trimmed.
    pub fn validate(fields: EntryFields) -> Result<ServerEntry, ValidationError> {
        let base_url = normalize_base_url(&fields.base_url);
        let api_key = fields.api_key.trim().to_string();
        let username = fields.username.trim().to_string();

        if base_url.is_empty() {
            return Err(ValidationError::MissingBaseUrl);
        }
        match fields.kind {
            ServerType::Webdav if username.is_empty() => {
                return Err(ValidationError::MissingUsername);
            }
            ServerType::Plex if api_key.is_empty() => return Err(ValidationError::MissingToken),
            ServerType::Emby | ServerType::Jellyfin if api_key.is_empty() => {
                return Err(ValidationError::MissingApiKey);
            }
            _ => {}
        }

        Ok(ServerEntry {
            kind: fields.kind,
            base_url,
            api_key,
            username,
            password: fields.password,
            display_name: fields.display_name.trim().to_string(),
            remark: fields.remark.trim().to_string(),
            activate: fields.activate,
        })
    }
}

/// A persisted server, as owned by the configuration store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ServerType,
    pub base_url: String,
    pub api_key: String,
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub remark: String,
}

impl ServerConfig {
    pub fn from_entry(id: impl Into<String>, entry: &ServerEntry) -> Self {
        ServerConfig {
            id: id.into(),
            kind: entry.kind,
            base_url: entry.base_url.clone(),
            api_key: entry.api_key.clone(),
            username: entry.username.clone(),
            password: entry.password.clone(),
            display_name: entry.display_name.clone(),
            remark: entry.remark.clone(),
        }
    }

    /// Display name, else base URL, else `"Server"`.
    pub fn effective_name(&self) -> &str {
        [self.display_name.trim(), self.base_url.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or("Server")
    }
}

/// Trim, default the scheme to `http://`, and strip trailing slashes.
pub fn normalize_base_url(raw: &str) -> String {
    let v = raw.trim();
    if v.is_empty() {
        return String::new();
    }
    let with_scheme = if v.contains("://") {
        v.to_string()
    } else {
        format!("http://{}", v)
    };
    with_scheme.trim_end_matches('/').to_string()
}

/// Parse `true/false/1/0/yes/no/y/n`, case-insensitively.
pub fn parse_bool_literal(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Lenient boolean read of a JSON value.
pub fn read_bool(value: Option<&Value>, fallback: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f.trunc() != 0.0),
        Some(Value::String(s)) => parse_bool_literal(s).unwrap_or(fallback),
        _ => fallback,
    }
}

/// String read of a JSON field; absent or `null` yields `default`.
pub fn opt_string(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    match obj.get(key) {
        None | Some(Value::Null) => default.to_string(),
        Some(v) => value_to_string(v),
    }
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Integer read of a JSON value; floats truncate, numeric strings parse, else 0.
pub fn read_i64(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}
