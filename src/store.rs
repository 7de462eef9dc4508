//! Configuration store: access token, preferred port and registered servers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use crate::constants::ServerType;
use crate::entry::{ServerConfig, ServerEntry};

/// Short description of one server, for `/api/info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSummary {
    pub name: String,
    pub base_url: String,
    pub kind: ServerType,
}

/// Persistence consumed by the remote endpoint.
///
/// Implementations must make `upsert` atomic with respect to concurrent callers.
pub trait ConfigStore: Send + Sync {
    fn token(&self) -> String;

    fn set_token(&self, token: &str) -> Result<()>;

    /// Preferred listening port; 0 means no preference.
    fn port(&self) -> u16;

    fn set_port(&self, port: u16) -> Result<()>;

    fn list_servers(&self) -> Vec<ServerConfig>;

    /// Id of the active server, or an empty string when there is none.
    fn active_server_id(&self) -> String;

    fn set_active(&self, id: &str) -> Result<()>;

    /// Save `entry` under a fresh id and return what was stored.
    fn upsert(&self, entry: &ServerEntry, activate: bool) -> Result<ServerConfig>;

    fn server_summary(&self, id: &str) -> Option<ServerSummary>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoreData {
    remote_token: String,
    remote_port: u16,
    servers: Vec<ServerConfig>,
    active_server_id: String,
}

impl StoreData {
    fn active_id(&self) -> String {
        if !self.active_server_id.is_empty() {
            return self.active_server_id.clone();
        }
        self.servers
            .first()
            .map(|s| s.id.clone())
            .unwrap_or_default()
    }
}

/// [`ConfigStore`] kept in memory and, when given a path, mirrored to a
/// pretty-printed JSON file after every change.
#[derive(Debug, Default)]
pub struct ServerStore {
    path: Option<PathBuf>,
    data: Mutex<StoreData>,
}

impl ServerStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the store at `path`, starting empty if the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = if path.exists() {
            let content = fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            StoreData::default()
        };
        tracing::debug!("loaded config store from {}", path.display());
        Ok(Self {
            path: Some(path.to_path_buf()),
            data: Mutex::new(data),
        })
    }

    fn lock(&self) -> MutexGuard<'_, StoreData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to a copy, persist it, and only then publish it.
    fn update<T>(&self, f: impl FnOnce(&mut StoreData) -> T) -> Result<T> {
        let mut data = self.lock();
        let mut next = data.clone();
        let out = f(&mut next);
        self.save(&next)?;
        *data = next;
        Ok(out)
    }

    fn save(&self, data: &StoreData) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(data)?;
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json)
        };
        write().map_err(|e| Error::Store(format!("cannot write {}: {}", path.display(), e)))
    }
}

impl ConfigStore for ServerStore {
    fn token(&self) -> String {
        self.lock().remote_token.clone()
    }

    fn set_token(&self, token: &str) -> Result<()> {
        self.update(|d| d.remote_token = token.to_string())
    }

    fn port(&self) -> u16 {
        self.lock().remote_port
    }

    fn set_port(&self, port: u16) -> Result<()> {
        self.update(|d| d.remote_port = port)
    }

    fn list_servers(&self) -> Vec<ServerConfig> {
        self.lock().servers.clone()
    }

    fn active_server_id(&self) -> String {
        self.lock().active_id()
    }

    fn set_active(&self, id: &str) -> Result<()> {
        self.update(|d| d.active_server_id = id.to_string())
    }

    fn upsert(&self, entry: &ServerEntry, activate: bool) -> Result<ServerConfig> {
        let config = ServerConfig::from_entry(uuid::Uuid::new_v4().to_string(), entry);
        let saved = config.clone();
        self.update(move |d| {
            if activate || d.active_server_id.is_empty() {
                d.active_server_id = config.id.clone();
            }
            d.servers.push(config);
        })?;
        tracing::info!("saved {} server {} ({})", saved.kind, saved.id, saved.base_url);
        Ok(saved)
    }

    fn server_summary(&self, id: &str) -> Option<ServerSummary> {
        let data = self.lock();
        data.servers.iter().find(|s| s.id == id).map(|s| ServerSummary {
            name: s.effective_name().to_string(),
            base_url: s.base_url.clone(),
            kind: s.kind,
        })
    }
}
