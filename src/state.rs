//! Collaborators shared by every request handler.

use std::sync::Arc;

use crate::bridge::PlaybackBridge;
use crate::proxy::ProxyControl;
use crate::store::ConfigStore;

/// Name and version reported by `/api/info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "LinPlayer".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Injected services. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ConfigStore>,
    pub proxy: Arc<dyn ProxyControl>,
    pub bridge: PlaybackBridge,
    pub app: AppInfo,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        proxy: Arc<dyn ProxyControl>,
        bridge: PlaybackBridge,
    ) -> Self {
        Self {
            store,
            proxy,
            bridge,
            app: AppInfo::default(),
        }
    }

    pub fn with_app_info(mut self, app: AppInfo) -> Self {
        self.app = app;
        self
    }
}
