//! Proxy settings collaborator.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Proxy control consumed by `/api/setProxySettings` and `/api/info`.
pub trait ProxyControl: Send + Sync {
    /// Regenerate the proxy configuration from the current settings.
    fn apply_config(&self);

    fn start(&self);

    fn stop(&self);

    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);

    fn subscription_url(&self) -> String;

    fn set_subscription_url(&self, url: &str);

    /// Human-readable state of the proxy, e.g. `running`.
    fn last_status(&self) -> String;
}

#[derive(Debug, Clone)]
struct ProxyState {
    enabled: bool,
    subscription_url: String,
    last_status: String,
}

impl Default for ProxyState {
    fn default() -> Self {
        Self {
            enabled: false,
            subscription_url: String::new(),
            last_status: "stopped".to_string(),
        }
    }
}

/// [`ProxyControl`] that only records preferences and a status label.
/// Hosts with a real proxy engine supply their own implementation.
#[derive(Debug, Default)]
pub struct ProxyPrefs {
    state: Mutex<ProxyState>,
}

impl ProxyPrefs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ProxyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: &str) {
        self.lock().last_status = status.to_string();
        tracing::debug!("proxy status: {}", status);
    }
}

impl ProxyControl for ProxyPrefs {
    fn apply_config(&self) {
        self.set_status("configured");
    }

    fn start(&self) {
        self.set_status("running");
    }

    fn stop(&self) {
        self.set_status("stopped");
    }

    fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    fn set_enabled(&self, enabled: bool) {
        self.lock().enabled = enabled;
    }

    fn subscription_url(&self) -> String {
        self.lock().subscription_url.clone()
    }

    fn set_subscription_url(&self, url: &str) {
        self.lock().subscription_url = url.trim().to_string();
    }

    fn last_status(&self) -> String {
        self.lock().last_status.clone()
    }
}
