//! Bootstrap of the remote-control server and the URL shown as a QR code.

use std::net::Ipv4Addr;

use getifaddrs::{Address, InterfaceFlags};
use rand::Rng;

use crate::Result;
use crate::constants::{TOKEN_ALPHABET, TOKEN_LENGTH};
use crate::server::RemoteServer;

/// Where a phone can reach the running server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    pub port: u16,
    pub token: String,
    pub ipv4: Vec<Ipv4Addr>,
}

impl RemoteInfo {
    /// `http://<ip>:<port>/?token=<token>` for the first LAN address, or an
    /// empty string when the server is unreachable.
    pub fn first_remote_url(&self) -> String {
        let token = self.token.trim();
        if self.port == 0 || token.is_empty() {
            return String::new();
        }
        match self.ipv4.first() {
            Some(ip) => format!("http://{}:{}/?token={}", ip, self.port, token),
            None => String::new(),
        }
    }
}

impl RemoteServer {
    /// Start the server if it is not running yet and describe how to reach it.
    ///
    /// A missing token is generated and persisted first. The bound port is
    /// stored as the preferred port for the next start.
    pub async fn ensure_started(&self) -> Result<RemoteInfo> {
        let _startup = self.startup.lock().await;
        let store = self.state().store.clone();

        if !self.is_running() {
            let mut token = store.token().trim().to_string();
            if token.is_empty() {
                token = generate_token(TOKEN_LENGTH);
                store.set_token(&token)?;
                tracing::info!("generated a new remote access token");
            }
            let port = self.start(&token, store.port()).await?;
            store.set_port(port)?;
        }

        Ok(RemoteInfo {
            port: self.port(),
            token: self.token(),
            ipv4: lan_ipv4(),
        })
    }
}

/// Random token over `[a-z0-9]`.
pub fn generate_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// IPv4 addresses of every interface that is up and not a loopback.
pub fn lan_ipv4() -> Vec<Ipv4Addr> {
    let Ok(ifaces) = getifaddrs::getifaddrs() else {
        return vec![];
    };
    ifaces
        .filter(|i| i.flags.contains(InterfaceFlags::UP))
        .filter(|i| !i.flags.contains(InterfaceFlags::LOOPBACK))
        .filter_map(|i| match &i.address {
            Address::V4(net) => Some(net.address),
            _ => None,
        })
        .filter(|ip| !ip.is_loopback() && !ip.is_unspecified())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token() {
        let token = generate_token(TOKEN_LENGTH);
        assert_eq!(token.len(), 10);
        assert!(token.bytes().all(|b| TOKEN_ALPHABET.contains(&b)));
        assert_ne!(generate_token(32), generate_token(32));
    }

    #[test]
    fn test_first_remote_url() {
        let mut info = RemoteInfo {
            port: 38080,
            token: " abc ".to_string(),
            ipv4: vec![Ipv4Addr::new(192, 168, 1, 20), Ipv4Addr::new(10, 0, 0, 2)],
        };
        assert_eq!(info.first_remote_url(), "http://192.168.1.20:38080/?token=abc");

        info.ipv4.clear();
        assert_eq!(info.first_remote_url(), "");

        info.ipv4.push(Ipv4Addr::new(10, 0, 0, 2));
        info.port = 0;
        assert_eq!(info.first_remote_url(), "");

        info.port = 1;
        info.token = "  ".to_string();
        assert_eq!(info.first_remote_url(), "");
    }

    #[test]
    fn test_lan_ipv4_excludes_loopback() {
        assert!(lan_ipv4().iter().all(|ip| !ip.is_loopback()));
    }
}
