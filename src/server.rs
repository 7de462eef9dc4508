//! Listener lifecycle: bind, accept loop, stop.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::Result;
use crate::connection::handle_connection;
use crate::constants::{ACCEPT_BACKOFF, STOP_JOIN_TIMEOUT};
use crate::router::Router;
use crate::state::AppState;

struct Running {
    port: u16,
    token: String,
    shutdown: oneshot::Sender<()>,
    accept: JoinHandle<()>,
}

/// The remote-control HTTP server.
///
/// Stopped until [`RemoteServer::start`]; [`port`](RemoteServer::port) and
/// [`token`](RemoteServer::token) report `0` and `""` while stopped.
pub struct RemoteServer {
    state: AppState,
    running: Mutex<Option<Running>>,
    pub(crate) startup: tokio::sync::Mutex<()>,
}

impl RemoteServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            running: Mutex::new(None),
            startup: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    fn lock(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    pub fn port(&self) -> u16 {
        self.lock().as_ref().map(|r| r.port).unwrap_or(0)
    }

    pub fn token(&self) -> String {
        self.lock()
            .as_ref()
            .map(|r| r.token.clone())
            .unwrap_or_default()
    }

    /// Bind and start accepting. Returns the bound port.
    ///
    /// `preferred_port` is used when free; otherwise (or when 0) the OS picks
    /// an ephemeral port. Does nothing if already running. Must be called
    /// from within a tokio runtime.
    pub async fn start(&self, token: &str, preferred_port: u16) -> Result<u16> {
        let mut running = self.lock();
        if let Some(r) = running.as_ref() {
            return Ok(r.port);
        }

        let listener = bind(preferred_port)?;
        let port = listener.local_addr()?.port();
        let token = token.trim().to_string();
        let router = Arc::new(Router::new(token.clone(), self.state.clone()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let accept = tokio::spawn(accept_loop(listener, router, shutdown_rx));

        tracing::info!("remote control listening on 0.0.0.0:{}", port);
        *running = Some(Running {
            port,
            token,
            shutdown: shutdown_tx,
            accept,
        });
        Ok(port)
    }

    /// Close the listening socket and wait briefly for the accept loop.
    /// Connections already being served run to completion.
    pub async fn stop(&self) {
        let Some(running) = self.lock().take() else {
            return;
        };
        let _ = running.shutdown.send(());
        if tokio::time::timeout(STOP_JOIN_TIMEOUT, running.accept)
            .await
            .is_err()
        {
            tracing::warn!(
                "accept loop did not finish within {:?}",
                STOP_JOIN_TIMEOUT
            );
        }
        tracing::info!("remote control on port {} stopped", running.port);
    }
}

/// Bind `0.0.0.0:preferred_port`, falling back to an ephemeral port.
fn bind(preferred_port: u16) -> io::Result<TcpListener> {
    match bind_reusable(preferred_port) {
        Ok(listener) => Ok(listener),
        Err(e) if preferred_port != 0 => {
            tracing::warn!(
                "port {} unavailable ({}), using an ephemeral port",
                preferred_port,
                e
            );
            bind_reusable(0)
        }
        Err(e) => Err(e),
    }
}

fn bind_reusable(port: u16) -> io::Result<TcpListener> {
    let socket = TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    socket.bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))?;
    socket.listen(1024)
}

async fn accept_loop(
    listener: TcpListener,
    router: Arc<Router>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            // Also fires when the server is dropped without `stop`.
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let router = router.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, router).await {
                            tracing::debug!("connection from {} dropped: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    // e.g. EMFILE; retrying at once would spin.
                    tracing::warn!("accept failed: {}", e);
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                    }
                }
            }
        }
    }
    tracing::debug!("accept loop finished");
}
