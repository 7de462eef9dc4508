//! # linplayer-remote
//!
//! LAN provisioning and remote control for a TV media player.
//!
//! A phone scans a QR code encoding `http://<lan-ip>:<port>/?token=<token>`,
//! opens the embedded control page, and uses it to register media servers
//! (Emby, Jellyfin, Plex, WebDAV), adjust proxy settings and drive the
//! playback session on the TV. This crate provides the HTTP endpoint, the
//! bulk server-import parser and the bridge to the single-threaded player.

pub mod constants;
pub mod error;
pub mod protocol;

pub mod bridge;
pub mod bulk;
pub mod connection;
pub mod entry;
pub mod handlers;
pub mod proxy;
pub mod remote;
pub mod router;
pub mod server;
pub mod state;
pub mod store;

pub use bridge::{PlaybackBridge, PlaybackReply, PlaybackScheduler, Player, playback_channel};
pub use error::{Error, Result};
pub use remote::RemoteInfo;
pub use server::RemoteServer;
pub use state::{AppInfo, AppState};
