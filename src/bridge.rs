//! Playback bridge between request handlers and the player-owning scheduler.
//!
//! The player may only be touched from one thread. Handlers never see it:
//! they post closures over a channel to the [`PlaybackScheduler`], which owns
//! the [`PlayerSlot`] and runs tasks in posting order, and then wait for the
//! reply on a oneshot channel for a bounded time. Attach and detach travel
//! the same channel, so FIFO order is the only synchronization the slot needs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::oneshot;

use crate::constants::{CONTROL_TIMEOUT, PlaybackState, STATUS_TIMEOUT};
use crate::error::PlayerError;

/// The player surface the bridge needs. Implemented by the UI layer.
pub trait Player: Send {
    fn position_ms(&self) -> i64;

    /// `None` while the duration is unknown.
    fn duration_ms(&self) -> Option<i64>;

    /// Whether playback should proceed as soon as the player is ready.
    fn play_when_ready(&self) -> bool;

    fn playback_state(&self) -> PlaybackState;

    fn set_play_when_ready(&mut self, play: bool) -> Result<(), PlayerError>;

    fn stop(&mut self) -> Result<(), PlayerError>;

    fn seek_to(&mut self, position_ms: i64) -> Result<(), PlayerError>;
}

/// Snapshot of an attached player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackStatus {
    pub title: String,
    pub playing: bool,
    pub position_ms: i64,
    pub duration_ms: i64,
}

/// Result of a bridge call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackReply {
    /// No player is attached.
    Inactive,
    Active(PlaybackStatus),
    Error(String),
}

impl PlaybackReply {
    pub fn error(message: impl Into<String>) -> Self {
        PlaybackReply::Error(message.into())
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, PlaybackReply::Error(_))
    }

    pub fn to_json(&self) -> Value {
        match self {
            PlaybackReply::Inactive => json!({ "ok": true, "active": false }),
            PlaybackReply::Active(status) => json!({
                "ok": true,
                "active": true,
                "title": status.title,
                "playing": status.playing,
                "positionMs": status.position_ms,
                "durationMs": status.duration_ms,
            }),
            PlaybackReply::Error(message) => json!({ "ok": false, "error": message }),
        }
    }
}

/// Remote control actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Toggle,
    Play,
    Pause,
    Stop,
    SeekByMs,
    SeekToMs,
}

impl ControlAction {
    /// Case-insensitive; accepts the `seek_by_ms`/`seekby`/`seek_to_ms` aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "toggle" => Some(ControlAction::Toggle),
            "play" => Some(ControlAction::Play),
            "pause" => Some(ControlAction::Pause),
            "stop" => Some(ControlAction::Stop),
            "seekbyms" | "seek_by_ms" | "seekby" => Some(ControlAction::SeekByMs),
            "seektoms" | "seek_to_ms" => Some(ControlAction::SeekToMs),
            _ => None,
        }
    }
}

/// Identifies one `attach` call, so a late `detach` cannot clear its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerHandle(u64);

struct Attached {
    handle: PlayerHandle,
    player: Box<dyn Player>,
    title: String,
}

/// The currently attached player. Only ever touched on the scheduler.
#[derive(Default)]
pub struct PlayerSlot {
    attached: Option<Attached>,
}

impl PlayerSlot {
    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    fn attach(&mut self, handle: PlayerHandle, player: Box<dyn Player>, title: String) {
        self.attached = Some(Attached {
            handle,
            player,
            title,
        });
    }

    fn detach(&mut self, handle: PlayerHandle) {
        if self.attached.as_ref().is_some_and(|a| a.handle == handle) {
            self.attached = None;
        } else {
            tracing::debug!("ignoring stale detach of {:?}", handle);
        }
    }

    /// Read the attached player without mutating it.
    pub fn status(&self) -> PlaybackReply {
        let Some(attached) = &self.attached else {
            return PlaybackReply::Inactive;
        };
        let player = attached.player.as_ref();
        PlaybackReply::Active(PlaybackStatus {
            title: attached.title.clone(),
            playing: player.play_when_ready() && player.playback_state() == PlaybackState::Ready,
            position_ms: player.position_ms(),
            duration_ms: player.duration_ms().unwrap_or(0).max(0),
        })
    }

    /// Apply `action`, then report the status measured right after it.
    pub fn control(&mut self, action: &str, value: i64) -> PlaybackReply {
        let result = match self.attached.as_mut() {
            None => return PlaybackReply::Inactive,
            Some(attached) => {
                let Some(action) = ControlAction::parse(action) else {
                    return PlaybackReply::error("unknown action");
                };
                apply(attached.player.as_mut(), action, value)
            }
        };
        match result {
            Ok(()) => self.status(),
            Err(e) => PlaybackReply::Error(e.to_string()),
        }
    }
}

fn apply(player: &mut dyn Player, action: ControlAction, value: i64) -> Result<(), PlayerError> {
    match action {
        ControlAction::Toggle => {
            let play = !player.play_when_ready();
            player.set_play_when_ready(play)
        }
        ControlAction::Play => player.set_play_when_ready(true),
        ControlAction::Pause => player.set_play_when_ready(false),
        ControlAction::Stop => {
            player.stop()?;
            player.set_play_when_ready(false)
        }
        ControlAction::SeekByMs => {
            let target = player.position_ms().saturating_add(value);
            player.seek_to(clamp_seek(target, player.duration_ms()))
        }
        ControlAction::SeekToMs => player.seek_to(clamp_seek(value, player.duration_ms())),
    }
}

/// Clamp to `[0, duration]`, or only at 0 when the duration is unknown or zero.
pub fn clamp_seek(target_ms: i64, duration_ms: Option<i64>) -> i64 {
    let target = target_ms.max(0);
    match duration_ms {
        Some(duration) if duration > 0 => target.min(duration),
        _ => target,
    }
}

type Task = Box<dyn FnOnce(&mut PlayerSlot) + Send>;

/// Create a connected bridge/scheduler pair.
pub fn playback_channel() -> (PlaybackBridge, PlaybackScheduler) {
    let (tx, rx) = mpsc::channel();
    let bridge = PlaybackBridge {
        tx,
        next_handle: Arc::new(AtomicU64::new(1)),
    };
    let scheduler = PlaybackScheduler {
        rx,
        slot: PlayerSlot::default(),
    };
    (bridge, scheduler)
}

/// Cloneable handle used by request handlers and the UI layer.
#[derive(Clone)]
pub struct PlaybackBridge {
    tx: mpsc::Sender<Task>,
    next_handle: Arc<AtomicU64>,
}

impl PlaybackBridge {
    /// Replace the bridged player and title.
    pub fn attach(&self, player: Box<dyn Player>, title: impl Into<String>) -> PlayerHandle {
        let handle = PlayerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let title = title.into();
        self.post("attach", Box::new(move |slot: &mut PlayerSlot| {
            slot.attach(handle, player, title)
        }));
        handle
    }

    /// Clear the bridge if `handle` is still the attached player.
    pub fn detach(&self, handle: PlayerHandle) {
        self.post("detach", Box::new(move |slot: &mut PlayerSlot| slot.detach(handle)));
    }

    fn post(&self, what: &str, task: Task) {
        if self.tx.send(task).is_err() {
            tracing::debug!("{} dropped: playback scheduler is gone", what);
        }
    }

    pub async fn status(&self) -> PlaybackReply {
        self.call(STATUS_TIMEOUT, |slot| slot.status()).await
    }

    pub async fn control(&self, action: &str, value: i64) -> PlaybackReply {
        let action = action.to_string();
        self.call(CONTROL_TIMEOUT, move |slot| slot.control(&action, value))
            .await
    }

    async fn call<F>(&self, wait: Duration, f: F) -> PlaybackReply
    where
        F: FnOnce(&mut PlayerSlot) -> PlaybackReply + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let task: Task = Box::new(move |slot: &mut PlayerSlot| {
            let _ = reply_tx.send(f(slot));
        });
        if self.tx.send(task).is_err() {
            return PlaybackReply::error("scheduler stopped");
        }

        match tokio::time::timeout(wait, reply_rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => PlaybackReply::error("scheduler stopped"),
            Err(_) => {
                tracing::debug!("playback bridge call timed out after {:?}", wait);
                PlaybackReply::error("timeout")
            }
        }
    }
}

/// Owner of the player slot. Runs posted tasks on exactly one thread.
pub struct PlaybackScheduler {
    rx: mpsc::Receiver<Task>,
    slot: PlayerSlot,
}

impl PlaybackScheduler {
    /// Run every task queued so far without blocking. For hosts that drive
    /// their own UI loop. Returns the number of tasks run.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task(&mut self.slot);
            ran += 1;
        }
        ran
    }

    /// Run tasks until every bridge handle has been dropped.
    pub fn run(mut self) {
        while let Ok(task) = self.rx.recv() {
            task(&mut self.slot);
        }
        tracing::debug!("playback scheduler finished");
    }

    /// Run the scheduler on a dedicated thread.
    pub fn spawn(self) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("playback-scheduler".to_string())
            .spawn(move || self.run())
    }

    pub fn slot(&self) -> &PlayerSlot {
        &self.slot
    }
}
