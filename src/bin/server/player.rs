//! A clock-driven stand-in for a real player, so the control page has
//! something to drive.

use std::time::{Duration, Instant};

use linplayer_remote::Player;
use linplayer_remote::constants::PlaybackState;
use linplayer_remote::error::PlayerError;

pub struct SimulatedPlayer {
    duration: Duration,
    /// Position at `anchor`.
    base: Duration,
    anchor: Instant,
    play_when_ready: bool,
    state: PlaybackState,
}

impl SimulatedPlayer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            base: Duration::ZERO,
            anchor: Instant::now(),
            play_when_ready: true,
            state: PlaybackState::Ready,
        }
    }

    fn position(&self) -> Duration {
        if !self.play_when_ready || self.state != PlaybackState::Ready {
            return self.base;
        }
        (self.base + self.anchor.elapsed()).min(self.duration)
    }

    /// Freeze the current position as the new base.
    fn rebase(&mut self) {
        self.base = self.position();
        self.anchor = Instant::now();
    }
}

impl Player for SimulatedPlayer {
    fn position_ms(&self) -> i64 {
        self.position().as_millis() as i64
    }

    fn duration_ms(&self) -> Option<i64> {
        Some(self.duration.as_millis() as i64)
    }

    fn play_when_ready(&self) -> bool {
        self.play_when_ready
    }

    fn playback_state(&self) -> PlaybackState {
        if self.state == PlaybackState::Ready && self.position() >= self.duration {
            return PlaybackState::Ended;
        }
        self.state
    }

    fn set_play_when_ready(&mut self, play: bool) -> Result<(), PlayerError> {
        self.rebase();
        self.play_when_ready = play;
        if play && self.state == PlaybackState::Idle {
            self.state = PlaybackState::Ready;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PlayerError> {
        self.base = Duration::ZERO;
        self.anchor = Instant::now();
        self.state = PlaybackState::Idle;
        Ok(())
    }

    fn seek_to(&mut self, position_ms: i64) -> Result<(), PlayerError> {
        if self.state == PlaybackState::Idle {
            return Err(PlayerError::new("player is stopped"));
        }
        self.base = Duration::from_millis(position_ms.max(0) as u64).min(self.duration);
        self.anchor = Instant::now();
        Ok(())
    }
}
