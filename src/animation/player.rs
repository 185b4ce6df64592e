use std::time::Duration;

use crate::{
    animation::ease::Ease,
    foundation::error::{StageError, StageResult},
};

/// How playback continues once the last frame of the range is reached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LoopMode {
    /// Sawtooth: jump back to the first frame and play forward again.
    #[default]
    Repeat,
    /// Triangle: play backwards to the first frame, then forward again.
    PingPong,
}

/// Validated timing parameters for one sequence player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackParams {
    start_index: usize,
    frame_count: usize,
    duration_secs: f64,
    ease: Ease,
    loop_mode: LoopMode,
}

impl PlaybackParams {
    pub fn new(start_index: usize, frame_count: usize, duration_secs: f64) -> StageResult<Self> {
        if frame_count == 0 {
            return Err(StageError::validation("frame_count must be >= 1"));
        }
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(StageError::validation(
                "duration_secs must be finite and > 0",
            ));
        }
        Ok(Self {
            start_index,
            frame_count,
            duration_secs,
            ease: Ease::Linear,
            loop_mode: LoopMode::Repeat,
        })
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn with_loop_mode(mut self, loop_mode: LoopMode) -> Self {
        self.loop_mode = loop_mode;
        self
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Last frame of the range (inclusive).
    pub fn end_index(&self) -> usize {
        self.start_index.saturating_add(self.frame_count - 1)
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Continuous frame position after `elapsed_secs` of playback.
    ///
    /// `start + (count - 1) * ease(wave(t / duration))`, where `wave` is a sawtooth for
    /// [`LoopMode::Repeat`] and a triangle for [`LoopMode::PingPong`].
    pub fn virtual_frame_at(&self, elapsed_secs: f64) -> f64 {
        let start = self.start_index as f64;
        let span = (self.frame_count - 1) as f64;
        if span == 0.0 {
            return start;
        }

        let cycles = if elapsed_secs.is_finite() {
            elapsed_secs.max(0.0) / self.duration_secs
        } else {
            0.0
        };
        let wave = match self.loop_mode {
            LoopMode::Repeat => cycles.fract(),
            LoopMode::PingPong => {
                let p = cycles % 2.0;
                if p <= 1.0 { p } else { 2.0 - p }
            }
        };
        start + span * self.ease.apply(wave)
    }
}

/// Snapshot of a running player's position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackState {
    pub virtual_frame: f64,
    pub current_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    /// Constructed, no clock origin yet.
    Idle,
    /// Advancing from `origin`.
    Running { origin: Duration },
    /// Cancelled. A stopped player never reports another frame.
    Stopped,
}

/// Converts clock time into a looping, de-duplicated frame index for one instance.
#[derive(Debug)]
pub struct SequencePlayer {
    params: PlaybackParams,
    pool_len: usize,
    state: PlayerState,
    playback: Option<PlaybackState>,
    last_emitted: Option<usize>,
}

impl SequencePlayer {
    /// `pool_len` is the number of sources in the shared pool; emitted indices are
    /// clamped below it.
    pub fn new(params: PlaybackParams, pool_len: usize) -> Self {
        Self {
            params,
            pool_len,
            state: PlayerState::Idle,
            playback: None,
            last_emitted: None,
        }
    }

    pub fn params(&self) -> &PlaybackParams {
        &self.params
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn playback(&self) -> Option<PlaybackState> {
        self.playback
    }

    pub fn virtual_frame(&self) -> Option<f64> {
        self.playback.map(|p| p.virtual_frame)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.playback.map(|p| p.current_index)
    }

    /// Idle -> Running. Starting a running or stopped player is a no-op.
    pub fn start(&mut self, now: Duration) {
        if self.state != PlayerState::Idle {
            return;
        }
        self.state = PlayerState::Running { origin: now };
        let virtual_frame = self.params.virtual_frame_at(0.0);
        self.playback = self
            .clamp_index(virtual_frame)
            .map(|current_index| PlaybackState {
                virtual_frame,
                current_index,
            });
    }

    pub fn stop(&mut self) {
        self.state = PlayerState::Stopped;
        self.playback = None;
        self.last_emitted = None;
    }

    /// Advance to `now`. Returns the new index only when it differs from the last one
    /// reported; the first tick after [`start`](Self::start) always reports.
    pub fn tick(&mut self, now: Duration) -> Option<usize> {
        let PlayerState::Running { origin } = self.state else {
            return None;
        };

        let elapsed = now.saturating_sub(origin).as_secs_f64();
        let virtual_frame = self.params.virtual_frame_at(elapsed);
        let current_index = self.clamp_index(virtual_frame)?;
        self.playback = Some(PlaybackState {
            virtual_frame,
            current_index,
        });

        if self.last_emitted == Some(current_index) {
            return None;
        }
        self.last_emitted = Some(current_index);
        Some(current_index)
    }

    fn clamp_index(&self, virtual_frame: f64) -> Option<usize> {
        let max = self.pool_len.checked_sub(1)?;
        let rounded = virtual_frame.round().max(0.0);
        // Saturating float-to-int cast keeps oversized ranges inside the pool.
        Some((rounded as usize).min(max))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/player.rs"]
mod tests;
