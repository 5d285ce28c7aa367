// ============================================================================
// PREVIEW PLAYBACK: poll-driven frame cycling for the animation preview
// ============================================================================

use std::time::{Duration, Instant};

use crate::canvas::PixelBuffer;

/// Preview frame rates offered by the rate selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum FrameRate {
    #[default]
    Fps1,
    Fps15,
    Fps30,
    Fps45,
    Fps60,
}

impl FrameRate {
    pub fn all() -> &'static [FrameRate] {
        &[
            FrameRate::Fps1,
            FrameRate::Fps15,
            FrameRate::Fps30,
            FrameRate::Fps45,
            FrameRate::Fps60,
        ]
    }

    pub fn fps(&self) -> u32 {
        match self {
            FrameRate::Fps1 => 1,
            FrameRate::Fps15 => 15,
            FrameRate::Fps30 => 30,
            FrameRate::Fps45 => 45,
            FrameRate::Fps60 => 60,
        }
    }

    pub fn from_fps(fps: u32) -> Option<FrameRate> {
        Self::all().iter().copied().find(|r| r.fps() == fps)
    }

    /// Time between two ticks, `1000 / fps` whole milliseconds.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(1000 / self.fps() as u64)
    }
}

/// Drives the preview pane.
///
/// The host calls [`poll`](Self::poll) from its event loop; when a tick is
/// due the index of the frame to show is returned and the next deadline is
/// scheduled one interval after `now`.
#[derive(Clone, Debug, Default)]
pub struct PlaybackScheduler {
    is_playing: bool,
    frame_rate: FrameRate,
    preview_index: usize,
    next_tick: Option<Instant>,
}

impl PlaybackScheduler {
    pub fn new(frame_rate: FrameRate) -> Self {
        Self {
            frame_rate,
            ..Default::default()
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    /// Index of the next frame the preview will show.
    pub fn preview_index(&self) -> usize {
        self.preview_index
    }

    /// Start playback at `start_index`.  The first tick is due immediately.
    ///
    /// Calling this while already playing restarts from `start_index`.
    pub fn play(&mut self, now: Instant, start_index: usize) {
        self.preview_index = start_index;
        self.is_playing = true;
        self.next_tick = Some(now);
    }

    /// Stop ticking.  `preview_index` is kept until the next `play`.
    pub fn pause(&mut self) {
        self.is_playing = false;
        self.next_tick = None;
    }

    /// Rewind to the first frame and play.
    pub fn restart(&mut self, now: Instant) {
        self.play(now, 0);
    }

    /// Takes effect from the next scheduled tick.
    pub fn set_frame_rate(&mut self, frame_rate: FrameRate) {
        self.frame_rate = frame_rate;
    }

    /// Returns the frame to render when a tick is due, advancing
    /// `preview_index` and scheduling the next tick.
    ///
    /// An index left past the end by a shrink wraps to 0 before use.
    pub fn poll(&mut self, now: Instant, frames: &[PixelBuffer]) -> Option<usize> {
        if !self.is_playing || frames.is_empty() {
            return None;
        }
        match self.next_tick {
            Some(due) if now < due => return None,
            _ => {}
        }
        if self.preview_index >= frames.len() {
            self.preview_index = 0;
        }
        let shown = self.preview_index;
        self.preview_index = (shown + 1) % frames.len();
        self.next_tick = Some(now + self.frame_rate.interval());
        Some(shown)
    }
}
