//! Animation frames
//!
//! `requestAnimationFrame` queue driven by `Document::run_animation_frame`.

use std::collections::BTreeMap;

/// Simulated frame interval; frame `n` carries timestamp `n * FRAME_INTERVAL_MS`
pub const FRAME_INTERVAL_MS: f64 = 16.0;

/// Handle returned by `request_animation_frame`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameToken(u64);

/// Fire-once frame callback; receives the frame timestamp
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Pending frame callbacks in request order
#[derive(Default)]
pub struct AnimationFrames {
    pending: BTreeMap<FrameToken, FrameCallback>,
    next_token: u64,
    frame_count: u64,
}

impl AnimationFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a callback for the next frame
    pub fn request(&mut self, callback: FrameCallback) -> FrameToken {
        self.next_token += 1;
        let token = FrameToken(self.next_token);
        self.pending.insert(token, callback);
        token
    }

    /// Drop a queued callback
    pub fn cancel(&mut self, token: FrameToken) -> bool {
        self.pending.remove(&token).is_some()
    }

    /// Start a frame: advance the clock and take every callback queued so far
    pub fn begin_frame(&mut self) -> (f64, Vec<FrameCallback>) {
        self.frame_count += 1;
        let due = std::mem::take(&mut self.pending);
        (self.now(), due.into_values().collect())
    }

    /// Timestamp of the most recent frame
    pub fn now(&self) -> f64 {
        self.frame_count as f64 * FRAME_INTERVAL_MS
    }

    /// Number of callbacks waiting for the next frame
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Frames run so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
