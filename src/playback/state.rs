use crate::engine::RequestId;
use serde::Serialize;

/// Lifecycle of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing loaded.
    #[default]
    Idle,
    Ready,
    /// A request is outstanding, or the last one failed and awaits the user.
    Speaking,
    Paused,
    Finished,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Ready => "ready",
            PlaybackState::Speaking => "speaking",
            PlaybackState::Paused => "paused",
            PlaybackState::Finished => "finished",
        };
        write!(f, "{label}")
    }
}

/// Position within the segment sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Cursor {
    pub segment: usize,
    /// Chars of the segment already spoken, as last reported by the engine.
    pub offset: usize,
}

impl Cursor {
    pub fn at_segment(segment: usize) -> Self {
        Self { segment, offset: 0 }
    }

    /// Record a reported offset. Never moves backwards and stays strictly
    /// inside the segment, so the unspoken remainder is never empty.
    pub(super) fn advance_offset(&mut self, offset: usize, segment_len: usize) {
        let capped = offset.min(segment_len.saturating_sub(1));
        self.offset = self.offset.max(capped);
    }
}

/// The request the engine is currently working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct InFlight {
    pub(super) request_id: RequestId,
    pub(super) segment: usize,
    /// Segment offset at which the utterance text begins; engine offsets are
    /// relative to it.
    pub(super) base_offset: usize,
}

/// What changed in response to a call or an engine event.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackUpdate {
    Progress(f64),
    SegmentStarted { segment: usize },
    SegmentCompleted { segment: usize },
    /// Recoverable: the cursor did not move and nothing is in flight.
    SegmentFailed { segment: usize, message: String },
    Finished,
}
