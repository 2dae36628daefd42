//! Chunked, resumable narration.
//!
//! [`PlaybackController`] owns the document text, cuts it into segments and
//! walks through them one speech request at a time. Engine notifications come
//! back as [`EngineEvent`]s through [`PlaybackController::handle_event`];
//! every public call is synchronous and never waits on the engine.
//!
//! Each request gets a fresh id. Events carrying any other id are stale (the
//! request was cancelled by `stop`, `seek`, `load` or a new `play`) and are
//! dropped, so a late completion can never advance the wrong segment.

mod state;

pub use state::{Cursor, PlaybackState, PlaybackUpdate};

use crate::engine::{EngineEvent, EngineEventKind, RequestId, SpeechEngine, Utterance, VoiceSettings};
use crate::error::PlaybackError;
use crate::segmenter::{self, Segment};
use state::InFlight;
use tracing::{debug, info, warn};

/// Upper bound for progress while not finished.
const MAX_UNFINISHED_PROGRESS: f64 = 99.999;

pub struct PlaybackController<E: SpeechEngine> {
    engine: E,
    chunk_size: usize,
    voice: VoiceSettings,
    text: String,
    total_chars: usize,
    segments: Vec<Segment>,
    state: PlaybackState,
    cursor: Cursor,
    in_flight: Option<InFlight>,
    request_id: RequestId,
    progress: f64,
}

impl<E: SpeechEngine> PlaybackController<E> {
    /// Create an idle controller around an injected engine handle. The chunk
    /// size is checked when text is loaded.
    pub fn new(engine: E, chunk_size: usize, voice: VoiceSettings) -> Self {
        Self {
            engine,
            chunk_size,
            voice,
            text: String::new(),
            total_chars: 0,
            segments: Vec::new(),
            state: PlaybackState::Idle,
            cursor: Cursor::default(),
            in_flight: None,
            request_id: 0,
            progress: 0.0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Percentage in `0.0..=100.0`; exactly 100 only when finished.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn voice(&self) -> &VoiceSettings {
        &self.voice
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Id of the outstanding request, if any.
    pub fn in_flight_request(&self) -> Option<RequestId> {
        self.in_flight.map(|in_flight| in_flight.request_id)
    }

    /// Character position in the document the cursor points at.
    pub fn position(&self) -> usize {
        match self.state {
            PlaybackState::Idle => 0,
            PlaybackState::Finished => self.total_chars,
            _ => self
                .segments
                .get(self.cursor.segment)
                .map(|segment| segment.start + self.cursor.offset)
                .unwrap_or(0),
        }
    }

    /// Change the chunk size used by the next `load`.
    pub fn set_chunk_size(&mut self, chunk_size: usize) -> Result<(), PlaybackError> {
        if chunk_size == 0 {
            return Err(PlaybackError::Configuration(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        self.chunk_size = chunk_size;
        Ok(())
    }

    /// Change the voice used by subsequent requests.
    pub fn set_voice(&mut self, voice: VoiceSettings) -> Result<(), PlaybackError> {
        voice.validate()?;
        info!(
            voice = voice.voice.as_deref().unwrap_or("default"),
            rate = voice.rate,
            pitch = voice.pitch,
            volume = voice.volume,
            "Updated voice settings"
        );
        self.voice = voice;
        Ok(())
    }

    /// Replace the document. Always rewinds to the first segment.
    pub fn load(&mut self, text: impl Into<String>) -> Result<(), PlaybackError> {
        let text = text.into();
        let segments = segmenter::segment(&text, self.chunk_size)?;

        self.cancel_in_flight();
        self.total_chars = text.chars().count();
        self.text = text;
        self.segments = segments;
        self.cursor = Cursor::default();

        if self.segments.is_empty() {
            self.state = PlaybackState::Finished;
            self.progress = 100.0;
            info!("Loaded empty document; nothing to narrate");
        } else {
            self.state = PlaybackState::Ready;
            self.progress = 0.0;
            info!(
                chars = self.total_chars,
                segments = self.segments.len(),
                chunk_size = self.chunk_size,
                "Loaded document for narration"
            );
        }
        Ok(())
    }

    /// Start speaking at the cursor, cancelling whatever was outstanding.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        match self.state {
            PlaybackState::Idle => {
                debug!("Play ignored; nothing loaded");
                return Ok(());
            }
            PlaybackState::Finished => {
                if self.segments.is_empty() {
                    debug!("Play ignored; document is empty");
                    return Ok(());
                }
                info!("Restarting narration from the beginning");
                self.cursor = Cursor::default();
                self.progress = 0.0;
            }
            _ => {}
        }

        self.cancel_in_flight();
        self.state = PlaybackState::Speaking;
        info!(
            segment = self.cursor.segment,
            offset = self.cursor.offset,
            "Starting narration from cursor"
        );
        self.issue_current()
    }

    /// Suspend mid-segment.
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Speaking {
            debug!(state = %self.state, "Pause ignored");
            return;
        }
        self.state = PlaybackState::Paused;
        if self.in_flight.is_none() {
            return;
        }
        if self.engine.supports_suspend() {
            info!(segment = self.cursor.segment, "Pausing narration");
            self.engine.pause();
        } else {
            info!(
                segment = self.cursor.segment,
                offset = self.cursor.offset,
                "Engine cannot suspend; cancelling and keeping offset"
            );
            self.cancel_in_flight();
        }
    }

    /// Continue after `pause`, from the exact place it stopped.
    pub fn resume(&mut self) -> Result<(), PlaybackError> {
        if self.state != PlaybackState::Paused {
            debug!(state = %self.state, "Resume ignored");
            return Ok(());
        }
        self.state = PlaybackState::Speaking;
        if self.in_flight.is_some() {
            info!(segment = self.cursor.segment, "Resuming narration");
            self.engine.resume();
            Ok(())
        } else {
            self.issue_current()
        }
    }

    /// Cancel the outstanding request and go back to `Ready`. The cursor is
    /// kept, except after the end where it rewinds to the start.
    pub fn stop(&mut self) {
        match self.state {
            PlaybackState::Idle => {
                debug!("Stop ignored; nothing loaded");
                return;
            }
            PlaybackState::Finished if self.segments.is_empty() => return,
            PlaybackState::Finished => {
                self.cursor = Cursor::default();
                self.progress = 0.0;
            }
            _ => {}
        }
        self.cancel_in_flight();
        self.state = PlaybackState::Ready;
        info!(
            segment = self.cursor.segment,
            offset = self.cursor.offset,
            "Stopped narration"
        );
    }

    /// Jump to the segment holding character `position`. Keeps speaking if
    /// it was speaking; otherwise lands in `Ready`.
    pub fn seek(&mut self, position: usize) -> Result<(), PlaybackError> {
        if self.state == PlaybackState::Idle || self.segments.is_empty() {
            debug!(position, "Seek ignored; nothing to seek in");
            return Ok(());
        }
        let Some(segment) = segmenter::segment_for_position(&self.segments, position) else {
            return Ok(());
        };

        let was_speaking = self.state == PlaybackState::Speaking;
        self.cancel_in_flight();
        self.cursor = Cursor::at_segment(segment);
        self.state = if was_speaking {
            PlaybackState::Speaking
        } else {
            PlaybackState::Ready
        };
        self.progress = self.computed_progress();
        info!(position, segment, was_speaking, "Seeking");

        if was_speaking {
            self.issue_current()
        } else {
            Ok(())
        }
    }

    /// Apply one engine notification.
    pub fn handle_event(&mut self, event: EngineEvent) -> Vec<PlaybackUpdate> {
        let Some(in_flight) = self.in_flight else {
            debug!(request_id = event.request_id, "No request in flight; dropping event");
            return Vec::new();
        };
        if event.request_id != in_flight.request_id {
            debug!(
                request_id = event.request_id,
                current = in_flight.request_id,
                "Ignoring stale engine event"
            );
            return Vec::new();
        }

        let mut updates = Vec::new();
        match event.kind {
            EngineEventKind::Progress { char_offset } => {
                let segment_len = self.segments[in_flight.segment].char_len;
                let reached = in_flight.base_offset.saturating_add(char_offset);
                self.cursor.advance_offset(reached, segment_len);
                if self.raise_progress() {
                    updates.push(PlaybackUpdate::Progress(self.progress));
                }
            }
            EngineEventKind::Finished => {
                self.in_flight = None;
                self.complete_segment(&mut updates);
            }
            EngineEventKind::Failed { message } => {
                self.in_flight = None;
                warn!(
                    segment = in_flight.segment,
                    request_id = in_flight.request_id,
                    "Engine failed on segment: {message}"
                );
                updates.push(PlaybackUpdate::SegmentFailed {
                    segment: in_flight.segment,
                    message,
                });
            }
        }
        updates
    }

    fn complete_segment(&mut self, updates: &mut Vec<PlaybackUpdate>) {
        let finished = self.cursor.segment;
        updates.push(PlaybackUpdate::SegmentCompleted { segment: finished });
        debug!(segment = finished, "Segment completed");

        let next = finished + 1;
        if next >= self.segments.len() {
            self.state = PlaybackState::Finished;
            self.progress = 100.0;
            updates.push(PlaybackUpdate::Progress(self.progress));
            updates.push(PlaybackUpdate::Finished);
            info!(segments = self.segments.len(), "Narration finished");
            return;
        }

        self.cursor = Cursor::at_segment(next);
        if self.raise_progress() {
            updates.push(PlaybackUpdate::Progress(self.progress));
        }

        // A completion that raced a pause leaves the next segment for resume.
        if self.state == PlaybackState::Speaking {
            match self.try_issue_current() {
                Ok(()) => updates.push(PlaybackUpdate::SegmentStarted { segment: next }),
                Err(message) => updates.push(PlaybackUpdate::SegmentFailed {
                    segment: next,
                    message,
                }),
            }
        }
    }

    fn issue_current(&mut self) -> Result<(), PlaybackError> {
        self.try_issue_current().map_err(|message| PlaybackError::Engine {
            segment: self.cursor.segment,
            message,
        })
    }

    /// Send the unspoken part of the cursor segment to the engine. On
    /// rejection nothing is in flight and the engine's message is returned.
    fn try_issue_current(&mut self) -> Result<(), String> {
        let segment_idx = self.cursor.segment;
        let segment = &self.segments[segment_idx];
        let base_offset = self.cursor.offset.min(segment.char_len.saturating_sub(1));
        let text: String = segment.text.chars().skip(base_offset).collect();

        self.request_id = self.request_id.wrapping_add(1);
        let request_id = self.request_id;
        let utterance = Utterance {
            request_id,
            segment: segment_idx,
            text,
            voice: self.voice.clone(),
        };
        debug!(
            request_id,
            segment = segment_idx,
            base_offset,
            "Issuing speech request"
        );

        match self.engine.speak(utterance) {
            Ok(()) => {
                self.in_flight = Some(InFlight {
                    request_id,
                    segment: segment_idx,
                    base_offset,
                });
                Ok(())
            }
            Err(err) => {
                warn!(segment = segment_idx, "Engine rejected speech request: {err:#}");
                Err(format!("{err:#}"))
            }
        }
    }

    fn cancel_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            debug!(request_id = in_flight.request_id, "Cancelling in-flight request");
            self.engine.cancel();
        }
    }

    fn computed_progress(&self) -> f64 {
        if self.state == PlaybackState::Finished {
            return 100.0;
        }
        let total = self.segments.len();
        let Some(segment) = self.segments.get(self.cursor.segment) else {
            return 0.0;
        };
        let fraction = if segment.char_len == 0 {
            0.0
        } else {
            self.cursor.offset.min(segment.char_len - 1) as f64 / segment.char_len as f64
        };
        ((self.cursor.segment as f64 + fraction) / total as f64 * 100.0)
            .min(MAX_UNFINISHED_PROGRESS)
    }

    /// Move the high-water mark up to the computed value; true if it moved.
    fn raise_progress(&mut self) -> bool {
        let computed = self.computed_progress();
        if computed > self.progress {
            self.progress = computed;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scripted::{EngineCall, ScriptedEngine};

    fn controller(chunk_size: usize) -> PlaybackController<ScriptedEngine> {
        PlaybackController::new(ScriptedEngine::new(), chunk_size, VoiceSettings::default())
    }

    fn finish_current(ctl: &mut PlaybackController<ScriptedEngine>) -> Vec<PlaybackUpdate> {
        let id = ctl.in_flight_request().expect("request in flight");
        ctl.handle_event(EngineEvent::finished(id))
    }

    #[test]
    fn load_rewinds_and_is_ready() {
        let mut ctl = controller(4);
        ctl.load("abcdefghij").unwrap();
        assert_eq!(ctl.state(), PlaybackState::Ready);
        assert_eq!(ctl.segments().len(), 3);
        assert_eq!(ctl.cursor(), Cursor::default());
        assert_eq!(ctl.progress(), 0.0);
        assert!(ctl.engine().calls.is_empty());
    }

    #[test]
    fn empty_text_goes_straight_to_finished() {
        let mut ctl = controller(10);
        ctl.load("").unwrap();
        assert_eq!(ctl.state(), PlaybackState::Finished);
        assert!(ctl.segments().is_empty());
        assert_eq!(ctl.progress(), 100.0);

        ctl.play().unwrap();
        ctl.stop();
        assert_eq!(ctl.state(), PlaybackState::Finished);
        assert!(ctl.engine().calls.is_empty());
    }

    #[test]
    fn zero_chunk_size_is_rejected_without_state_change() {
        let mut ctl = controller(0);
        assert!(matches!(
            ctl.load("some text"),
            Err(PlaybackError::Configuration(_))
        ));
        assert_eq!(ctl.state(), PlaybackState::Idle);

        let mut ctl = controller(3);
        ctl.load("abcdef").unwrap();
        assert!(ctl.set_chunk_size(0).is_err());
        assert_eq!(ctl.chunk_size(), 3);
        assert_eq!(ctl.text(), "abcdef");
    }

    #[test]
    fn three_segment_scenario_reaches_exactly_100() {
        let mut ctl = controller(1000);
        ctl.load("A".repeat(2500)).unwrap();
        let lens: Vec<usize> = ctl.segments().iter().map(|s| s.char_len).collect();
        assert_eq!(lens, vec![1000, 1000, 500]);

        ctl.play().unwrap();
        finish_current(&mut ctl);
        finish_current(&mut ctl);
        assert!(ctl.progress() > 66.0 && ctl.progress() < 67.0);
        assert_eq!(ctl.state(), PlaybackState::Speaking);

        let updates = finish_current(&mut ctl);
        assert_eq!(ctl.state(), PlaybackState::Finished);
        assert_eq!(ctl.progress(), 100.0);
        assert!(updates.contains(&PlaybackUpdate::Finished));
        assert_eq!(ctl.in_flight_request(), None);
        assert_eq!(ctl.position(), 2500);
    }

    #[test]
    fn segments_are_requested_in_order_one_at_a_time() {
        let mut ctl = controller(3);
        ctl.load("abcdefgh").unwrap();
        ctl.play().unwrap();
        assert_eq!(ctl.engine().spoken().len(), 1);
        finish_current(&mut ctl);
        assert_eq!(ctl.engine().spoken().len(), 2);
        finish_current(&mut ctl);

        let texts: Vec<&str> = ctl
            .engine()
            .spoken()
            .iter()
            .map(|u| u.text.as_str())
            .collect();
        assert_eq!(texts, vec!["abc", "def", "gh"]);
    }

    #[test]
    fn progress_is_monotonic_and_below_100_until_finished() {
        let mut ctl = controller(10);
        ctl.load("x".repeat(30)).unwrap();
        ctl.play().unwrap();

        let mut last = ctl.progress();
        let mut observe = |ctl: &PlaybackController<ScriptedEngine>| {
            assert!(ctl.progress() >= last);
            if ctl.state() != PlaybackState::Finished {
                assert!(ctl.progress() < 100.0);
            }
            last = ctl.progress();
        };

        for segment in 0..3 {
            let id = ctl.in_flight_request().unwrap();
            for offset in [3, 9, 2, 50] {
                ctl.handle_event(EngineEvent::progress(id, offset));
                observe(&ctl);
            }
            assert_eq!(ctl.cursor().segment, segment);
            finish_current(&mut ctl);
            observe(&ctl);
        }
        assert_eq!(ctl.progress(), 100.0);
    }

    #[test]
    fn play_then_stop_keeps_progress() {
        let mut ctl = controller(10);
        ctl.load("y".repeat(40)).unwrap();
        ctl.seek(25).unwrap();
        let before = ctl.progress();
        let cursor = ctl.cursor();

        ctl.play().unwrap();
        ctl.stop();

        assert_eq!(ctl.progress(), before);
        assert_eq!(ctl.cursor(), cursor);
        assert_eq!(ctl.state(), PlaybackState::Ready);
        assert_eq!(ctl.in_flight_request(), None);
        assert_eq!(ctl.engine().count(&EngineCall::Cancel), 1);
    }

    #[test]
    fn pause_and_resume_continue_the_same_request() {
        let mut ctl = controller(100);
        ctl.load("z".repeat(250)).unwrap();
        ctl.play().unwrap();
        let id = ctl.in_flight_request().unwrap();
        ctl.handle_event(EngineEvent::progress(id, 30));

        ctl.pause();
        assert_eq!(ctl.state(), PlaybackState::Paused);
        ctl.resume().unwrap();
        assert_eq!(ctl.state(), PlaybackState::Speaking);

        assert_eq!(ctl.in_flight_request(), Some(id));
        assert_eq!(ctl.engine().spoken().len(), 1);
        assert_eq!(ctl.engine().count(&EngineCall::Pause), 1);
        assert_eq!(ctl.engine().count(&EngineCall::Resume), 1);
        assert_eq!(ctl.engine().count(&EngineCall::Cancel), 0);

        finish_current(&mut ctl);
        assert_eq!(ctl.cursor().segment, 1);
    }

    #[test]
    fn cancel_only_engine_reissues_the_remainder() {
        let mut ctl =
            PlaybackController::new(ScriptedEngine::cancel_only(), 10, VoiceSettings::default());
        ctl.load("0123456789abcdefghij").unwrap();
        ctl.play().unwrap();
        let id = ctl.in_flight_request().unwrap();
        ctl.handle_event(EngineEvent::progress(id, 4));

        ctl.pause();
        assert_eq!(ctl.in_flight_request(), None);
        assert_eq!(ctl.engine().count(&EngineCall::Cancel), 1);

        ctl.resume().unwrap();
        let resumed = ctl.engine().last_spoken().clone();
        assert_eq!(resumed.segment, 0);
        assert_eq!(resumed.text, "456789");

        // Offsets from the re-issued request are relative to its own text.
        ctl.handle_event(EngineEvent::progress(resumed.request_id, 2));
        assert_eq!(ctl.cursor().offset, 6);
        assert_eq!(ctl.position(), 6);
    }

    #[test]
    fn seek_while_speaking_cancels_and_reissues() {
        let mut ctl = controller(10);
        ctl.load("s".repeat(50)).unwrap();
        ctl.play().unwrap();
        let old = ctl.in_flight_request().unwrap();

        ctl.seek(23).unwrap();

        assert_eq!(ctl.cursor(), Cursor::at_segment(2));
        assert_eq!(ctl.state(), PlaybackState::Speaking);
        assert_eq!(ctl.engine().count(&EngineCall::Cancel), 1);
        let latest = ctl.engine().last_spoken();
        assert_eq!(latest.segment, 2);
        assert_ne!(latest.request_id, old);

        // The cancelled request can no longer move the cursor.
        assert!(ctl.handle_event(EngineEvent::finished(old)).is_empty());
        assert_eq!(ctl.cursor().segment, 2);
    }

    #[test]
    fn seek_when_not_speaking_lands_ready() {
        let mut ctl = controller(10);
        ctl.load("r".repeat(50)).unwrap();
        ctl.play().unwrap();
        ctl.pause();

        ctl.seek(41).unwrap();
        assert_eq!(ctl.state(), PlaybackState::Ready);
        assert_eq!(ctl.cursor().segment, 4);
        assert_eq!(ctl.engine().spoken().len(), 1);
        assert!((ctl.progress() - 80.0).abs() < 1e-9);

        ctl.seek(0).unwrap();
        assert_eq!(ctl.progress(), 0.0);
    }

    #[test]
    fn seek_out_of_finished_drops_progress_below_100() {
        let mut ctl = controller(10);
        ctl.load("x".repeat(50)).unwrap();
        ctl.play().unwrap();
        for _ in 0..5 {
            finish_current(&mut ctl);
        }
        assert_eq!(ctl.state(), PlaybackState::Finished);

        ctl.seek(25).unwrap();
        assert_eq!(ctl.state(), PlaybackState::Ready);
        assert_eq!(ctl.cursor().segment, 2);
        assert!((ctl.progress() - 40.0).abs() < 1e-9);

        ctl.seek(0).unwrap();
        ctl.play().unwrap();
        finish_current(&mut ctl);
        assert_eq!(ctl.state(), PlaybackState::Speaking);
        assert_eq!(ctl.cursor().segment, 1);
        assert!((ctl.progress() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn rejected_auto_advance_reports_the_next_segment() {
        let mut ctl = controller(5);
        ctl.load("aaaaabbbbb").unwrap();
        ctl.play().unwrap();
        ctl.engine_mut().fail_next_speak = true;

        let updates = finish_current(&mut ctl);
        assert!(updates.contains(&PlaybackUpdate::SegmentCompleted { segment: 0 }));
        assert!(updates.contains(&PlaybackUpdate::SegmentFailed {
            segment: 1,
            message: "synthesizer unavailable".to_string(),
        }));
        assert!(!updates.contains(&PlaybackUpdate::SegmentStarted { segment: 1 }));
        assert_eq!(ctl.state(), PlaybackState::Speaking);
        assert_eq!(ctl.in_flight_request(), None);
        assert_eq!(ctl.cursor().segment, 1);
        assert!((ctl.progress() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn huge_engine_offsets_are_capped_inside_the_segment() {
        let mut ctl = controller(10);
        ctl.load("y".repeat(20)).unwrap();
        ctl.play().unwrap();
        ctl.pause();
        let id = ctl.in_flight_request().unwrap();
        ctl.handle_event(EngineEvent::progress(id, usize::MAX));
        assert_eq!(ctl.cursor().offset, 9);
        assert!(ctl.progress() < 50.0);
    }

    #[test]
    fn engine_failure_halts_without_retry() {
        let mut ctl = controller(5);
        ctl.load("aaaaabbbbbccccc").unwrap();
        ctl.play().unwrap();
        finish_current(&mut ctl);
        let id = ctl.in_flight_request().unwrap();

        let updates = ctl.handle_event(EngineEvent::failed(id, "bad segment"));
        assert_eq!(
            updates,
            vec![PlaybackUpdate::SegmentFailed {
                segment: 1,
                message: "bad segment".to_string()
            }]
        );
        assert_eq!(ctl.state(), PlaybackState::Speaking);
        assert_eq!(ctl.cursor().segment, 1);
        assert_eq!(ctl.in_flight_request(), None);
        assert_eq!(ctl.engine().spoken().len(), 2);

        ctl.stop();
        assert_eq!(ctl.state(), PlaybackState::Ready);
        ctl.play().unwrap();
        assert_eq!(ctl.engine().last_spoken().segment, 1);
    }

    #[test]
    fn synchronous_speak_failure_is_reported() {
        let mut ctl = controller(5);
        ctl.load("hello world").unwrap();
        ctl.engine_mut().fail_next_speak = true;

        let err = ctl.play().unwrap_err();
        assert!(matches!(err, PlaybackError::Engine { segment: 0, .. }));
        assert_eq!(ctl.state(), PlaybackState::Speaking);
        assert_eq!(ctl.in_flight_request(), None);
    }

    #[test]
    fn completion_racing_pause_waits_for_resume() {
        let mut ctl = controller(4);
        ctl.load("aaaabbbb").unwrap();
        ctl.play().unwrap();
        let id = ctl.in_flight_request().unwrap();
        ctl.pause();

        ctl.handle_event(EngineEvent::finished(id));
        assert_eq!(ctl.state(), PlaybackState::Paused);
        assert_eq!(ctl.cursor().segment, 1);
        assert_eq!(ctl.engine().spoken().len(), 1);

        ctl.resume().unwrap();
        assert_eq!(ctl.engine().last_spoken().text, "bbbb");
    }

    #[test]
    fn fresh_play_cancels_outstanding_request() {
        let mut ctl = controller(4);
        ctl.load("aaaabbbb").unwrap();
        ctl.play().unwrap();
        ctl.play().unwrap();
        assert_eq!(
            ctl.engine().calls.iter().filter(|c| matches!(c, EngineCall::Cancel)).count(),
            1
        );
        assert_eq!(ctl.engine().spoken().len(), 2);
    }

    #[test]
    fn load_while_speaking_cancels_and_resets() {
        let mut ctl = controller(4);
        ctl.load("aaaabbbbcccc").unwrap();
        ctl.play().unwrap();
        finish_current(&mut ctl);

        ctl.load("new text").unwrap();
        assert_eq!(ctl.state(), PlaybackState::Ready);
        assert_eq!(ctl.cursor(), Cursor::default());
        assert_eq!(ctl.progress(), 0.0);
        assert_eq!(ctl.in_flight_request(), None);
        assert_eq!(ctl.engine().count(&EngineCall::Cancel), 1);
    }

    #[test]
    fn replay_and_stop_after_finish_rewind() {
        let mut ctl = controller(4);
        ctl.load("aaaabb").unwrap();
        ctl.play().unwrap();
        finish_current(&mut ctl);
        finish_current(&mut ctl);
        assert_eq!(ctl.state(), PlaybackState::Finished);

        ctl.stop();
        assert_eq!(ctl.state(), PlaybackState::Ready);
        assert_eq!(ctl.cursor(), Cursor::default());
        assert_eq!(ctl.progress(), 0.0);

        ctl.play().unwrap();
        finish_current(&mut ctl);
        finish_current(&mut ctl);
        ctl.play().unwrap();
        assert_eq!(ctl.state(), PlaybackState::Speaking);
        assert_eq!(ctl.engine().last_spoken().segment, 0);
    }

    #[test]
    fn calls_before_load_are_ignored() {
        let mut ctl = controller(4);
        ctl.play().unwrap();
        ctl.pause();
        ctl.resume().unwrap();
        ctl.stop();
        ctl.seek(3).unwrap();
        assert_eq!(ctl.state(), PlaybackState::Idle);
        assert!(ctl.engine().calls.is_empty());
        assert!(ctl.handle_event(EngineEvent::finished(1)).is_empty());
    }

    #[test]
    fn voice_changes_are_validated_and_applied() {
        let mut ctl = controller(4);
        ctl.load("abcd").unwrap();
        let bad = VoiceSettings {
            rate: -1.0,
            ..VoiceSettings::default()
        };
        assert!(ctl.set_voice(bad).is_err());
        assert_eq!(ctl.voice(), &VoiceSettings::default());

        let good = VoiceSettings {
            voice: Some("en-GB".to_string()),
            rate: 1.5,
            ..VoiceSettings::default()
        };
        ctl.set_voice(good.clone()).unwrap();
        ctl.play().unwrap();
        assert_eq!(ctl.engine().last_spoken().voice, good);
    }
}
