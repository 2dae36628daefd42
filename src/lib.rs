//! Chunked PDF narration.
//!
//! A document's text is cut into fixed-size segments and handed one at a
//! time to a [`engine::SpeechEngine`]. The [`playback::PlaybackController`]
//! owns the cursor and the play/pause/resume/stop/seek state machine, and
//! reports monotone progress as engine events arrive. Everything around it
//! (extraction, chapters, bookmarks, history, config) lives in the sibling
//! modules and meets in [`session::NarrationSession`].

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod history;
pub mod interrupt;
pub mod playback;
pub mod remote;
pub mod segmenter;
pub mod session;
pub mod text_utils;
