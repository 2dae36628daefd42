//! Segmentation of document text into narration-sized chunks.
//!
//! Speech engines silently truncate or mishandle very long inputs, so the
//! document is cut into fixed-size windows before anything is spoken. The
//! windows are counted in `char`s, never bytes, so a segment cannot split a
//! code point. Concatenating the segments in order yields the input exactly.

use crate::error::PlaybackError;

/// Smallest chunk size accepted from the config file.
pub const MIN_CHUNK_SIZE: usize = 50;
/// Largest chunk size accepted from the config file.
pub const MAX_CHUNK_SIZE: usize = 10_000;

/// A contiguous slice of the document handed to the engine as one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: usize,
    /// Character offset of the first char within the document.
    pub start: usize,
    pub char_len: usize,
    pub text: String,
}

impl Segment {
    /// Character offset one past the last char.
    pub fn end(&self) -> usize {
        self.start + self.char_len
    }

    pub fn contains(&self, position: usize) -> bool {
        position >= self.start && position < self.end()
    }
}

/// Split `text` into windows of `chunk_size` chars; the last may be shorter.
///
/// Empty text yields no segments. A zero chunk size is a configuration error.
pub fn segment(text: &str, chunk_size: usize) -> Result<Vec<Segment>, PlaybackError> {
    if chunk_size == 0 {
        return Err(PlaybackError::Configuration(
            "chunk size must be greater than zero".to_string(),
        ));
    }

    let mut segments = Vec::new();
    let mut window_byte = 0usize;
    let mut window_char = 0usize;
    let mut count = 0usize;

    for (byte_idx, _) in text.char_indices() {
        if count == chunk_size {
            segments.push(Segment {
                index: segments.len(),
                start: window_char,
                char_len: count,
                text: text[window_byte..byte_idx].to_string(),
            });
            window_byte = byte_idx;
            window_char += count;
            count = 0;
        }
        count += 1;
    }

    if count > 0 {
        segments.push(Segment {
            index: segments.len(),
            start: window_char,
            char_len: count,
            text: text[window_byte..].to_string(),
        });
    }

    Ok(segments)
}

/// Index of the segment holding character `position`, clamped to the last
/// segment. `None` only when there are no segments.
pub fn segment_for_position(segments: &[Segment], position: usize) -> Option<usize> {
    if segments.is_empty() {
        return None;
    }
    let idx = segments.partition_point(|segment| segment.start <= position);
    Some(idx.saturating_sub(1).min(segments.len() - 1))
}
