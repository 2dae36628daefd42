//! Engine that "speaks" by writing each utterance to a text sink.
//!
//! Used when no audio backend is compiled in, and for piping a narration
//! transcript somewhere. Every request completes immediately.

use super::{EngineEvent, SpeechEngine, Utterance};
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::sync::mpsc::Sender;
use tracing::debug;

pub struct ConsoleEngine<W: Write> {
    out: W,
    events: Sender<EngineEvent>,
}

impl ConsoleEngine<io::Stdout> {
    pub fn stdout(events: Sender<EngineEvent>) -> Self {
        Self::new(io::stdout(), events)
    }
}

impl<W: Write> ConsoleEngine<W> {
    pub fn new(out: W, events: Sender<EngineEvent>) -> Self {
        Self { out, events }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SpeechEngine for ConsoleEngine<W> {
    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        debug!(
            request_id = utterance.request_id,
            segment = utterance.segment,
            chars = utterance.text.chars().count(),
            "Writing utterance"
        );
        writeln!(self.out, "{}", utterance.text).context("Writing utterance")?;
        self.out.flush().context("Flushing utterance")?;
        self.events
            .send(EngineEvent::finished(utterance.request_id))
            .context("Event receiver dropped")?;
        Ok(())
    }

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn cancel(&mut self) {}
}
