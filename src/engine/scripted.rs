//! In-memory engine for tests: records every call and lets the test decide
//! which events the controller sees.

use super::{SpeechEngine, Utterance};
use anyhow::{Result, anyhow};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EngineCall {
    Speak(Utterance),
    Pause,
    Resume,
    Cancel,
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedEngine {
    pub(crate) calls: Vec<EngineCall>,
    pub(crate) cancel_only: bool,
    pub(crate) fail_next_speak: bool,
}

impl ScriptedEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cancel_only() -> Self {
        Self {
            cancel_only: true,
            ..Self::default()
        }
    }

    pub(crate) fn spoken(&self) -> Vec<&Utterance> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::Speak(utterance) => Some(utterance),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn last_spoken(&self) -> &Utterance {
        self.spoken()
            .last()
            .copied()
            .expect("engine has not been asked to speak")
    }

    pub(crate) fn count(&self, wanted: &EngineCall) -> usize {
        self.calls.iter().filter(|call| *call == wanted).count()
    }
}

impl SpeechEngine for ScriptedEngine {
    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        if self.fail_next_speak {
            self.fail_next_speak = false;
            return Err(anyhow!("synthesizer unavailable"));
        }
        self.calls.push(EngineCall::Speak(utterance));
        Ok(())
    }

    fn pause(&mut self) {
        self.calls.push(EngineCall::Pause);
    }

    fn resume(&mut self) {
        self.calls.push(EngineCall::Resume);
    }

    fn cancel(&mut self) {
        self.calls.push(EngineCall::Cancel);
    }

    fn supports_suspend(&self) -> bool {
        !self.cancel_only
    }
}
