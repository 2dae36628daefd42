//! Graceful stop requests from the terminal.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Set once the user asks narration to end (Ctrl-C or `quit`). The narration
/// loop polls it between engine events and saves the position before exiting.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    /// A signal that Ctrl-C will raise. The handler can only be installed
    /// once per process.
    pub fn on_ctrl_c() -> Result<Self> {
        let signal = Self::default();
        let handler_signal = signal.clone();
        ctrlc::set_handler(move || {
            info!("Interrupt received; stopping narration");
            handler_signal.request_stop();
        })
        .context("Installing Ctrl-C handler")?;
        Ok(signal)
    }

    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}
