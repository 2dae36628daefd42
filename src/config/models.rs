use crate::engine::VoiceSettings;
use crate::segmenter::{MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use serde::Deserialize;
use tracing::warn;

pub(crate) const MAX_HISTORY_LIMIT: usize = 50;
pub(crate) const MAX_SUMMARY_SENTENCES: usize = 100;

/// High-level app configuration, flattened from the TOML tables.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct AppConfig {
    pub chunk_size: usize,
    pub page_separator: String,
    pub engine: EngineKind,
    pub voice: Option<String>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub piper_model_path: String,
    pub espeak_path: String,
    pub cache_dir: String,
    pub history_limit: usize,
    pub summary_sentences: usize,
    pub log_level: LogLevel,
    pub elevenlabs_voice_id: String,
    pub elevenlabs_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            chunk_size: crate::config::defaults::default_chunk_size(),
            page_separator: crate::config::defaults::default_page_separator(),
            engine: EngineKind::default(),
            voice: None,
            rate: crate::config::defaults::default_rate(),
            pitch: crate::config::defaults::default_pitch(),
            volume: crate::config::defaults::default_volume(),
            piper_model_path: crate::config::defaults::default_piper_model(),
            espeak_path: crate::config::defaults::default_espeak_path(),
            cache_dir: crate::config::defaults::default_cache_dir(),
            history_limit: crate::config::defaults::default_history_limit(),
            summary_sentences: crate::config::defaults::default_summary_sentences(),
            log_level: crate::config::defaults::default_log_level(),
            elevenlabs_voice_id: crate::config::defaults::default_elevenlabs_voice_id(),
            elevenlabs_base_url: crate::config::defaults::default_elevenlabs_base_url(),
        }
    }
}

impl AppConfig {
    /// Pull every numeric knob back into its supported range, warning about
    /// each value that had to be rewritten.
    pub fn clamped(mut self) -> Self {
        self.chunk_size = clamp_knob("chunk_size", self.chunk_size, MIN_CHUNK_SIZE, MAX_CHUNK_SIZE);
        self.history_limit = clamp_knob("history_limit", self.history_limit, 1, MAX_HISTORY_LIMIT);
        self.summary_sentences = clamp_knob(
            "summary_sentences",
            self.summary_sentences,
            1,
            MAX_SUMMARY_SENTENCES,
        );
        let requested = self.voice_settings();
        let voice = requested.clone().clamped();
        if voice != requested {
            warn!(
                rate = requested.rate,
                pitch = requested.pitch,
                volume = requested.volume,
                "Voice settings out of range; using rate={} pitch={} volume={}",
                voice.rate,
                voice.pitch,
                voice.volume
            );
        }
        self.voice = voice.voice;
        self.rate = voice.rate;
        self.pitch = voice.pitch;
        self.volume = voice.volume;
        self
    }

    pub fn voice_settings(&self) -> VoiceSettings {
        VoiceSettings {
            voice: self.voice.clone(),
            rate: self.rate,
            pitch: self.pitch,
            volume: self.volume,
        }
    }
}

fn clamp_knob(name: &str, value: usize, min: usize, max: usize) -> usize {
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!(knob = name, value, clamped, "Config value out of range; clamped");
    }
    clamped
}

/// Which narration backend the binary drives.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    /// Print segments to stdout.
    #[default]
    Console,
    /// Piper synthesis through the sound card (needs the `piper` feature).
    Piper,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EngineKind::Console => "console",
            EngineKind::Piper => "piper",
        };
        write!(f, "{}", label)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
