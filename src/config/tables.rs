use super::defaults;
use super::models::{AppConfig, EngineKind, LogLevel};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    voice: VoiceConfig,
    #[serde(default)]
    library: LibraryConfig,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    remote: RemoteConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            chunk_size: tables.playback.chunk_size,
            page_separator: tables.playback.page_separator,
            engine: tables.voice.engine,
            voice: tables.voice.voice,
            rate: tables.voice.rate,
            pitch: tables.voice.pitch,
            volume: tables.voice.volume,
            piper_model_path: tables.voice.piper_model_path,
            espeak_path: tables.voice.espeak_path,
            cache_dir: tables.library.cache_dir,
            history_limit: tables.library.history_limit,
            summary_sentences: tables.library.summary_sentences,
            log_level: tables.logging.log_level,
            elevenlabs_voice_id: tables.remote.elevenlabs_voice_id,
            elevenlabs_base_url: tables.remote.elevenlabs_base_url,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            playback: PlaybackConfig {
                chunk_size: config.chunk_size,
                page_separator: config.page_separator.clone(),
            },
            voice: VoiceConfig {
                engine: config.engine,
                voice: config.voice.clone(),
                rate: config.rate,
                pitch: config.pitch,
                volume: config.volume,
                piper_model_path: config.piper_model_path.clone(),
                espeak_path: config.espeak_path.clone(),
            },
            library: LibraryConfig {
                cache_dir: config.cache_dir.clone(),
                history_limit: config.history_limit,
                summary_sentences: config.summary_sentences,
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            remote: RemoteConfig {
                elevenlabs_voice_id: config.elevenlabs_voice_id.clone(),
                elevenlabs_base_url: config.elevenlabs_base_url.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PlaybackConfig {
    #[serde(default = "defaults::default_chunk_size")]
    chunk_size: usize,
    #[serde(default = "defaults::default_page_separator")]
    page_separator: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            chunk_size: defaults::default_chunk_size(),
            page_separator: defaults::default_page_separator(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct VoiceConfig {
    #[serde(default)]
    engine: EngineKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    voice: Option<String>,
    #[serde(default = "defaults::default_rate")]
    rate: f32,
    #[serde(default = "defaults::default_pitch")]
    pitch: f32,
    #[serde(default = "defaults::default_volume")]
    volume: f32,
    #[serde(default = "defaults::default_piper_model")]
    piper_model_path: String,
    #[serde(default = "defaults::default_espeak_path")]
    espeak_path: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        VoiceConfig {
            engine: EngineKind::default(),
            voice: None,
            rate: defaults::default_rate(),
            pitch: defaults::default_pitch(),
            volume: defaults::default_volume(),
            piper_model_path: defaults::default_piper_model(),
            espeak_path: defaults::default_espeak_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LibraryConfig {
    #[serde(default = "defaults::default_cache_dir")]
    cache_dir: String,
    #[serde(default = "defaults::default_history_limit")]
    history_limit: usize,
    #[serde(default = "defaults::default_summary_sentences")]
    summary_sentences: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        LibraryConfig {
            cache_dir: defaults::default_cache_dir(),
            history_limit: defaults::default_history_limit(),
            summary_sentences: defaults::default_summary_sentences(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct RemoteConfig {
    #[serde(default = "defaults::default_elevenlabs_voice_id")]
    elevenlabs_voice_id: String,
    #[serde(default = "defaults::default_elevenlabs_base_url")]
    elevenlabs_base_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            elevenlabs_voice_id: defaults::default_elevenlabs_voice_id(),
            elevenlabs_base_url: defaults::default_elevenlabs_base_url(),
        }
    }
}
