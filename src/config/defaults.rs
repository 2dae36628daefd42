pub(crate) fn default_chunk_size() -> usize {
    1200
}

pub(crate) fn default_page_separator() -> String {
    "\n\n".to_string()
}

pub(crate) fn default_rate() -> f32 {
    1.0
}

pub(crate) fn default_pitch() -> f32 {
    1.0
}

pub(crate) fn default_volume() -> f32 {
    1.0
}

pub(crate) fn default_piper_model() -> String {
    "/usr/share/piper-voices/en/en_US/ryan/high/en_US-ryan-high.onnx".to_string()
}

pub(crate) fn default_espeak_path() -> String {
    "/usr/share".to_string()
}

pub(crate) fn default_cache_dir() -> String {
    ".cache".to_string()
}

pub(crate) fn default_history_limit() -> usize {
    8
}

pub(crate) fn default_summary_sentences() -> usize {
    8
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}

pub(crate) fn default_elevenlabs_voice_id() -> String {
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

pub(crate) fn default_elevenlabs_base_url() -> String {
    "https://api.elevenlabs.io".to_string()
}
