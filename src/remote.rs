//! ElevenLabs text-to-speech client.
//!
//! Downloads a single MP3 rendition of a whole text. This is a one-shot
//! export; the playback controller never drives it.
//!
//! The API key is read from `ELEVENLABS_API_KEY`, or `ELEVEN_LABS_API_KEY`
//! as a fallback.

use crate::error::RemoteError;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

const PROVIDER: &str = "elevenlabs";
const API_KEY_VARS: [&str; 2] = ["ELEVENLABS_API_KEY", "ELEVEN_LABS_API_KEY"];
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub struct ElevenLabsClient {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    voice_id: String,
}

impl std::fmt::Debug for ElevenLabsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevenLabsClient")
            .field("base_url", &self.base_url)
            .field("voice_id", &self.voice_id)
            .finish_non_exhaustive()
    }
}

impl ElevenLabsClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        voice_id: impl Into<String>,
    ) -> Result<Self, RemoteError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| RemoteError::Http {
                provider: PROVIDER,
                source,
            })?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            voice_id: voice_id.into(),
        })
    }

    /// Build a client with the API key taken from the environment.
    pub fn from_env(
        base_url: impl Into<String>,
        voice_id: impl Into<String>,
    ) -> Result<Self, RemoteError> {
        let api_key = API_KEY_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or(RemoteError::MissingApiKey {
                variable: API_KEY_VARS[0],
            })?;
        Self::new(api_key, base_url, voice_id)
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.base_url.trim_end_matches('/'),
            self.voice_id
        )
    }

    /// Request MP3 audio for `text`.
    pub fn synthesize(&self, text: &str) -> Result<Vec<u8>, RemoteError> {
        if text.trim().is_empty() {
            return Err(RemoteError::EmptyText);
        }
        let http = |source| RemoteError::Http {
            provider: PROVIDER,
            source,
        };

        info!(
            voice_id = %self.voice_id,
            chars = text.chars().count(),
            "Requesting ElevenLabs rendition"
        );
        let response = self
            .client
            .post(self.endpoint())
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&serde_json::json!({ "text": text }))
            .send()
            .map_err(http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RemoteError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().map_err(http)?;
        Ok(bytes.to_vec())
    }

    pub fn synthesize_to_file(&self, text: &str, destination: &Path) -> Result<()> {
        let audio = self.synthesize(text)?;
        fs::write(destination, &audio)
            .with_context(|| format!("Writing audio to {}", destination.display()))?;
        info!(
            path = %destination.display(),
            bytes = audio.len(),
            "Saved ElevenLabs rendition"
        );
        Ok(())
    }
}
