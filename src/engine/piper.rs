//! Local neural narration using `piper-rs`, played through `rodio`.
//!
//! A dedicated worker thread owns the audio output and the synthesizer;
//! the engine handle only forwards commands to it. Each utterance is rendered
//! to a WAV under the cache directory (keyed by model, text and voice knobs)
//! so replaying a segment after a seek or a cancel-and-resume is instant.
//!
//! Piper reports no word boundaries, so progress is estimated from elapsed
//! playback time against the clip duration.

use super::{EngineEvent, SpeechEngine, Utterance, VoiceSettings};
use anyhow::{Context, Result, anyhow};
use piper_rs::from_config_path;
use piper_rs::synth::{AudioOutputConfig, PiperSpeechSynthesizer};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use sha2::{Digest, Sha256};
use std::env;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const TICK: Duration = Duration::from_millis(100);
const FALLBACK_CLIP: Duration = Duration::from_secs(1);

enum WorkerCommand {
    Speak(Utterance),
    Pause,
    Resume,
    Cancel,
    Shutdown,
}

pub struct PiperEngine {
    commands: Sender<WorkerCommand>,
    worker: Option<JoinHandle<()>>,
}

impl PiperEngine {
    /// Load the model and open the audio device on a worker thread. Returns
    /// once the worker is ready, or with the error that stopped it.
    pub fn new(
        model_path: PathBuf,
        espeak_path: PathBuf,
        cache_root: PathBuf,
        events: Sender<EngineEvent>,
    ) -> Result<Self> {
        let espeak_path = sanitize_espeak_root(espeak_path);
        if env::var_os("PIPER_ESPEAKNG_DATA_DIRECTORY").is_none() {
            // Safe because this runs during startup, before the worker exists.
            unsafe {
                env::set_var("PIPER_ESPEAKNG_DATA_DIRECTORY", &espeak_path);
            }
        }
        info!(
            model = %model_path.display(),
            espeak_root = %espeak_path.display(),
            "Initializing Piper engine"
        );

        let (commands, inbox) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("piper-engine".to_string())
            .spawn(move || {
                let mut worker = match Worker::start(model_path, cache_root, events) {
                    Ok(worker) => {
                        let _ = ready_tx.send(Ok(()));
                        worker
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                worker.run(inbox);
            })
            .context("Spawning Piper worker")?;

        ready_rx
            .recv()
            .map_err(|_| anyhow!("Piper worker exited during startup"))??;

        Ok(Self {
            commands,
            worker: Some(worker),
        })
    }

    fn send(&self, command: WorkerCommand) {
        if self.commands.send(command).is_err() {
            warn!("Piper worker is gone; command dropped");
        }
    }
}

impl SpeechEngine for PiperEngine {
    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        self.commands
            .send(WorkerCommand::Speak(utterance))
            .map_err(|_| anyhow!("Piper worker is not running"))
    }

    fn pause(&mut self) {
        self.send(WorkerCommand::Pause);
    }

    fn resume(&mut self) {
        self.send(WorkerCommand::Resume);
    }

    fn cancel(&mut self) {
        self.send(WorkerCommand::Cancel);
    }
}

impl Drop for PiperEngine {
    fn drop(&mut self) {
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Piper worker panicked");
            }
        }
    }
}

/// The clip currently playing.
struct Active {
    request_id: u64,
    sink: Sink,
    char_len: usize,
    duration: Duration,
    played: Duration,
    resumed_at: Option<Instant>,
    reported: usize,
}

impl Active {
    fn elapsed(&self) -> Duration {
        self.played + self.resumed_at.map(|at| at.elapsed()).unwrap_or_default()
    }
}

struct Worker {
    model_path: PathBuf,
    cache_root: PathBuf,
    piper: PiperSpeechSynthesizer,
    // Dropping the stream silences every sink built from its handle.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    events: Sender<EngineEvent>,
    active: Option<Active>,
}

impl Worker {
    fn start(model_path: PathBuf, cache_root: PathBuf, events: Sender<EngineEvent>) -> Result<Self> {
        let config_path = resolve_piper_config(&model_path);
        if !config_path.exists() {
            anyhow::bail!(
                "Piper config not found at {} (expected from {})",
                config_path.display(),
                model_path.display()
            );
        }
        let model = from_config_path(&config_path).context("Loading Piper model")?;
        let piper = PiperSpeechSynthesizer::new(model).context("Preparing Piper synthesizer")?;
        let (stream, handle) = OutputStream::try_default().context("Opening audio output")?;
        Ok(Self {
            model_path,
            cache_root,
            piper,
            _stream: stream,
            handle,
            events,
            active: None,
        })
    }

    fn run(&mut self, inbox: Receiver<WorkerCommand>) {
        loop {
            match inbox.recv_timeout(TICK) {
                Ok(WorkerCommand::Speak(utterance)) => self.speak(utterance),
                Ok(WorkerCommand::Pause) => self.pause(),
                Ok(WorkerCommand::Resume) => self.resume(),
                Ok(WorkerCommand::Cancel) => {
                    if let Some(active) = self.active.take() {
                        debug!(request_id = active.request_id, "Cancelling clip");
                        active.sink.stop();
                    }
                }
                Ok(WorkerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => self.tick(),
            }
        }
        if let Some(active) = self.active.take() {
            active.sink.stop();
        }
        debug!("Piper worker stopped");
    }

    fn speak(&mut self, utterance: Utterance) {
        if let Some(previous) = self.active.take() {
            previous.sink.stop();
        }
        if let Some(voice) = utterance.voice.voice.as_deref() {
            debug!(voice, "Piper voice comes from the model; ignoring voice id");
        }

        let request_id = utterance.request_id;
        match self.start_clip(&utterance) {
            Ok(active) => self.active = Some(active),
            Err(err) => {
                warn!(request_id, segment = utterance.segment, "Piper failed: {err:#}");
                self.emit(EngineEvent::failed(request_id, format!("{err:#}")));
            }
        }
    }

    fn start_clip(&self, utterance: &Utterance) -> Result<Active> {
        let path = cache_path(
            &self.cache_root,
            &self.model_path,
            &utterance.text,
            &utterance.voice,
        );
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("Creating TTS cache directory")?;
            }
            synth_with_piper(&self.piper, &path, &utterance.text, &utterance.voice)?;
        }

        let file = File::open(&path).with_context(|| format!("Opening {}", path.display()))?;
        let source = Decoder::new(BufReader::new(file)).context("Decoding synthesized audio")?;
        let duration = source.total_duration().unwrap_or(FALLBACK_CLIP);

        let sink = Sink::try_new(&self.handle).context("Creating sink")?;
        sink.set_volume(utterance.voice.volume);
        sink.append(source);
        sink.play();
        debug!(
            request_id = utterance.request_id,
            path = %path.display(),
            duration_ms = duration.as_millis(),
            "Playing clip"
        );

        Ok(Active {
            request_id: utterance.request_id,
            sink,
            char_len: utterance.text.chars().count(),
            duration,
            played: Duration::ZERO,
            resumed_at: Some(Instant::now()),
            reported: 0,
        })
    }

    fn pause(&mut self) {
        if let Some(active) = self.active.as_mut() {
            if let Some(at) = active.resumed_at.take() {
                active.played += at.elapsed();
                active.sink.pause();
            }
        }
    }

    fn resume(&mut self) {
        if let Some(active) = self.active.as_mut() {
            if active.resumed_at.is_none() {
                active.resumed_at = Some(Instant::now());
                active.sink.play();
            }
        }
    }

    fn tick(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.resumed_at.is_none() {
            return;
        }
        if active.sink.empty() {
            let request_id = active.request_id;
            self.active = None;
            self.emit(EngineEvent::finished(request_id));
            return;
        }
        let offset = estimate_offset(active.elapsed(), active.duration, active.char_len);
        if offset > active.reported {
            active.reported = offset;
            let event = EngineEvent::progress(active.request_id, offset);
            self.emit(event);
        }
    }

    fn emit(&self, event: EngineEvent) {
        if self.events.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }
}

/// Char offset reached after `elapsed` of a clip lasting `duration`. Never
/// reports the last char; completion is signalled separately.
fn estimate_offset(elapsed: Duration, duration: Duration, char_len: usize) -> usize {
    if duration.is_zero() || char_len == 0 {
        return 0;
    }
    let fraction = (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0);
    ((fraction * char_len as f64) as usize).min(char_len - 1)
}

fn cache_path(base: &Path, model_path: &Path, text: &str, voice: &VoiceSettings) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(model_path.as_os_str().to_string_lossy().as_bytes());
    hasher.update(text.as_bytes());
    hasher.update(voice.rate.to_le_bytes());
    hasher.update(voice.pitch.to_le_bytes());
    let hash = format!("{:x}", hasher.finalize());
    base.join(format!("tts-{hash}.wav"))
}

/// Piper expects the parent directory that contains `espeak-ng-data/phonindex`.
/// Users often point directly at `.../espeak-ng-data`; trim that to avoid
/// duplicated segments like `/espeak-ng-data/espeak-ng-data/phonindex`.
fn sanitize_espeak_root(path: PathBuf) -> PathBuf {
    if path
        .file_name()
        .map(|n| n == "espeak-ng-data")
        .unwrap_or(false)
    {
        if let Some(parent) = path.parent() {
            debug!(
                original = %path.display(),
                sanitized = %parent.display(),
                "Trimming espeak-ng-data suffix"
            );
            return parent.to_path_buf();
        }
    }
    path
}

fn synth_with_piper(
    piper: &PiperSpeechSynthesizer,
    path: &Path,
    text: &str,
    voice: &VoiceSettings,
) -> Result<()> {
    debug!(
        path = %path.display(),
        rate = voice.rate,
        pitch = voice.pitch,
        chars = text.chars().count(),
        "Synthesizing segment with Piper"
    );
    let neutral = (voice.rate - 1.0).abs() <= f32::EPSILON && (voice.pitch - 1.0).abs() <= f32::EPSILON;
    let output_config = if neutral {
        None
    } else {
        Some(AudioOutputConfig {
            rate: Some(speed_to_rate_percent(voice.rate)),
            volume: None,
            pitch: Some(pitch_to_percent(voice.pitch)),
            appended_silence_ms: None,
        })
    };
    piper
        .synthesize_to_file(path, text.to_string(), output_config)
        .context("Synthesizing audio")?;
    Ok(())
}

fn resolve_piper_config(model_path: &Path) -> PathBuf {
    if model_path
        .extension()
        .map(|ext| ext == "onnx")
        .unwrap_or(false)
    {
        return model_path.with_extension("onnx.json");
    }
    model_path.to_path_buf()
}

fn speed_to_rate_percent(speed: f32) -> u8 {
    let clamped = speed.clamp(0.5, 5.5);
    let percent = ((clamped - 0.5) / 5.0) * 100.0;
    percent.round().clamp(0.0, 100.0) as u8
}

/// Pitch 0..=2 maps onto Piper's 0..=100 percent scale, 1.0 at the middle.
fn pitch_to_percent(pitch: f32) -> u8 {
    (pitch.clamp(0.0, 2.0) * 50.0).round() as u8
}
