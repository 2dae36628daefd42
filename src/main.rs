//! Entry point for the PDF narrator.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load user configuration from `conf/config.toml`.
//! - Build the speech engine and open a narration session.
//! - Pump stdin commands and engine events until done or interrupted.

use anyhow::{Result, anyhow};
use pdf_narrator::cache::Cache;
use pdf_narrator::config::{AppConfig, EngineKind, load_config};
use pdf_narrator::engine::{ConsoleEngine, EngineEvent, SpeechEngine};
use pdf_narrator::extract;
use pdf_narrator::interrupt::StopSignal;
use pdf_narrator::playback::PlaybackUpdate;
use pdf_narrator::remote::ElevenLabsClient;
use pdf_narrator::session::{NarrationSession, SessionCommand};
use std::env;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage: pdf-narrator <path-to-document> [--resume] [--transcript] [--chapters] [--summary] [--elevenlabs <out.mp3>]";
const COMMANDS_HELP: &str = "Commands: play, pause, resume, stop, seek <char>, chapter <n>, bookmark [label], goto <n>, unmark <n>, status, quit";
const EVENT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct CliArgs {
    path: PathBuf,
    resume: bool,
    transcript: bool,
    chapters: bool,
    summary: bool,
    elevenlabs: Option<PathBuf>,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let config = load_config(Path::new("conf/config.toml"));
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        path = %args.path.display(),
        engine = %config.engine,
        chunk_size = config.chunk_size,
        "Starting PDF narrator"
    );

    if let Some(destination) = &args.elevenlabs {
        return export_elevenlabs(&args.path, destination, &config);
    }

    let cache = Cache::new(&config.cache_dir);
    let (events_tx, events_rx) = mpsc::channel();
    let engine = build_engine(&config, &cache, events_tx)?;
    let mut session = NarrationSession::open(&args.path, &config, engine, cache)?;

    if args.transcript || args.chapters || args.summary {
        print_reports(&session, &args, &config);
        return Ok(());
    }

    if args.resume && session.resume_last_position()?.is_none() {
        info!("No saved position; starting from the beginning");
    }

    let stop = StopSignal::on_ctrl_c()?;
    let commands = spawn_command_reader(stop.clone());
    println!("{COMMANDS_HELP}");

    start_narration(&mut session);
    let outcome = narrate(&mut session, &events_rx, &commands, &stop);
    session.save_position();
    outcome
}

/// Issue the first segment. A rejection is reported and left for the user
/// to retry, like any other segment failure.
fn start_narration<E: SpeechEngine>(session: &mut NarrationSession<E>) -> bool {
    match session.apply_command(SessionCommand::Play) {
        Ok(_) => true,
        Err(err) => {
            warn!("Could not start narration: {err}");
            println!("Narration could not start; type 'play' to retry or 'quit' to exit.");
            false
        }
    }
}

fn narrate<E: SpeechEngine>(
    session: &mut NarrationSession<E>,
    events: &Receiver<EngineEvent>,
    commands: &Receiver<SessionCommand>,
    stop: &StopSignal,
) -> Result<()> {
    loop {
        if stop.stop_requested() {
            info!("Narration cancelled");
            return Ok(());
        }

        while let Ok(command) = commands.try_recv() {
            match session.apply_command(command) {
                Ok(event) => {
                    let status = &event.status;
                    println!(
                        "[{}] {:.1}% segment {}/{} at char {}",
                        status.state,
                        status.progress,
                        status.segment + 1,
                        status.segment_count,
                        status.position
                    );
                    debug!(action = event.action, "Applied command");
                }
                Err(err) => warn!("Command failed: {err}"),
            }
        }

        match events.recv_timeout(EVENT_POLL) {
            Ok(event) => {
                for update in session.handle_engine_event(event) {
                    match update {
                        PlaybackUpdate::Progress(progress) => debug!(progress, "Progress"),
                        PlaybackUpdate::SegmentStarted { segment } => {
                            debug!(segment, "Segment started")
                        }
                        PlaybackUpdate::SegmentCompleted { segment } => {
                            debug!(segment, "Segment completed")
                        }
                        PlaybackUpdate::SegmentFailed { segment, message } => {
                            warn!(segment, "Segment failed: {message}");
                            println!("Segment {} failed; type 'play' to retry.", segment + 1);
                        }
                        PlaybackUpdate::Finished => {
                            info!(document = session.name(), "Finished narrating");
                            return Ok(());
                        }
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(anyhow!("Speech engine stopped unexpectedly"));
            }
        }
    }
}

fn build_engine(
    config: &AppConfig,
    cache: &Cache,
    events: Sender<EngineEvent>,
) -> Result<Box<dyn SpeechEngine>> {
    match config.engine {
        EngineKind::Console => Ok(Box::new(ConsoleEngine::stdout(events))),
        EngineKind::Piper => build_piper(config, cache, events),
    }
}

#[cfg(feature = "piper")]
fn build_piper(
    config: &AppConfig,
    cache: &Cache,
    events: Sender<EngineEvent>,
) -> Result<Box<dyn SpeechEngine>> {
    use anyhow::Context;

    let engine = pdf_narrator::engine::PiperEngine::new(
        PathBuf::from(&config.piper_model_path),
        PathBuf::from(&config.espeak_path),
        cache.root().join("tts"),
        events,
    )
    .context("Starting Piper engine")?;
    Ok(Box::new(engine))
}

#[cfg(not(feature = "piper"))]
fn build_piper(
    _config: &AppConfig,
    _cache: &Cache,
    events: Sender<EngineEvent>,
) -> Result<Box<dyn SpeechEngine>> {
    warn!("Built without the `piper` feature; falling back to the console engine");
    Ok(Box::new(ConsoleEngine::stdout(events)))
}

fn export_elevenlabs(source: &Path, destination: &Path, config: &AppConfig) -> Result<()> {
    let document = extract::load_document(source, &config.page_separator)?;
    let client =
        ElevenLabsClient::from_env(&config.elevenlabs_base_url, &config.elevenlabs_voice_id)?;
    client.synthesize_to_file(&document.text, destination)
}

fn print_reports<E: SpeechEngine>(session: &NarrationSession<E>, args: &CliArgs, config: &AppConfig) {
    if args.summary {
        println!("{}", session.summary(config.summary_sentences));
    }
    if args.chapters {
        if session.chapters().is_empty() {
            println!("No chapters detected.");
        }
        for (idx, chapter) in session.chapters().iter().enumerate() {
            println!("{:>3}. {} (char {})", idx + 1, chapter.title, chapter.start);
        }
    }
    if args.transcript {
        println!("{}", session.transcript());
    }
}

/// Read commands from stdin on a background thread. `quit` raises the stop
/// signal; end of input just stops reading.
fn spawn_command_reader(stop: StopSignal) -> Receiver<SessionCommand> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if matches!(trimmed, "quit" | "q" | "exit") {
                stop.request_stop();
                break;
            }
            match SessionCommand::parse(trimmed) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None => println!("Unknown command. {COMMANDS_HELP}"),
            }
        }
        debug!("Command reader finished");
    });
    rx
}

fn parse_args<I>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = CliArgs::default();
    let mut path = None;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--resume" => parsed.resume = true,
            "--transcript" => parsed.transcript = true,
            "--chapters" => parsed.chapters = true,
            "--summary" => parsed.summary = true,
            "--elevenlabs" => {
                let out = args
                    .next()
                    .ok_or_else(|| anyhow!("--elevenlabs needs an output path\n{USAGE}"))?;
                parsed.elevenlabs = Some(PathBuf::from(out));
            }
            flag if flag.starts_with("--") => return Err(anyhow!("Unknown flag {flag}\n{USAGE}")),
            _ if path.is_none() => path = Some(PathBuf::from(&arg)),
            _ => return Err(anyhow!("Unexpected argument {arg}\n{USAGE}")),
        }
    }

    let path = path.ok_or_else(|| anyhow!(USAGE))?;
    if !path.exists() {
        return Err(anyhow!("File not found: {}", path.display()));
    }
    parsed.path = path;
    Ok(parsed)
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    debug!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        debug!(%level, "Applied log level from config");
    }
}
