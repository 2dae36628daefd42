//! A narration session: one document, its playback controller, chapters and
//! bookmarks, plus the persistence around them.
//!
//! Front ends drive a session with [`SessionCommand`]s and feed it engine
//! events; the session keeps the cache (bookmarks, last position, history)
//! in step with the controller.

use crate::cache::{Bookmark, Cache};
use crate::config::AppConfig;
use crate::engine::{EngineEvent, SpeechEngine};
use crate::error::PlaybackError;
use crate::extract;
use crate::history::History;
use crate::playback::{PlaybackController, PlaybackState, PlaybackUpdate};
use crate::text_utils::{self, Chapter};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Play,
    Pause,
    Resume,
    Stop,
    Seek { position: usize },
    JumpToChapter { index: usize },
    AddBookmark { label: Option<String> },
    JumpToBookmark { index: usize },
    RemoveBookmark { index: usize },
    Status,
}

impl SessionCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Play => "narrator_play",
            Self::Pause => "narrator_pause",
            Self::Resume => "narrator_resume",
            Self::Stop => "narrator_stop",
            Self::Seek { .. } => "narrator_seek",
            Self::JumpToChapter { .. } => "narrator_jump_to_chapter",
            Self::AddBookmark { .. } => "narrator_add_bookmark",
            Self::JumpToBookmark { .. } => "narrator_jump_to_bookmark",
            Self::RemoveBookmark { .. } => "narrator_remove_bookmark",
            Self::Status => "narrator_status",
        }
    }

    /// Parse one line of interactive input. Chapter and bookmark numbers
    /// are 1-based, as they are listed to the user.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let verb = words.next()?.to_ascii_lowercase();
        let rest: Vec<&str> = words.collect();
        let number = || rest.first().and_then(|word| word.parse::<usize>().ok());
        let one_based = || number().and_then(|n| n.checked_sub(1));

        match verb.as_str() {
            "play" | "p" => Some(Self::Play),
            "pause" => Some(Self::Pause),
            "resume" | "r" => Some(Self::Resume),
            "stop" | "s" => Some(Self::Stop),
            "seek" => number().map(|position| Self::Seek { position }),
            "chapter" | "ch" => one_based().map(|index| Self::JumpToChapter { index }),
            "bookmark" | "mark" => Some(Self::AddBookmark {
                label: Some(rest.join(" ")).filter(|label| !label.is_empty()),
            }),
            "goto" => one_based().map(|index| Self::JumpToBookmark { index }),
            "unmark" => one_based().map(|index| Self::RemoveBookmark { index }),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: PlaybackState,
    pub progress: f64,
    pub position: usize,
    pub segment: usize,
    pub segment_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub action: &'static str,
    pub status: SessionStatus,
}

pub struct NarrationSession<E: SpeechEngine> {
    source_path: PathBuf,
    name: String,
    controller: PlaybackController<E>,
    chapters: Vec<Chapter>,
    bookmarks: Vec<Bookmark>,
    cache: Cache,
}

impl<E: SpeechEngine> NarrationSession<E> {
    /// Extract `path`, load it for narration and record it in the history.
    pub fn open(
        path: &Path,
        config: &AppConfig,
        engine: E,
        cache: Cache,
    ) -> Result<Self, PlaybackError> {
        let document = extract::load_document(path, &config.page_separator)?;
        let session = Self::from_text(path, document.name, document.text, config, engine, cache)?;
        session.record_history(config.history_limit);
        Ok(session)
    }

    /// Build a session around text that is already extracted.
    pub fn from_text(
        path: &Path,
        name: impl Into<String>,
        text: impl Into<String>,
        config: &AppConfig,
        engine: E,
        cache: Cache,
    ) -> Result<Self, PlaybackError> {
        let mut controller =
            PlaybackController::new(engine, config.chunk_size, config.voice_settings());
        controller.load(text)?;
        let chapters = text_utils::detect_chapters(controller.text());
        let bookmarks = cache.load_bookmarks(path);
        let name = name.into();
        info!(
            document = %name,
            chapters = chapters.len(),
            bookmarks = bookmarks.len(),
            "Opened narration session"
        );
        Ok(Self {
            source_path: path.to_path_buf(),
            name,
            controller,
            chapters,
            bookmarks,
            cache,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn controller(&self) -> &PlaybackController<E> {
        &self.controller
    }

    pub fn transcript(&self) -> &str {
        self.controller.text()
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn summary(&self, max_sentences: usize) -> String {
        text_utils::summarize(self.controller.text(), max_sentences)
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.controller.state(),
            progress: self.controller.progress(),
            position: self.controller.position(),
            segment: self.controller.cursor().segment,
            segment_count: self.controller.segments().len(),
        }
    }

    /// Push this document to the front of the recent-documents list.
    pub fn record_history(&self, limit: usize) {
        let path = self.cache.history_path();
        let mut history = History::load(&path, limit);
        history.record(self.name.clone(), self.controller.text());
        if let Err(err) = history.save(&path) {
            warn!(path = %path.display(), "Failed to save history: {err:#}");
        }
    }

    /// Seek to the position saved by a previous session, if any.
    pub fn resume_last_position(&mut self) -> Result<Option<usize>, PlaybackError> {
        let Some(position) = self.cache.load_position(&self.source_path) else {
            return Ok(None);
        };
        info!(position, "Resuming from cached position");
        self.controller.seek(position)?;
        Ok(Some(position))
    }

    /// Persist where narration should pick up next time. A finished document
    /// starts over.
    pub fn save_position(&self) {
        let position = if self.controller.state() == PlaybackState::Finished {
            0
        } else {
            self.controller.position()
        };
        self.cache.save_position(&self.source_path, position);
    }

    pub fn apply_command(&mut self, command: SessionCommand) -> Result<SessionEvent, PlaybackError> {
        let action = command.action();
        match command {
            SessionCommand::Play => self.controller.play()?,
            SessionCommand::Pause => self.controller.pause(),
            SessionCommand::Resume => self.controller.resume()?,
            SessionCommand::Stop => {
                self.controller.stop();
                self.save_position();
            }
            SessionCommand::Seek { position } => self.controller.seek(position)?,
            SessionCommand::JumpToChapter { index } => match self.chapters.get(index) {
                Some(chapter) => {
                    info!(title = %chapter.title, start = chapter.start, "Jumping to chapter");
                    self.controller.seek(chapter.start)?;
                }
                None => warn!(index, count = self.chapters.len(), "No such chapter"),
            },
            SessionCommand::AddBookmark { label } => self.add_bookmark(label),
            SessionCommand::JumpToBookmark { index } => match self.bookmarks.get(index) {
                Some(bookmark) => {
                    info!(position = bookmark.position, "Jumping to bookmark");
                    self.controller.seek(bookmark.position)?;
                }
                None => warn!(index, count = self.bookmarks.len(), "No such bookmark"),
            },
            SessionCommand::RemoveBookmark { index } => {
                if index < self.bookmarks.len() {
                    let removed = self.bookmarks.remove(index);
                    info!(position = removed.position, "Removed bookmark");
                    self.persist_bookmarks();
                } else {
                    warn!(index, count = self.bookmarks.len(), "No such bookmark");
                }
            }
            SessionCommand::Status => {}
        }
        Ok(SessionEvent {
            action,
            status: self.status(),
        })
    }

    /// Forward an engine event to the controller, saving the position after
    /// each completed segment.
    pub fn handle_engine_event(&mut self, event: EngineEvent) -> Vec<PlaybackUpdate> {
        let updates = self.controller.handle_event(event);
        if updates
            .iter()
            .any(|update| matches!(update, PlaybackUpdate::SegmentCompleted { .. }))
        {
            self.save_position();
        }
        updates
    }

    fn add_bookmark(&mut self, label: Option<String>) {
        let bookmark = Bookmark::new(self.controller.position(), label);
        info!(
            position = bookmark.position,
            label = bookmark.label.as_deref().unwrap_or(""),
            "Added bookmark"
        );
        self.bookmarks.push(bookmark);
        self.persist_bookmarks();
    }

    fn persist_bookmarks(&self) {
        if let Err(err) = self.cache.save_bookmarks(&self.source_path, &self.bookmarks) {
            warn!("Failed to save bookmarks: {err:#}");
        }
    }
}
