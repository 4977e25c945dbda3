//! Episode generation pipeline.
//!
//! Fetches news, drafts the script, voices it, and writes the script and the
//! packaged audio into the working directory.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::PodcastError;
use crate::news::NewsItem;
use crate::publish::{AUDIO_EXTENSION, AUDIO_PREFIX, SCRIPT_EXTENSION, SCRIPT_PREFIX};
use crate::script::ScriptGenerator;
use crate::tts::SpeechSynthesizer;
use crate::wav;

/// Callback for pipeline events.
pub type PipelineCallback = Box<dyn Fn(PipelineEvent) + Send + Sync>;

/// Events emitted while an episode is produced.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// News items were gathered.
    NewsFetched { count: usize },
    /// The script was written to disk.
    ScriptReady { path: PathBuf, chars: usize },
    /// Audio was synthesized and packaged.
    AudioReady { path: PathBuf, bytes: usize },
}

/// Files produced by one run.
#[derive(Debug, Clone)]
pub struct GeneratedEpisode {
    pub script_file: PathBuf,
    pub audio_file: PathBuf,
    pub news: Vec<NewsItem>,
}

/// Runs one generation cycle against pluggable collaborators.
pub struct PodcastPipeline {
    writer: Box<dyn ScriptGenerator>,
    speech: Box<dyn SpeechSynthesizer>,
    work_dir: PathBuf,
    callback: Option<PipelineCallback>,
}

impl PodcastPipeline {
    pub fn new(
        writer: Box<dyn ScriptGenerator>,
        speech: Box<dyn SpeechSynthesizer>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            writer,
            speech,
            work_dir: work_dir.into(),
            callback: None,
        }
    }

    /// Set a callback for pipeline events.
    pub fn with_callback(mut self, callback: PipelineCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Produce an episode from already-fetched news.
    pub async fn run(
        &self,
        news: Vec<NewsItem>,
        now: DateTime<Utc>,
    ) -> Result<GeneratedEpisode, PodcastError> {
        if news.is_empty() {
            return Err(PodcastError::NoNews);
        }
        self.emit_event(PipelineEvent::NewsFetched { count: news.len() });

        let stamp = now.format("%Y%m%d_%H%M%S").to_string();
        fs::create_dir_all(&self.work_dir)?;

        let script = self.writer.generate_script(&news).await?;
        let script_file = self.output_path(SCRIPT_PREFIX, &stamp, SCRIPT_EXTENSION);
        fs::write(&script_file, &script)?;
        info!("Script saved: {}", script_file.display());
        self.emit_event(PipelineEvent::ScriptReady {
            path: script_file.clone(),
            chars: script.chars().count(),
        });

        let speech = self.speech.synthesize(&script).await?;
        let audio = wav::pack(&speech.data, &speech.mime_type);
        let audio_file = self.output_path(AUDIO_PREFIX, &stamp, AUDIO_EXTENSION);
        fs::write(&audio_file, &audio)?;
        info!("Audio saved: {} ({} bytes)", audio_file.display(), audio.len());
        self.emit_event(PipelineEvent::AudioReady {
            path: audio_file.clone(),
            bytes: audio.len(),
        });

        Ok(GeneratedEpisode {
            script_file,
            audio_file,
            news,
        })
    }

    fn output_path(&self, prefix: &str, stamp: &str, extension: &str) -> PathBuf {
        self.work_dir.join(format!("{}{}.{}", prefix, stamp, extension))
    }

    /// Emit an event if a callback is registered.
    fn emit_event(&self, event: PipelineEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }
}
