//! Publishing the newest episode into the podcast feed on disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::PodcastError;
use crate::feed::{FeedOrigin, NewEpisodeInput, publish_episode};

pub const AUDIO_PREFIX: &str = "podcast_";
pub const AUDIO_EXTENSION: &str = "wav";
pub const SCRIPT_PREFIX: &str = "script_";
pub const SCRIPT_EXTENSION: &str = "txt";

const SUMMARY_CHARS: usize = 200;

/// Outcome of a successful publish.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub audio_file: PathBuf,
    pub feed_file: PathBuf,
    pub enclosure_url: String,
    pub audio_bytes: u64,
    pub origin: FeedOrigin,
    pub episode_count: usize,
    pub guid: String,
}

/// Adds the newest generated episode to the feed file.
///
/// Performs an unlocked read-modify-write of the feed: only one publisher may
/// run against a given feed file at a time.
pub struct FeedPublisher {
    config: Config,
    repository: String,
}

impl FeedPublisher {
    pub fn new(config: Config, repository: impl Into<String>) -> Self {
        Self {
            config,
            repository: repository.into(),
        }
    }

    pub fn publish(&self) -> Result<PublishReport, PodcastError> {
        self.publish_at(Utc::now())
    }

    pub fn publish_at(&self, now: DateTime<Utc>) -> Result<PublishReport, PodcastError> {
        let paths = &self.config.paths;

        let audio_file = latest_file(&paths.work_dir, AUDIO_PREFIX, AUDIO_EXTENSION)?
            .ok_or_else(|| PodcastError::NoAudioFile {
                dir: paths.work_dir.display().to_string(),
                pattern: format!("{}*.{}", AUDIO_PREFIX, AUDIO_EXTENSION),
            })?;
        info!("Latest audio: {}", audio_file.display());

        let script_file = latest_file(&paths.work_dir, SCRIPT_PREFIX, SCRIPT_EXTENSION)?;
        let description = script_summary(
            script_file.as_deref(),
            &self.config.podcast.fallback_description,
        );

        let file_name = audio_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some(publish_dir) = &paths.publish_dir {
            fs::create_dir_all(publish_dir)?;
            let target = publish_dir.join(&file_name);
            fs::copy(&audio_file, &target)?;
            info!("Copied audio to {}", target.display());
        }

        let audio_bytes = fs::metadata(&audio_file)?.len();
        let existing = read_optional(&paths.feed_file)?;

        let input = NewEpisodeInput {
            description,
            enclosure_url: self.config.enclosure_url(&self.repository, &file_name),
            enclosure_type: enclosure_type_for(&audio_file).to_string(),
            enclosure_length: audio_bytes,
            duration: wav_duration(&audio_file),
        };

        let settings = self.config.feed_settings(&self.repository, now.year());
        let update = publish_episode(existing.as_deref(), &input, &settings, now)?;

        if let Some(parent) = paths.feed_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&paths.feed_file, &update.bytes)?;
        info!(
            "Feed updated: {} ({} episodes)",
            paths.feed_file.display(),
            update.episode_count
        );

        Ok(PublishReport {
            audio_file,
            feed_file: paths.feed_file.clone(),
            enclosure_url: input.enclosure_url,
            audio_bytes,
            origin: update.origin,
            episode_count: update.episode_count,
            guid: update.episode.guid,
        })
    }
}

/// Most recent file named `{prefix}*.{extension}` in `dir`.
pub fn latest_file(
    dir: &Path,
    prefix: &str,
    extension: &str,
) -> Result<Option<PathBuf>, PodcastError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let matches = name.starts_with(prefix)
            && path.extension().is_some_and(|ext| ext == extension)
            && entry.file_type()?.is_file();
        if !matches {
            continue;
        }

        let metadata = entry.metadata()?;
        let stamp = metadata.created().or_else(|_| metadata.modified())?;
        // Name breaks ties so the choice is stable on coarse-grained clocks.
        let is_newer = match &newest {
            None => true,
            Some((best, best_path)) => (stamp, &path) > (*best, best_path),
        };
        if is_newer {
            newest = Some((stamp, path));
        }
    }

    Ok(newest.map(|(_, path)| path))
}

/// First 200 characters of a script, flattened to one line.
pub fn script_summary(path: Option<&Path>, fallback: &str) -> String {
    let Some(path) = path else {
        return fallback.to_string();
    };

    match fs::read_to_string(path) {
        Ok(content) => {
            let mut summary: String = content
                .chars()
                .take(SUMMARY_CHARS)
                .collect::<String>()
                .replace('\n', " ")
                .trim()
                .to_string();
            if content.chars().count() > SUMMARY_CHARS {
                summary.push_str("...");
            }
            summary
        }
        Err(e) => {
            warn!("Failed to read script {}: {}", path.display(), e);
            fallback.to_string()
        }
    }
}

/// MIME type for a published audio file, by extension.
pub fn enclosure_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        _ => "application/octet-stream",
    }
}

/// Playback length from a WAV header, or `None` for anything hound can't read.
pub fn wav_duration(path: &Path) -> Option<Duration> {
    match hound::WavReader::open(path) {
        Ok(reader) => {
            let spec = reader.spec();
            if spec.sample_rate == 0 {
                return None;
            }
            let millis = u64::from(reader.duration()) * 1000 / u64::from(spec.sample_rate);
            Some(Duration::from_millis(millis))
        }
        Err(e) => {
            debug!("Could not read duration of {}: {}", path.display(), e);
            None
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, PodcastError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::feed::FeedDocument;
    use crate::wav;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = default_config();
        config.paths.work_dir = dir.path().to_path_buf();
        config.paths.feed_file = dir.path().join("docs").join("podcast_feed.xml");
        config
    }

    fn write_episode(dir: &TempDir, stamp: &str, seconds: u32) {
        let pcm = vec![0u8; (48000 * seconds) as usize];
        let wav = wav::pack(&pcm, "audio/L16;codec=pcm;rate=24000");
        fs::write(dir.path().join(format!("podcast_{stamp}.wav")), wav).unwrap();
        fs::write(
            dir.path().join(format!("script_{stamp}.txt")),
            "Speaker 1: Welcome to the show.\nSpeaker 2: Thanks.",
        )
        .unwrap();
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 6, 0, 0).unwrap()
    }

    #[test]
    fn test_publish_without_audio_leaves_feed_untouched() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let feed_file = config.paths.feed_file.clone();

        let result = FeedPublisher::new(config, "alice/daily-ai").publish_at(now());
        assert!(matches!(result, Err(PodcastError::NoAudioFile { .. })));
        assert!(!feed_file.exists());
    }

    #[test]
    fn test_publish_creates_feed() {
        let dir = TempDir::new().unwrap();
        write_episode(&dir, "20261017_055900", 2);
        let config = config_in(&dir);

        let report = FeedPublisher::new(config, "alice/daily-ai")
            .publish_at(now())
            .unwrap();
        assert_eq!(report.origin, FeedOrigin::Created);
        assert_eq!(report.audio_bytes, 44 + 96000);
        assert_eq!(
            report.enclosure_url,
            "https://github.com/alice/daily-ai/releases/download/latest/podcast_20261017_055900.wav"
        );

        let doc = FeedDocument::parse(&fs::read(&report.feed_file).unwrap()).unwrap();
        let episodes = doc.episodes();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].enclosure_length, report.audio_bytes);
        assert_eq!(episodes[0].enclosure_type, "audio/wav");
        assert_eq!(episodes[0].duration, "00:02");
        assert_eq!(
            episodes[0].description,
            "Speaker 1: Welcome to the show. Speaker 2: Thanks."
        );
    }

    #[test]
    fn test_publish_recovers_from_corrupt_feed_and_appends_later() {
        let dir = TempDir::new().unwrap();
        write_episode(&dir, "20261017_055900", 1);
        let config = config_in(&dir);
        fs::create_dir_all(config.paths.feed_file.parent().unwrap()).unwrap();
        fs::write(&config.paths.feed_file, "<<< definitely not xml").unwrap();

        let publisher = FeedPublisher::new(config, "alice/daily-ai");
        let first = publisher.publish_at(now()).unwrap();
        assert_eq!(first.origin, FeedOrigin::Rebuilt);

        let second = publisher
            .publish_at(now() + chrono::Duration::days(1))
            .unwrap();
        assert_eq!(second.origin, FeedOrigin::Updated);
        assert_eq!(second.episode_count, 2);
        assert_ne!(first.guid, second.guid);
    }

    #[test]
    fn test_publish_copies_audio_when_configured() {
        let dir = TempDir::new().unwrap();
        write_episode(&dir, "20261017_055900", 1);
        let mut config = config_in(&dir);
        config.paths.publish_dir = Some(dir.path().join("public"));

        FeedPublisher::new(config, "alice/daily-ai")
            .publish_at(now())
            .unwrap();
        assert!(dir.path().join("public/podcast_20261017_055900.wav").exists());
    }

    #[test]
    fn test_latest_file_filters_by_prefix_and_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("podcast_a.wav"), b"a").unwrap();
        fs::write(dir.path().join("podcast_b.mp3"), b"b").unwrap();
        fs::write(dir.path().join("other.wav"), b"c").unwrap();

        let found = latest_file(dir.path(), "podcast_", "wav").unwrap();
        assert_eq!(found, Some(dir.path().join("podcast_a.wav")));
        assert_eq!(latest_file(dir.path(), "script_", "txt").unwrap(), None);
        assert_eq!(
            latest_file(&dir.path().join("missing"), "podcast_", "wav").unwrap(),
            None
        );
    }

    #[test]
    fn test_script_summary_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("script.txt");
        fs::write(&path, "x".repeat(250)).unwrap();
        let summary = script_summary(Some(&path), "fallback");
        assert_eq!(summary.len(), 203);
        assert!(summary.ends_with("..."));

        assert_eq!(script_summary(None, "fallback"), "fallback");
        assert_eq!(
            script_summary(Some(&dir.path().join("nope.txt")), "fallback"),
            "fallback"
        );
    }

    #[test]
    fn test_enclosure_type_for() {
        assert_eq!(enclosure_type_for(Path::new("a.WAV")), "audio/wav");
        assert_eq!(enclosure_type_for(Path::new("a.mp3")), "audio/mpeg");
        assert_eq!(enclosure_type_for(Path::new("a")), "application/octet-stream");
    }

    #[test]
    fn test_wav_duration_non_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.wav");
        fs::write(&path, b"not a wav").unwrap();
        assert_eq!(wav_duration(&path), None);
    }
}
