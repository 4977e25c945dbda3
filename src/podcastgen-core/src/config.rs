//! Configuration module for loading TOML config files.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PodcastError;
use crate::feed::{ChannelInfo, FeedSettings};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub podcast: PodcastConfig,
    pub news: NewsConfig,
    pub voices: VoicesConfig,
    pub models: ModelsConfig,
    pub prompts: PromptsConfig,
    pub paths: PathsConfig,
}

/// Channel identity and episode naming.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PodcastConfig {
    #[serde(flatten)]
    pub channel: ChannelInfo,
    /// Episode title template, `{date}` is replaced by the publish date.
    pub episode_title: String,
    pub date_format: String,
    /// Where the published audio will be downloadable from.
    /// `{repo}`, `{owner}`, `{name}` and `{file}` are expanded.
    pub enclosure_url: String,
    /// Used as the episode description when no script can be read.
    pub fallback_description: String,
}

impl Default for PodcastConfig {
    fn default() -> Self {
        Self {
            channel: ChannelInfo::default(),
            episode_title: "AI News Podcast - {date}".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            enclosure_url: "https://github.com/{repo}/releases/download/latest/{file}".to_string(),
            fallback_description: "Today's latest AI news.".to_string(),
        }
    }
}

/// News sources to summarise.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub sources: Vec<String>,
    pub items_per_source: usize,
    pub max_items: usize,
    pub timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                "https://news.google.com/rss/search?q=AI+artificial+intelligence+when:1d&hl=en-US&gl=US&ceid=US:en".to_string(),
                "https://techcrunch.com/category/artificial-intelligence/feed/".to_string(),
            ],
            items_per_source: 3,
            max_items: 5,
            timeout_secs: 10,
        }
    }
}

/// Voice configuration for the two speakers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoicesConfig {
    pub host_speaker: String,
    pub host_voice: String,
    pub guest_speaker: String,
    pub guest_voice: String,
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self {
            host_speaker: "Speaker 1".to_string(),
            host_voice: "Zephyr".to_string(),
            guest_speaker: "Speaker 2".to_string(),
            guest_voice: "Puck".to_string(),
        }
    }
}

/// Models and endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub script_model: String,
    /// OpenAI-compatible base URL used for script generation.
    pub script_api_base: String,
    pub script_max_tokens: u32,
    pub tts_model: String,
    pub tts_api_base: String,
    pub temperature: f32,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            script_model: "gemini-2.0-flash".to_string(),
            script_api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            script_max_tokens: 4096,
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
            tts_api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 1.0,
        }
    }
}

/// Prompt templates.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// `{news}`, `{host}` and `{guest}` are replaced.
    pub script_prompt: String,
    /// Prepended to the script before it is sent for synthesis.
    pub speech_preamble: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            script_prompt: DEFAULT_SCRIPT_PROMPT.to_string(),
            speech_preamble: "Read the following script aloud as a natural conversation:"
                .to_string(),
        }
    }
}

/// Working directories and file names.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Where scripts and audio are generated.
    pub work_dir: PathBuf,
    /// The published feed document.
    pub feed_file: PathBuf,
    /// If set, the episode audio is copied here before publishing.
    pub publish_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            feed_file: PathBuf::from("docs/podcast_feed.xml"),
            publish_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PodcastError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| PodcastError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_str(&content)
    }

    /// Load configuration from string content.
    pub fn from_str(content: &str) -> Result<Self, PodcastError> {
        toml::from_str(content)
            .map_err(|e| PodcastError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Build the script prompt for a digest of news.
    pub fn script_prompt(&self, news_digest: &str) -> String {
        self.prompts
            .script_prompt
            .replace("{news}", news_digest)
            .replace("{host}", &self.voices.host_speaker)
            .replace("{guest}", &self.voices.guest_speaker)
    }

    /// Feed settings for a publisher identified as `owner/name`.
    pub fn feed_settings(&self, repository: &str, year: i32) -> FeedSettings {
        FeedSettings {
            channel: self.podcast.channel.resolve(repository, year),
            publisher_id: repository.to_string(),
            episode_title: self.podcast.episode_title.clone(),
            date_format: self.podcast.date_format.clone(),
        }
    }

    /// Public URL of a published audio file.
    pub fn enclosure_url(&self, repository: &str, file_name: &str) -> String {
        let (owner, name) = repository.split_once('/').unwrap_or((repository, repository));
        self.podcast
            .enclosure_url
            .replace("{repo}", repository)
            .replace("{owner}", owner)
            .replace("{name}", name)
            .replace("{file}", file_name)
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config::default()
}

const DEFAULT_SCRIPT_PROMPT: &str = r#"Using the latest AI news below, write a podcast script of about five minutes for two speakers.

NEWS:
{news}

REQUIREMENTS:
- {host}: a bright, friendly host who opens the show and keeps it moving
- {guest}: a calm commentator who explains the technical details
- Natural conversation that listeners can follow easily
- Discuss each news item briefly
- Open with today's date and a greeting, close with a sign-off

OUTPUT FORMAT:
{host}: (line)
{guest}: (line)
Output only the dialogue lines in this format, with no stage directions or markdown.
"#;
