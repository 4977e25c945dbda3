//! Podcast Generator Core Library
//!
//! Turns recent news into a two-speaker podcast episode: script generation,
//! speech synthesis, WAV packaging, and RSS feed publishing.

pub mod config;
pub mod error;
pub mod feed;
pub mod news;
pub mod pipeline;
pub mod publish;
pub mod script;
pub mod tts;
pub mod wav;

pub use config::{Config, default_config};
pub use error::{FeedError, PodcastError};
pub use feed::{FeedDocument, FeedOrigin, FeedSettings, NewEpisodeInput, publish_episode};
pub use news::{NewsFetcher, NewsItem};
pub use pipeline::{GeneratedEpisode, PipelineEvent, PodcastPipeline};
pub use publish::{FeedPublisher, PublishReport};
pub use script::{OpenAiScriptWriter, ScriptGenerator};
pub use tts::{GeminiSpeech, SpeechAudio, SpeechSynthesizer};
pub use wav::{AudioParameters, pack, parse_audio_mime_type};
