//! Multi-speaker speech synthesis through the Gemini `generateContent` API.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::PodcastError;

/// Audio returned by a speech service, before packaging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeechAudio {
    pub data: Vec<u8>,
    /// e.g. `audio/L16;codec=pcm;rate=24000`
    pub mime_type: String,
}

impl SpeechAudio {
    /// Append one streamed chunk; the first chunk's MIME type wins.
    pub fn push_chunk(&mut self, data: &[u8], mime_type: &str) {
        self.data.extend_from_slice(data);
        if self.mime_type.is_empty() {
            self.mime_type = mime_type.to_string();
        }
    }
}

/// Anything that can voice a two-speaker script.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, script: &str) -> Result<SpeechAudio, PodcastError>;
}

/// Gemini TTS client.
pub struct GeminiSpeech {
    config: Config,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl GeminiSpeech {
    pub fn new(config: Config, api_key: impl Into<String>) -> Result<Self, PodcastError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            config,
            api_key: api_key.into(),
            client,
            max_retries: 3,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.models.tts_api_base.trim_end_matches('/'),
            self.config.models.tts_model
        )
    }

    fn build_request(&self, script: &str) -> GenerateRequest {
        let voices = &self.config.voices;
        let speaker = |speaker: &str, voice: &str| SpeakerVoiceConfig {
            speaker: speaker.to_string(),
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: voice.to_string(),
                },
            },
        };

        GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![TextPart {
                    text: format!("{}\n\n{}", self.config.prompts.speech_preamble, script),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.models.temperature,
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    multi_speaker_voice_config: MultiSpeakerVoiceConfig {
                        speaker_voice_configs: vec![
                            speaker(&voices.host_speaker, &voices.host_voice),
                            speaker(&voices.guest_speaker, &voices.guest_voice),
                        ],
                    },
                },
            },
        }
    }

    async fn request_once(&self, body: &GenerateRequest) -> Result<SpeechAudio, PodcastError> {
        let response: GenerateResponse = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        collect_audio(&response)
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiSpeech {
    async fn synthesize(&self, script: &str) -> Result<SpeechAudio, PodcastError> {
        info!("Synthesizing {} characters of script", script.len());
        let body = self.build_request(script);
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
            }

            match self.request_once(&body).await {
                Ok(audio) => {
                    debug!("Received {} bytes of {}", audio.data.len(), audio.mime_type);
                    return Ok(audio);
                }
                Err(e) => {
                    warn!(
                        "Speech request failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.max_retries,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| PodcastError::TtsError("Unknown TTS error after retries".into())))
    }
}

/// Concatenate every inline audio part of a response.
fn collect_audio(response: &GenerateResponse) -> Result<SpeechAudio, PodcastError> {
    let mut audio = SpeechAudio::default();

    let parts = response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.inline_data.as_ref());

    for inline in parts {
        let bytes = STANDARD
            .decode(&inline.data)
            .map_err(|e| PodcastError::TtsError(format!("Invalid audio payload: {}", e)))?;
        audio.push_chunk(&bytes, &inline.mime_type);
    }

    if audio.data.is_empty() {
        return Err(PodcastError::TtsError(
            "Response contained no audio data".to_string(),
        ));
    }
    Ok(audio)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_modalities: Vec<String>,
    speech_config: SpeechConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    multi_speaker_voice_config: MultiSpeakerVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MultiSpeakerVoiceConfig {
    speaker_voice_configs: Vec<SpeakerVoiceConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeakerVoiceConfig {
    speaker: String,
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}
