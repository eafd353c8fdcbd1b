pub mod openai;
pub mod sse;

pub use openai::{
    ChatCompletionsRequest, ChatCompletionsStreamResponse, CompletionsStreamResponse,
    ImageRequest, Message, MessageContent, OpenAIError, StreamOptions, TextResponse, Usage,
};
pub use sse::{SseLine, DATA_PREFIX, DONE};

use std::fmt;

/// What kind of request the client made, derived from the inbound path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayMode {
    Unknown,
    ChatCompletions,
    Completions,
    Embeddings,
    Moderations,
    ImagesGenerations,
    Edits,
    AudioSpeech,
    AudioTranscription,
    AudioTranslation,
    Responses,
}

impl RelayMode {
    pub fn from_path(path: &str) -> Self {
        if path.starts_with("/v1/chat/completions") {
            RelayMode::ChatCompletions
        } else if path.starts_with("/v1/completions") {
            RelayMode::Completions
        } else if path.starts_with("/v1/embeddings") || path.ends_with("embeddings") {
            // engine-style paths: /v1/engines/{model}/embeddings
            RelayMode::Embeddings
        } else if path.starts_with("/v1/moderations") {
            RelayMode::Moderations
        } else if path.starts_with("/v1/images/generations") {
            RelayMode::ImagesGenerations
        } else if path.starts_with("/v1/edits") {
            RelayMode::Edits
        } else if path.starts_with("/v1/audio/speech") {
            RelayMode::AudioSpeech
        } else if path.starts_with("/v1/audio/transcriptions") {
            RelayMode::AudioTranscription
        } else if path.starts_with("/v1/audio/translations") {
            RelayMode::AudioTranslation
        } else if path.starts_with("/v1/responses") {
            RelayMode::Responses
        } else {
            RelayMode::Unknown
        }
    }
}

impl fmt::Display for RelayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayMode::Unknown => "unknown",
            RelayMode::ChatCompletions => "chat_completions",
            RelayMode::Completions => "completions",
            RelayMode::Embeddings => "embeddings",
            RelayMode::Moderations => "moderations",
            RelayMode::ImagesGenerations => "images_generations",
            RelayMode::Edits => "edits",
            RelayMode::AudioSpeech => "audio_speech",
            RelayMode::AudioTranscription => "audio_transcription",
            RelayMode::AudioTranslation => "audio_translation",
            RelayMode::Responses => "responses",
        };
        write!(f, "{}", name)
    }
}
