use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Upstream channel type. The set is closed: a new vendor integration is a new
/// variant plus a branch in the resolver, never a new implementation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "azure_openai", alias = "azure")]
    AzureOpenAI,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "minimax")]
    Minimax,
    #[serde(rename = "doubao")]
    Doubao,
    #[serde(rename = "novita")]
    Novita,
    #[serde(rename = "baidu_v2", alias = "baiduv2")]
    BaiduV2,
    #[serde(rename = "ali_bailian", alias = "alibailian")]
    AliBailian,
    #[serde(rename = "gemini_openai", alias = "gemini")]
    GeminiOpenAICompatible,
    #[serde(rename = "deepseek")]
    Deepseek,
    #[serde(rename = "groq")]
    Groq,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "moonshotai", alias = "moonshot")]
    Moonshotai,
    #[serde(rename = "xai")]
    XAI,
    #[serde(rename = "together_ai")]
    TogetherAI,
    #[serde(rename = "custom")]
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderId {
    type Err = UnknownProvider;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "openai" => Ok(ProviderId::OpenAI),
            "azure_openai" | "azure" => Ok(ProviderId::AzureOpenAI),
            "openrouter" => Ok(ProviderId::OpenRouter),
            "minimax" => Ok(ProviderId::Minimax),
            "doubao" => Ok(ProviderId::Doubao),
            "novita" => Ok(ProviderId::Novita),
            "baidu_v2" | "baiduv2" => Ok(ProviderId::BaiduV2),
            "ali_bailian" | "alibailian" => Ok(ProviderId::AliBailian),
            "gemini_openai" | "gemini" => Ok(ProviderId::GeminiOpenAICompatible),
            "deepseek" => Ok(ProviderId::Deepseek),
            "groq" => Ok(ProviderId::Groq),
            "mistral" => Ok(ProviderId::Mistral),
            "moonshotai" | "moonshot" => Ok(ProviderId::Moonshotai),
            "xai" => Ok(ProviderId::XAI),
            "together_ai" => Ok(ProviderId::TogetherAI),
            "custom" => Ok(ProviderId::Custom),
            _ => Err(UnknownProvider(value.to_string())),
        }
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = UnknownProvider;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl ProviderId {
    /// Map the numeric channel-type codes used by existing channel tables.
    pub fn from_channel_type(code: u32) -> Option<Self> {
        match code {
            1 => Some(ProviderId::OpenAI),
            3 => Some(ProviderId::AzureOpenAI),
            8 => Some(ProviderId::Custom),
            20 => Some(ProviderId::OpenRouter),
            25 => Some(ProviderId::Moonshotai),
            27 => Some(ProviderId::Minimax),
            28 => Some(ProviderId::Mistral),
            29 => Some(ProviderId::Groq),
            36 => Some(ProviderId::Deepseek),
            39 => Some(ProviderId::TogetherAI),
            40 => Some(ProviderId::Doubao),
            41 => Some(ProviderId::Novita),
            45 => Some(ProviderId::XAI),
            47 => Some(ProviderId::BaiduV2),
            49 => Some(ProviderId::AliBailian),
            51 => Some(ProviderId::GeminiOpenAICompatible),
            _ => None,
        }
    }

    /// Azure deployments authenticate with `api-key` instead of a bearer token.
    pub fn uses_api_key_header(&self) -> bool {
        matches!(self, ProviderId::AzureOpenAI)
    }

    pub fn sends_attribution_headers(&self) -> bool {
        matches!(self, ProviderId::OpenRouter)
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderId::OpenAI => write!(f, "openai"),
            ProviderId::AzureOpenAI => write!(f, "azure_openai"),
            ProviderId::OpenRouter => write!(f, "openrouter"),
            ProviderId::Minimax => write!(f, "minimax"),
            ProviderId::Doubao => write!(f, "doubao"),
            ProviderId::Novita => write!(f, "novita"),
            ProviderId::BaiduV2 => write!(f, "baidu_v2"),
            ProviderId::AliBailian => write!(f, "ali_bailian"),
            ProviderId::GeminiOpenAICompatible => write!(f, "gemini_openai"),
            ProviderId::Deepseek => write!(f, "deepseek"),
            ProviderId::Groq => write!(f, "groq"),
            ProviderId::Mistral => write!(f, "mistral"),
            ProviderId::Moonshotai => write!(f, "moonshotai"),
            ProviderId::XAI => write!(f, "xai"),
            ProviderId::TogetherAI => write!(f, "together_ai"),
            ProviderId::Custom => write!(f, "custom"),
        }
    }
}
