//! Outbound URL resolution per provider.
//!
//! # Examples
//!
//! ```rust
//! use relayllm::clients::endpoints::resolve_url;
//! use relayllm::{ProviderId, RouteMeta};
//!
//! let meta = RouteMeta::new(
//!     ProviderId::AzureOpenAI,
//!     "https://example.openai.azure.com",
//!     "/v1/chat/completions",
//! )
//! .with_model("gpt-4.1")
//! .with_api_version("2024-10-21");
//!
//! assert_eq!(
//!     resolve_url(&meta).unwrap(),
//!     "https://example.openai.azure.com/openai/deployments/gpt-4.1/chat/completions?api-version=2024-10-21"
//! );
//! ```

use crate::apis::RelayMode;
use crate::errors::RelayError;
use crate::providers::ProviderId;
use crate::relay::RouteMeta;

const CLOUDFLARE_GATEWAY_PREFIX: &str = "https://gateway.ai.cloudflare.com";

/// Compute the outbound URL for `meta`.
pub fn resolve_url(meta: &RouteMeta) -> Result<String, RelayError> {
    if meta.provider == ProviderId::AzureOpenAI {
        return Ok(azure_request_url(meta));
    }
    match strategy_for(meta.provider) {
        Some(strategy) => strategy.request_url(meta),
        None => Ok(full_request_url(
            &meta.base_url,
            &meta.request_url_path,
            meta.provider,
        )),
    }
}

/// Join base URL and request path, applying Cloudflare AI Gateway rewrites.
pub fn full_request_url(base_url: &str, request_path: &str, provider: ProviderId) -> String {
    if base_url.starts_with(CLOUDFLARE_GATEWAY_PREFIX) {
        match provider {
            ProviderId::OpenAI => {
                return format!(
                    "{}{}",
                    base_url,
                    request_path.strip_prefix("/v1").unwrap_or(request_path)
                );
            }
            ProviderId::AzureOpenAI => {
                return format!(
                    "{}{}",
                    base_url,
                    request_path
                        .strip_prefix("/openai/deployments")
                        .unwrap_or(request_path)
                );
            }
            _ => {}
        }
    }
    format!("{}{}", base_url, request_path)
}

/// Deployment-style URL. The model name is used verbatim so custom deployment
/// aliases (e.g. `gpt-4.1`) keep working.
fn azure_request_url(meta: &RouteMeta) -> String {
    let api_version = meta.config.api_version();
    if meta.mode == RelayMode::ImagesGenerations {
        return format!(
            "{}/openai/deployments/{}/images/generations?api-version={}",
            meta.base_url, meta.actual_model_name, api_version
        );
    }

    let path = meta
        .request_url_path
        .split('?')
        .next()
        .unwrap_or_default();
    let task = path.strip_prefix("/v1/").unwrap_or(path);
    let request_path = format!(
        "/openai/deployments/{}/{}?api-version={}",
        meta.actual_model_name, task, api_version
    );
    full_request_url(&meta.base_url, &request_path, meta.provider)
}

// ============================================================================
// PER-FAMILY STRATEGIES
// ============================================================================

/// URL construction owned by one provider family.
pub trait UrlStrategy: Sync {
    fn name(&self) -> &'static str;

    fn request_url(&self, meta: &RouteMeta) -> Result<String, RelayError>;
}

pub fn strategy_for(provider: ProviderId) -> Option<&'static dyn UrlStrategy> {
    match provider {
        ProviderId::Minimax => Some(&MinimaxStrategy),
        ProviderId::Doubao => Some(&DoubaoStrategy),
        ProviderId::Novita => Some(&NovitaStrategy),
        ProviderId::BaiduV2 => Some(&BaiduV2Strategy),
        ProviderId::AliBailian => Some(&AliBailianStrategy),
        ProviderId::GeminiOpenAICompatible => Some(&GeminiOpenAIStrategy),
        _ => None,
    }
}

fn validated_base(meta: &RouteMeta) -> Result<&str, RelayError> {
    url::Url::parse(&meta.base_url).map_err(|source| RelayError::InvalidBaseUrl {
        base_url: meta.base_url.clone(),
        source,
    })?;
    Ok(meta.base_url.as_str())
}

fn unsupported(meta: &RouteMeta) -> RelayError {
    RelayError::UnsupportedMode {
        provider: meta.provider,
        mode: meta.mode,
    }
}

pub struct MinimaxStrategy;

impl UrlStrategy for MinimaxStrategy {
    fn name(&self) -> &'static str {
        "minimax"
    }

    fn request_url(&self, meta: &RouteMeta) -> Result<String, RelayError> {
        let base = validated_base(meta)?;
        match meta.mode {
            RelayMode::ChatCompletions => Ok(format!("{}/v1/text/chatcompletion_v2", base)),
            _ => Err(unsupported(meta)),
        }
    }
}

pub struct DoubaoStrategy;

impl UrlStrategy for DoubaoStrategy {
    fn name(&self) -> &'static str {
        "doubao"
    }

    fn request_url(&self, meta: &RouteMeta) -> Result<String, RelayError> {
        let base = validated_base(meta)?;
        match meta.mode {
            // bot-* models are agent endpoints
            RelayMode::ChatCompletions if meta.actual_model_name.starts_with("bot") => {
                Ok(format!("{}/api/v3/bots/chat/completions", base))
            }
            RelayMode::ChatCompletions => Ok(format!("{}/api/v3/chat/completions", base)),
            RelayMode::Embeddings => Ok(format!("{}/api/v3/embeddings", base)),
            _ => Err(unsupported(meta)),
        }
    }
}

pub struct NovitaStrategy;

impl UrlStrategy for NovitaStrategy {
    fn name(&self) -> &'static str {
        "novita"
    }

    fn request_url(&self, meta: &RouteMeta) -> Result<String, RelayError> {
        let base = validated_base(meta)?;
        let path = meta
            .request_url_path
            .strip_prefix("/v1")
            .unwrap_or(&meta.request_url_path);
        Ok(full_request_url(
            &format!("{}/v3/openai", base),
            path,
            meta.provider,
        ))
    }
}

pub struct BaiduV2Strategy;

impl UrlStrategy for BaiduV2Strategy {
    fn name(&self) -> &'static str {
        "baidu_v2"
    }

    fn request_url(&self, meta: &RouteMeta) -> Result<String, RelayError> {
        let base = validated_base(meta)?;
        match meta.mode {
            RelayMode::ChatCompletions => Ok(format!("{}/v2/chat/completions", base)),
            _ => Err(unsupported(meta)),
        }
    }
}

pub struct AliBailianStrategy;

impl UrlStrategy for AliBailianStrategy {
    fn name(&self) -> &'static str {
        "ali_bailian"
    }

    fn request_url(&self, meta: &RouteMeta) -> Result<String, RelayError> {
        let base = validated_base(meta)?;
        match meta.mode {
            RelayMode::ChatCompletions => {
                Ok(format!("{}/compatible-mode/v1/chat/completions", base))
            }
            RelayMode::Embeddings => Ok(format!("{}/compatible-mode/v1/embeddings", base)),
            _ => Err(unsupported(meta)),
        }
    }
}

pub struct GeminiOpenAIStrategy;

impl UrlStrategy for GeminiOpenAIStrategy {
    fn name(&self) -> &'static str {
        "gemini_openai"
    }

    fn request_url(&self, meta: &RouteMeta) -> Result<String, RelayError> {
        let base = validated_base(meta)?;
        let path = meta
            .request_url_path
            .strip_prefix("/v1")
            .unwrap_or(&meta.request_url_path);
        Ok(full_request_url(
            &format!("{}/v1beta/openai", base),
            path,
            meta.provider,
        ))
    }
}
