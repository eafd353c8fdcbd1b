use relayllm::clients::AttributionHeaders;
use relayllm::{AdaptorConfig, ProviderId, QuirkConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("model provider at index {0} has an empty name")]
    EmptyName(usize),
    #[error("\'{0}\' is not a unique name")]
    DuplicateName(String),
    #[error("model provider \'{0}\' has no base_url")]
    MissingBaseUrl(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub version: String,
    pub model_providers: Vec<LlmProvider>,
    pub quirks: Option<QuirkConfig>,
    pub attribution: Option<AttributionHeaders>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmProvider {
    pub name: String,
    pub provider_interface: ProviderId,
    pub base_url: Option<String>,
    pub access_key: Option<String>,
    /// Upstream model or deployment name; defaults to the provider name.
    pub model: Option<String>,
    pub api_version: Option<String>,
}

impl Configuration {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Configuration = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for (index, provider) in self.model_providers.iter().enumerate() {
            if provider.name.trim().is_empty() {
                return Err(ConfigError::EmptyName(index));
            }
            if !names.insert(provider.name.as_str()) {
                return Err(ConfigError::DuplicateName(provider.name.clone()));
            }
            if provider.base_url.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::MissingBaseUrl(provider.name.clone()));
            }
        }
        Ok(())
    }

    pub fn adaptor_config(&self) -> AdaptorConfig {
        AdaptorConfig {
            quirks: self.quirks.clone().unwrap_or_default(),
            attribution: self.attribution.clone().unwrap_or_default(),
        }
    }
}
