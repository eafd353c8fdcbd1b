use crate::configuration::LlmProvider;
use relayllm::RouteMeta;
use std::collections::HashMap;
use std::sync::Arc;

/// Configured upstream channels, looked up by name.
#[derive(Debug)]
pub struct LlmProviders {
    providers: HashMap<String, Arc<LlmProvider>>,
}

impl LlmProviders {
    pub fn iter(&self) -> std::collections::hash_map::Iter<'_, String, Arc<LlmProvider>> {
        self.providers.iter()
    }

    pub fn get(&self, name: &str) -> Option<Arc<LlmProvider>> {
        self.providers.get(name).cloned()
    }

    /// Routing metadata for a request sent to provider `name`.
    pub fn route_meta(
        &self,
        name: &str,
        request_path: &str,
        stream: bool,
        prompt_tokens: usize,
    ) -> Option<RouteMeta> {
        let provider = self.providers.get(name)?;
        let mut meta = RouteMeta::new(
            provider.provider_interface,
            provider.base_url.as_deref().unwrap_or_default(),
            request_path,
        )
        .with_api_key(provider.access_key.as_deref().unwrap_or_default())
        .with_model(provider.model.as_deref().unwrap_or(&provider.name))
        .with_stream(stream)
        .with_prompt_tokens(prompt_tokens);
        if let Some(api_version) = &provider.api_version {
            meta = meta.with_api_version(api_version);
        }
        Some(meta)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LlmProvidersNewError {
    #[error("There must be at least one LLM Provider")]
    EmptySource,
    #[error("\'{0}\' is not a unique name")]
    DuplicateName(String),
}

impl TryFrom<Vec<LlmProvider>> for LlmProviders {
    type Error = LlmProvidersNewError;

    fn try_from(llm_providers_config: Vec<LlmProvider>) -> Result<Self, Self::Error> {
        if llm_providers_config.is_empty() {
            return Err(LlmProvidersNewError::EmptySource);
        }

        let mut providers = HashMap::new();
        for llm_provider in llm_providers_config {
            let name = llm_provider.name.clone();
            if providers.insert(name.clone(), Arc::new(llm_provider)).is_some() {
                return Err(LlmProvidersNewError::DuplicateName(name));
            }
        }

        Ok(LlmProviders { providers })
    }
}
