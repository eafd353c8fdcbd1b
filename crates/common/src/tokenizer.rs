use log::{debug, error};
use relayllm::Tokenizer;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tiktoken_rs::{cl100k_base, get_bpe_from_model, CoreBPE};

/// Model-aware BPE token counter. Models tiktoken does not know share a single
/// `cl100k_base` encoder. Encoders are built at most once per model name.
#[derive(Default)]
pub struct TiktokenTokenizer {
    encoders: Mutex<HashMap<String, Arc<CoreBPE>>>,
    fallback: OnceLock<Option<Arc<CoreBPE>>>,
}

impl TiktokenTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, Arc<CoreBPE>>> {
        self.encoders.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fallback(&self) -> Option<Arc<CoreBPE>> {
        self.fallback
            .get_or_init(|| match cl100k_base() {
                Ok(bpe) => Some(Arc::new(bpe)),
                Err(e) => {
                    error!("failed to load cl100k_base: {}", e);
                    None
                }
            })
            .clone()
    }

    fn encoder(&self, model: &str) -> Option<Arc<CoreBPE>> {
        let cached = self.cache().get(model).cloned();
        if cached.is_some() {
            return cached;
        }

        // built outside the cache lock; the first insert for a model wins
        let bpe = match get_bpe_from_model(model) {
            Ok(bpe) => Arc::new(bpe),
            Err(_) => {
                debug!("no tokenizer for model {}, using cl100k_base", model);
                self.fallback()?
            }
        };
        Some(self.cache().entry(model.to_string()).or_insert(bpe).clone())
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn count_tokens(&self, model: &str, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match self.encoder(model) {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => 0,
        }
    }
}
