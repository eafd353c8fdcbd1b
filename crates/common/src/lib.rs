pub mod configuration;
pub mod llm_providers;
pub mod tokenizer;
