//! Token accounting and the tokenizer fallback used when a provider omits or
//! misreports usage.

use log::debug;

use crate::apis::openai::{TextResponseChoice, Usage};
use crate::relay::RouteMeta;

/// Model-aware token counter. Implemented by the tokenizer service the
/// gateway runs with; any `Fn(&str, &str) -> usize` also works.
pub trait Tokenizer {
    fn count_tokens(&self, model: &str, text: &str) -> usize;
}

impl<F> Tokenizer for F
where
    F: Fn(&str, &str) -> usize,
{
    fn count_tokens(&self, model: &str, text: &str) -> usize {
        self(model, text)
    }
}

/// Usage derived entirely from the generated text.
pub fn response_text_to_usage(
    tokenizer: &dyn Tokenizer,
    response_text: &str,
    model: &str,
    prompt_tokens: usize,
) -> Usage {
    let completion_tokens = tokenizer.count_tokens(model, response_text);
    Usage::new(prompt_tokens, completion_tokens)
}

/// Whether a non-stream envelope's usage must be recomputed.
pub fn needs_fallback(usage: &Usage) -> bool {
    usage.total_tokens == 0 || (usage.prompt_tokens == 0 && usage.completion_tokens == 0)
}

/// Sum of tokens across every choice's textual content.
pub fn count_choice_tokens(
    tokenizer: &dyn Tokenizer,
    choices: &[TextResponseChoice],
    model: &str,
) -> usize {
    choices
        .iter()
        .map(|choice| tokenizer.count_tokens(model, &choice.message.string_content()))
        .sum()
}

/// Final usage for a streamed response.
///
/// Missing or zero-total usage is derived from the accumulated text. Some
/// channels report only a total; the prompt share is then taken from the
/// route and the remainder attributed to the completion.
pub fn finalize_stream_usage(
    tokenizer: &dyn Tokenizer,
    usage: Option<Usage>,
    response_text: &str,
    meta: &RouteMeta,
) -> Usage {
    let mut usage = match usage {
        Some(usage) if usage.total_tokens != 0 => usage,
        _ => response_text_to_usage(
            tokenizer,
            response_text,
            &meta.actual_model_name,
            meta.prompt_tokens,
        ),
    };

    if usage.total_tokens != 0 && usage.prompt_tokens == 0 {
        debug!(
            "stream usage reported total={} without prompt tokens, using route prompt_tokens={}",
            usage.total_tokens, meta.prompt_tokens
        );
        usage.prompt_tokens = meta.prompt_tokens;
        usage.completion_tokens = usage.total_tokens.saturating_sub(meta.prompt_tokens);
    }
    usage
}
