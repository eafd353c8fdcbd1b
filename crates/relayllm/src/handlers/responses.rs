use log::debug;
use serde_json::{Map, Value};

use crate::apis::openai::Usage;
use crate::errors::RelayError;
use crate::relay::{ClientResponse, UpstreamBody, UpstreamResponse};
use crate::usage::{response_text_to_usage, Tokenizer};

use super::{read_and_close, replay};

const OUTPUT_TEXT_FIELD: &str = "output_text";

/// Azure Responses non-stream decoder. The body is relayed as-is and usage is
/// always counted from `output_text`, since this endpoint reports none.
pub fn responses_handler<B, C>(
    response: UpstreamResponse<B>,
    client: &mut C,
    tokenizer: &dyn Tokenizer,
    model: &str,
    prompt_tokens: usize,
) -> Result<Usage, RelayError>
where
    B: UpstreamBody,
    C: ClientResponse + ?Sized,
{
    let UpstreamResponse {
        status,
        headers,
        mut body,
    } = response;
    debug!("upstream responded with status {}", status);

    let bytes = read_and_close(&mut body)?;
    let output_text = extract_output_text(&bytes);

    replay(client, status, &headers, &bytes)?;

    Ok(response_text_to_usage(
        tokenizer,
        &output_text,
        model,
        prompt_tokens,
    ))
}

/// Top-level `output_text` of a JSON object body; non-string values are
/// counted in their JSON form. A body that is not a JSON object is the text.
fn extract_output_text(bytes: &[u8]) -> String {
    match serde_json::from_slice::<Map<String, Value>>(bytes) {
        Ok(object) => match object.get(OUTPUT_TEXT_FIELD) {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        },
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}
