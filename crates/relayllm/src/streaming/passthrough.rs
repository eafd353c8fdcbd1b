use log::{debug, warn};

use crate::apis::openai::ResponsesOutputDelta;
use crate::apis::sse::{trim_line_ending, EVENT_PREFIX};
use crate::errors::RelayError;
use crate::relay::{CancellationToken, ClientResponse, UpstreamBody};

use super::{finish_stream, forward, next_line, set_event_stream_headers, StreamOutcome};

pub const OUTPUT_TEXT_DELTA_EVENT: &str = "response.output_text.delta";
pub const COMPLETED_EVENT: &str = "response.completed";
pub const ERROR_EVENT: &str = "response.error";

const DATA_FIELD: &str = "data:";

/// Transparent relay for Azure Responses event streams.
///
/// Every upstream line, separators and `event:` lines included, reaches the
/// client byte-for-byte. Text deltas are collected on the side so usage can
/// be derived afterwards; this endpoint never reports usage in-stream.
pub struct ResponsesPassthroughDecoder {
    cancellation: Option<CancellationToken>,
}

impl Default for ResponsesPassthroughDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponsesPassthroughDecoder {
    pub fn new() -> Self {
        Self { cancellation: None }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn decode<B, C>(self, mut body: B, client: &mut C) -> Result<StreamOutcome, RelayError>
    where
        B: UpstreamBody,
        C: ClientResponse + ?Sized,
    {
        set_event_stream_headers(client);
        let decoded = self.scan(&mut body, client);
        finish_stream(&mut body, client, decoded)
    }

    fn scan<B, C>(&self, body: &mut B, client: &mut C) -> Result<StreamOutcome, RelayError>
    where
        B: UpstreamBody,
        C: ClientResponse + ?Sized,
    {
        let mut outcome = StreamOutcome::default();
        let mut buf = Vec::new();
        let mut current_event = String::new();

        while next_line(body, &mut buf, self.cancellation.as_ref(), &mut outcome) {
            forward(client, &buf)?;

            let raw = String::from_utf8_lossy(&buf);
            let line = trim_line_ending(&raw);
            if line.is_empty() {
                continue;
            }

            if let Some(name) = line.strip_prefix(EVENT_PREFIX) {
                current_event = name.trim().to_string();
                continue;
            }

            let Some(data) = line.strip_prefix(DATA_FIELD) else {
                continue;
            };
            let data = data.trim();

            match current_event.as_str() {
                OUTPUT_TEXT_DELTA_EVENT => append_delta(&mut outcome.response_text, data),
                COMPLETED_EVENT | ERROR_EVENT => {
                    debug!("responses stream finished with event {}", current_event);
                    outcome.done_seen = true;
                }
                _ => {}
            }
        }

        Ok(outcome)
    }
}

fn append_delta(response_text: &mut String, data: &str) {
    match serde_json::from_str::<ResponsesOutputDelta>(data) {
        Ok(delta) => response_text.push_str(&delta.delta),
        Err(e) => {
            warn!("non-json output_text delta, using raw payload: {}", e);
            response_text.push_str(data.trim_matches('"'));
        }
    }
}
