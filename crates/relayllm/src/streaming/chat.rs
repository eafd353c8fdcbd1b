use log::error;

use crate::apis::openai::{ChatCompletionsStreamResponse, CompletionsStreamResponse};
use crate::apis::sse::{render_data, render_done, trim_line_ending, SseLine};
use crate::apis::RelayMode;
use crate::errors::RelayError;
use crate::relay::{CancellationToken, ClientResponse, UpstreamBody};

use super::{finish_stream, forward, next_line, set_event_stream_headers, StreamOutcome};

/// Standard decoder for OpenAI-shaped SSE streams.
///
/// Forwarded lines are never re-serialized or re-encoded. Empty heartbeat chunks (no
/// choices, no usage) are dropped, and a chunk that fails to parse is still
/// forwarded so one bad event never ends the stream.
pub struct StreamDecoder {
    mode: RelayMode,
    cancellation: Option<CancellationToken>,
}

impl StreamDecoder {
    pub fn new(mode: RelayMode) -> Self {
        Self {
            mode,
            cancellation: None,
        }
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

        while next_line(body, &mut buf, self.cancellation.as_ref(), &mut outcome) {
            let raw = String::from_utf8_lossy(&buf);
            let line = trim_line_ending(&raw);

            let payload = match SseLine::classify(line) {
                SseLine::Noise => continue,
                SseLine::Done => {
                    forward(client, render_done().as_bytes())?;
                    outcome.done_seen = true;
                    continue;
                }
                SseLine::Data(payload) => payload,
            };

            match self.mode {
                RelayMode::ChatCompletions => {
                    let chunk = match serde_json::from_str::<ChatCompletionsStreamResponse>(payload) {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            error!("error unmarshalling stream response: {}", e);
                            forward(client, &render_data(&buf))?;
                            continue;
                        }
                    };
                    if chunk.is_empty_heartbeat() {
                        continue;
                    }
                    forward(client, &render_data(&buf))?;
                    for choice in &chunk.choices {
                        if let Some(content) = &choice.delta.content {
                            outcome.response_text.push_str(&content.string_content());
                        }
                    }
                    if chunk.usage.is_some() {
                        outcome.usage = chunk.usage;
                    }
                }
                RelayMode::Completions => {
                    forward(client, &render_data(&buf))?;
                    match serde_json::from_str::<CompletionsStreamResponse>(payload) {
                        Ok(chunk) => {
                            for choice in &chunk.choices {
                                outcome.response_text.push_str(&choice.text);
                            }
                        }
                        Err(e) => error!("error unmarshalling stream response: {}", e),
                    }
                }
                _ => forward(client, &render_data(&buf))?,
            }
        }

        Ok(outcome)
    }
}
