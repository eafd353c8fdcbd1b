//! Streaming decoders: read the upstream SSE body line by line, forward to the
//! client as each line is handled, and accumulate text and usage for billing.
//!
//! Both decoders share the same shape: one blocking read per line, no
//! buffering ahead of the client, and a single exit path that synthesizes the
//! terminal marker when upstream never sent one and closes the body once.

pub mod chat;
pub mod passthrough;

pub use chat::StreamDecoder;
pub use passthrough::ResponsesPassthroughDecoder;

use http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE, TRANSFER_ENCODING};
use http::{HeaderName, HeaderValue};
use log::error;
use std::io::BufRead;

use crate::apis::openai::Usage;
use crate::apis::sse::render_done;
use crate::errors::RelayError;
use crate::relay::{CancellationToken, ClientResponse, UpstreamBody};

/// What a decode pass produced. `usage` is `None` when the provider never
/// reported it; callers then derive it from `response_text`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamOutcome {
    pub response_text: String,
    pub usage: Option<Usage>,
    pub done_seen: bool,
    /// The client went away and decoding stopped early.
    pub cancelled: bool,
}

pub fn set_event_stream_headers<C: ClientResponse + ?Sized>(client: &mut C) {
    client.set_header(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    client.set_header(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    client.set_header(CONNECTION, HeaderValue::from_static("keep-alive"));
    client.set_header(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
    client.set_header(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
}

/// Write and flush one unit to the client.
pub(crate) fn forward<C: ClientResponse + ?Sized>(
    client: &mut C,
    bytes: &[u8],
) -> Result<(), RelayError> {
    client.write_all(bytes).map_err(RelayError::ClientWrite)?;
    client.flush().map_err(RelayError::ClientWrite)
}

/// Read the next raw line (terminator included) into `buf`.
///
/// Returns `false` at end of input, on cancellation, or when the upstream
/// read fails; a read failure ends the stream without failing the decode.
pub(crate) fn next_line<B: BufRead + ?Sized>(
    body: &mut B,
    buf: &mut Vec<u8>,
    cancellation: Option<&CancellationToken>,
    outcome: &mut StreamOutcome,
) -> bool {
    if cancellation.is_some_and(CancellationToken::is_cancelled) {
        outcome.cancelled = true;
        return false;
    }
    buf.clear();
    match body.read_until(b'\n', buf) {
        Ok(0) => false,
        Ok(_) => true,
        Err(e) => {
            error!("error reading stream: {}", e);
            false
        }
    }
}

/// Single exit path of every decoder.
pub(crate) fn finish_stream<B, C>(
    body: &mut B,
    client: &mut C,
    decoded: Result<StreamOutcome, RelayError>,
) -> Result<StreamOutcome, RelayError>
where
    B: UpstreamBody + ?Sized,
    C: ClientResponse + ?Sized,
{
    let decoded = decoded.and_then(|outcome| {
        if !outcome.done_seen && !outcome.cancelled {
            forward(client, render_done().as_bytes())?;
        }
        Ok(outcome)
    });

    let closed = body.close();
    match (decoded, closed) {
        (Ok(outcome), Ok(())) => Ok(outcome),
        (Ok(_), Err(e)) => Err(RelayError::CloseBody(e)),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            error!("failed to close upstream body after decode error: {}", close_err);
            Err(err)
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::relay::{ClientResponse, UpstreamBody};
    use http::{HeaderName, HeaderValue, StatusCode};
    use std::io::{self, BufRead, Cursor, Read};
    use std::rc::Rc;
    use std::cell::Cell;

    /// In-memory body that records how often it was closed.
    pub struct TrackedBody {
        inner: Cursor<Vec<u8>>,
        pub closes: Rc<Cell<usize>>,
        fail_close: bool,
    }

    impl TrackedBody {
        pub fn new(data: &str) -> Self {
            Self {
                inner: Cursor::new(data.as_bytes().to_vec()),
                closes: Rc::new(Cell::new(0)),
                fail_close: false,
            }
        }

        pub fn failing_close(data: &str) -> Self {
            Self {
                fail_close: true,
                ..Self::new(data)
            }
        }
    }

    impl Read for TrackedBody {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl BufRead for TrackedBody {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            self.inner.fill_buf()
        }

        fn consume(&mut self, amt: usize) {
            self.inner.consume(amt)
        }
    }

    impl UpstreamBody for TrackedBody {
        fn close(&mut self) -> io::Result<()> {
            self.closes.set(self.closes.get() + 1);
            if self.fail_close {
                return Err(io::Error::other("connection reset"));
            }
            Ok(())
        }
    }

    /// Client whose writes fail after `budget` successful writes.
    pub struct FailingClient {
        pub budget: usize,
        pub written: Vec<u8>,
    }

    impl ClientResponse for FailingClient {
        fn set_header(&mut self, _name: HeaderName, _value: HeaderValue) {}

        fn write_status(&mut self, _status: StatusCode) {}

        fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "client gone"));
            }
            self.budget -= 1;
            self.written.extend_from_slice(bytes);
            Ok(())
        }
    }
}
