// ============================================================================
// SSE LINE CLASSIFICATION
// ============================================================================

pub const DATA_PREFIX: &str = "data: ";
pub const EVENT_PREFIX: &str = "event:";
pub const DONE: &str = "[DONE]";

/// Classification of one upstream SSE line for the standard decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// The `[DONE]` terminal marker, with or without the `data: ` prefix.
    Done,
    /// Payload after `data: `.
    Data(&'a str),
    /// Blank lines, keepalive comments, `event:` lines and anything malformed.
    Noise,
}

impl<'a> SseLine<'a> {
    pub fn classify(line: &'a str) -> Self {
        if line.len() < DATA_PREFIX.len() {
            return SseLine::Noise;
        }
        if line == DONE {
            return SseLine::Done;
        }
        match line.strip_prefix(DATA_PREFIX) {
            Some(payload) if payload.starts_with(DONE) => SseLine::Done,
            Some(payload) => SseLine::Data(payload),
            None => SseLine::Noise,
        }
    }
}

/// Client wire form of one forwarded data line: the upstream bytes with the
/// line terminator replaced by the event separator.
pub fn render_data(line: &[u8]) -> Vec<u8> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let mut rendered = Vec::with_capacity(line.len() + 2);
    rendered.extend_from_slice(line);
    rendered.extend_from_slice(b"\n\n");
    rendered
}

pub fn render_done() -> String {
    format!("{}{}\n\n", DATA_PREFIX, DONE)
}

/// Strip the line terminator left by `BufRead::read_line` (`\n` or `\r\n`).
pub fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
