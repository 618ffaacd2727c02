//! Event-stream framing
//!
//! The launch endpoint answers with a chunked `text/event-stream` body:
//! records of the form `data: <payload>` separated by a blank line and
//! terminated by the payload `[DONE]`. Transport chunks are unrelated to
//! record boundaries, so [`StreamSession`] keeps two pieces of carry-over
//! state between chunks: undecoded bytes of a split UTF-8 sequence and the
//! text of a partial record.

/// Separator between two event records
pub const EVENT_DELIMITER: &str = "\n\n";
/// Prefix of a data line
pub const DATA_PREFIX: &str = "data: ";
/// Payload announcing that no further records will follow
pub const DONE_SENTINEL: &str = "[DONE]";

/// A decoded unit of the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// A log payload, prefix stripped
    Record(String),
    /// The completion sentinel
    Done,
}

/// Incremental UTF-8 decoder. Incomplete trailing sequences are held back
/// until the next chunk; invalid bytes become U+FFFD.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, chunk: &[u8], out: &mut String) {
        let joined;
        let mut rest: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(chunk);
            joined = buf;
            &joined
        };

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        None => {
                            // Sequence cut by the chunk boundary
                            self.pending = tail.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    /// End of input: a held-back partial sequence can never complete
    fn flush(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            self.pending.clear();
            out.push(char::REPLACEMENT_CHARACTER);
        }
    }
}

/// Decoder state for one launch's response stream
#[derive(Debug, Default)]
pub struct StreamSession {
    decoder: Utf8Decoder,
    buffer: String,
    finished: bool,
}

impl StreamSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set once the sentinel has been seen or the stream has been closed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes of an incomplete record (or character) still waiting for data
    pub fn pending_len(&self) -> usize {
        self.buffer.len() + self.decoder.pending.len()
    }

    /// Feed the next transport chunk and collect every record it completes.
    ///
    /// Nothing is produced after [`StreamFrame::Done`], neither from the
    /// rest of the same chunk nor from later ones.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        if self.finished {
            return Vec::new();
        }

        self.decoder.decode(chunk, &mut self.buffer);

        let mut frames = Vec::new();
        let mut consumed = 0;
        while let Some(pos) = self.buffer[consumed..].find(EVENT_DELIMITER) {
            let end = consumed + pos;
            let frame = parse_event(&self.buffer[consumed..end]);
            consumed = end + EVENT_DELIMITER.len();

            if let Some(frame) = frame {
                let done = frame == StreamFrame::Done;
                frames.push(frame);
                if done {
                    self.finish_now();
                    return frames;
                }
            }
        }
        self.buffer.drain(..consumed);

        frames
    }

    /// The transport has no more chunks. A non-empty trailing segment is
    /// treated as a final record even without its blank-line terminator.
    pub fn finish(&mut self) -> Vec<StreamFrame> {
        if self.finished {
            return Vec::new();
        }

        self.decoder.flush(&mut self.buffer);
        let rest = std::mem::take(&mut self.buffer);
        self.finished = true;

        if rest.is_empty() {
            return Vec::new();
        }
        tracing::debug!(bytes = rest.len(), "flushing unterminated trailing event");
        parse_event(&rest).into_iter().collect()
    }

    fn finish_now(&mut self) {
        self.finished = true;
        self.buffer.clear();
        self.decoder.pending.clear();
    }
}

/// Interpret one raw event. Events without the data prefix are framing noise
/// and are dropped.
fn parse_event(raw: &str) -> Option<StreamFrame> {
    match raw.strip_prefix(DATA_PREFIX) {
        Some(DONE_SENTINEL) => Some(StreamFrame::Done),
        Some(payload) => Some(StreamFrame::Record(payload.to_string())),
        None => {
            if !raw.is_empty() {
                tracing::debug!(
                    "discarding non-data event: {}",
                    crate::utils::truncate_str(raw, 80)
                );
            }
            None
        }
    }
}
