//! Frame reassembly for the simulation event stream
//!
//! The server writes frames of the form `data: <payload>\n\n`. Transport
//! chunks carry no alignment guarantee, so [`FrameReassembler`] keeps the
//! unconsumed tail between pushes and only emits a frame once its blank-line
//! delimiter has arrived. Buffering happens on raw bytes; a frame is decoded
//! as UTF-8 only when complete, so multi-byte characters split across chunks
//! survive.
//!
//! ```
//! use floodboard::frame::{FrameReassembler, StreamEvent};
//!
//! let mut reassembler = FrameReassembler::new();
//! assert!(reassembler.push(b"data: flow ris").is_empty());
//!
//! let frames = reassembler.push(b"ing\n\ndata: SIMULATION_COMPLETE\n\n");
//! let events: Vec<_> = frames
//!     .iter()
//!     .filter_map(|f| f.classify().unwrap())
//!     .collect();
//! assert_eq!(
//!     events,
//!     vec![StreamEvent::Log("flow rising".into()), StreamEvent::Complete]
//! );
//! ```

use crate::error::StreamError;

/// Marker every well-formed frame starts with
pub const DATA_PREFIX: &str = "data: ";

/// Payload signalling a successful run
pub const COMPLETION_SENTINEL: &str = "SIMULATION_COMPLETE";

/// Largest pending frame accepted before the stream is declared broken
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

const LF_DELIMITER: &[u8] = b"\n\n";
const CRLF_DELIMITER: &[u8] = b"\r\n\r\n";

// ─────────────────────────────────────────────────────────────────────────────
// Frame
// ─────────────────────────────────────────────────────────────────────────────

/// One complete delimited unit of the stream (delimiter excluded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    raw: Vec<u8>,
}

/// A classified frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Human-readable progress line
    Log(String),
    /// The run finished successfully
    Complete,
}

impl Frame {
    pub fn new(raw: impl Into<Vec<u8>>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Decode the frame as UTF-8
    pub fn text(&self) -> Result<&str, StreamError> {
        std::str::from_utf8(&self.raw).map_err(|e| StreamError::Decode(e.to_string()))
    }

    /// Classify the frame.
    ///
    /// `Ok(None)` means the frame is malformed (no data prefix) and must be
    /// dropped silently. `Err` is reserved for frames that are not UTF-8.
    pub fn classify(&self) -> Result<Option<StreamEvent>, StreamError> {
        let text = self.text()?;
        let Some(payload) = text.strip_prefix(DATA_PREFIX) else {
            return Ok(None);
        };
        if payload == COMPLETION_SENTINEL {
            Ok(Some(StreamEvent::Complete))
        } else {
            Ok(Some(StreamEvent::Log(payload.to_string())))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reassembler
// ─────────────────────────────────────────────────────────────────────────────

/// Append-and-drain buffer turning arbitrary chunks into frames.
///
/// Emitted frames are identical for every partition of the same byte stream.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    pending: Vec<u8>,
    /// Prefix of `pending` known to hold no delimiter start
    scanned: usize,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every frame it completes, in stream order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.pending.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut consumed = 0;
        let mut from = self.scanned;
        while let Some((start, len)) = find_delimiter(&self.pending[from..]) {
            let end = from + start;
            let mut raw = &self.pending[consumed..end];
            if let Some(stripped) = raw.strip_suffix(b"\r") {
                raw = stripped;
            }
            if !raw.is_empty() {
                frames.push(Frame::new(raw));
            }
            consumed = end + len;
            from = consumed;
        }
        self.pending.drain(..consumed);
        // A delimiter may still start in the last bytes once more arrive
        self.scanned = self
            .pending
            .len()
            .saturating_sub(CRLF_DELIMITER.len() - 1);
        frames
    }

    /// Whether the pending partial frame has outgrown [`MAX_FRAME_BYTES`]
    pub fn is_overflowing(&self) -> bool {
        self.pending.len() > MAX_FRAME_BYTES
    }

    /// Bytes received but not yet part of a complete frame
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Close the stream and resolve the remainder.
    ///
    /// The remainder is returned as a final frame only when it is a complete
    /// `data:` line that lacks just its blank-line separator; anything else is
    /// discarded.
    pub fn finish(self) -> Option<Frame> {
        let rest = self.pending;
        if !rest.starts_with(DATA_PREFIX.as_bytes()) || !rest.ends_with(b"\n") {
            if !rest.is_empty() {
                tracing::debug!(bytes = rest.len(), "Discarding incomplete trailing frame");
            }
            return None;
        }
        let end = rest
            .iter()
            .rposition(|b| *b != b'\n' && *b != b'\r')
            .map_or(0, |i| i + 1);
        Some(Frame::new(&rest[..end]))
    }
}

/// Earliest blank-line delimiter as `(offset, length)`
fn find_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buf, LF_DELIMITER).map(|i| (i, LF_DELIMITER.len()));
    let crlf = find(buf, CRLF_DELIMITER).map(|i| (i, CRLF_DELIMITER.len()));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if b.0 <= a.0 { b } else { a }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Split a fully buffered stream in one go
pub fn split_all(stream: &[u8]) -> Vec<Frame> {
    let mut reassembler = FrameReassembler::new();
    let mut frames = reassembler.push(stream);
    frames.extend(reassembler.finish());
    frames
}
