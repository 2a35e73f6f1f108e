//! SSE stream decoder for the Chat Completions API.
//!
//! With `"stream": true` the server sends one `data: {json}` line per
//! content delta and ends with `data: [DONE]`.  Servers in the wild also
//! send blank separators, `: keepalive` comments, `event:` lines and the
//! occasional half-written or non-JSON payload; all of that is skipped
//! without surfacing an error.  Only `choices[0].delta.content` is read.

use std::io::BufRead;

use serde_json::Value;
use tracing::trace;

use crate::error::{ClientError, Result};

/// Prefix every payload line must carry, including the space.
const DATA_PREFIX: &str = "data: ";

/// Payload that terminates the stream.
const DONE_SENTINEL: &str = "[DONE]";

// ---------------------------------------------------------------------------
// Line decoding
// ---------------------------------------------------------------------------

/// What a single SSE line amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// A non-empty content fragment to hand to the caller.
    Fragment(String),
    /// Nothing to deliver; keep reading.
    Skip,
    /// The `[DONE]` sentinel; stop reading.
    Done,
}

/// Decode one line (without its trailing newline).
pub fn decode_line(line: &str) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Skip;
    }

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return LineOutcome::Skip;
    };

    if payload == DONE_SENTINEL {
        return LineOutcome::Done;
    }

    let v: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            trace!(error = %e, "skipping undecodable SSE payload");
            return LineOutcome::Skip;
        }
    };

    match v["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => LineOutcome::Fragment(content.to_owned()),
        _ => LineOutcome::Skip,
    }
}

// ---------------------------------------------------------------------------
// Incremental decoder
// ---------------------------------------------------------------------------

/// Reassembles lines from arbitrarily split byte chunks and decodes them.
///
/// Bytes are buffered until a `\n` arrives, so a line (or a multi-byte UTF-8
/// sequence) split across network chunks is decoded only once complete.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no `\n`.
    scanned: usize,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of buffered bytes that do not yet form a complete line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a chunk of the response body, invoking `on_fragment` for every
    /// fragment completed by it, in order.
    ///
    /// Returns `true` when the stream is finished.  Input fed after that is
    /// ignored.
    pub fn feed<F>(&mut self, bytes: &[u8], on_fragment: &mut F) -> bool
    where
        F: FnMut(&str),
    {
        if self.done {
            return true;
        }

        self.buffer.extend_from_slice(bytes);

        let mut start = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = self.buffer[search_from..].iter().position(|&b| b == b'\n') {
            let end = search_from + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..end]);
            start = end + 1;
            search_from = start;

            match decode_line(&line) {
                LineOutcome::Fragment(text) => on_fragment(&text),
                LineOutcome::Skip => {}
                LineOutcome::Done => {
                    self.done = true;
                    self.buffer.clear();
                    self.scanned = 0;
                    return true;
                }
            }
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        false
    }

    /// Signal end of input.  An unterminated trailing line is discarded.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            trace!(bytes = self.buffer.len(), "discarding unterminated trailing line");
            self.buffer.clear();
        }
        self.scanned = 0;
    }
}

/// Decode a complete SSE body from a synchronous reader.
///
/// Returns once `[DONE]` is read or the reader is exhausted; nothing after
/// the sentinel is read.  I/O failures surface as
/// [`ClientError::StreamRead`].
pub fn decode_reader<R, F>(mut reader: R, mut on_fragment: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(&str),
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| ClientError::StreamRead {
                reason: e.to_string(),
            })?;

        // EOF, or a trailing line with no newline.
        if n == 0 || buf.last() != Some(&b'\n') {
            return Ok(());
        }

        let line = String::from_utf8_lossy(&buf[..n - 1]);
        match decode_line(&line) {
            LineOutcome::Fragment(text) => on_fragment(&text),
            LineOutcome::Skip => {}
            LineOutcome::Done => return Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read};

    use super::*;

    fn delta(content: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({"id": "chatcmpl-1", "choices": [{"index": 0, "delta": {"content": content}}]})
        )
    }

    fn collect(body: &str) -> Vec<String> {
        let mut out = Vec::new();
        decode_reader(Cursor::new(body.as_bytes()), |s| out.push(s.to_owned())).unwrap();
        out
    }

    #[test]
    fn content_line_yields_fragment() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"content":"Hello"}}]}"#;
        assert_eq!(decode_line(line), LineOutcome::Fragment("Hello".into()));
    }

    #[test]
    fn fragment_is_not_trimmed() {
        let line = r#"data: {"choices":[{"delta":{"content":" "}}]}"#;
        assert_eq!(decode_line(line), LineOutcome::Fragment(" ".into()));
    }

    #[test]
    fn done_sentinel_terminates() {
        assert_eq!(decode_line("data: [DONE]"), LineOutcome::Done);
        assert_eq!(decode_line("  data: [DONE]\r"), LineOutcome::Done);
    }

    #[test]
    fn done_must_match_exactly() {
        assert_eq!(decode_line("data: [DONE] extra"), LineOutcome::Skip);
        assert_eq!(decode_line("data:[DONE]"), LineOutcome::Skip);
    }

    #[test]
    fn blank_comment_and_field_lines_ignored() {
        assert_eq!(decode_line(""), LineOutcome::Skip);
        assert_eq!(decode_line("   "), LineOutcome::Skip);
        assert_eq!(decode_line(": keepalive"), LineOutcome::Skip);
        assert_eq!(decode_line("event: message"), LineOutcome::Skip);
        assert_eq!(decode_line(r#"data:{"choices":[{"delta":{"content":"x"}}]}"#), LineOutcome::Skip);
    }

    #[test]
    fn malformed_json_is_skipped() {
        assert_eq!(decode_line("data: {invalid json}"), LineOutcome::Skip);
        assert_eq!(decode_line("data: not json at all"), LineOutcome::Skip);
    }

    #[test]
    fn empty_or_missing_content_is_skipped() {
        assert_eq!(decode_line(r#"data: {"choices":[{"delta":{"content":""}}]}"#), LineOutcome::Skip);
        assert_eq!(decode_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#), LineOutcome::Skip);
        assert_eq!(decode_line(r#"data: {"choices":[{"delta":{"content":null}}]}"#), LineOutcome::Skip);
        assert_eq!(decode_line(r#"data: {"choices":[]}"#), LineOutcome::Skip);
        assert_eq!(decode_line(r#"data: {"usage":{"total_tokens":3}}"#), LineOutcome::Skip);
    }

    #[test]
    fn only_first_choice_is_consulted() {
        let line = r#"data: {"choices":[{"delta":{}},{"delta":{"content":"second"}}]}"#;
        assert_eq!(decode_line(line), LineOutcome::Skip);
    }

    #[test]
    fn fragments_arrive_in_order_and_stop_at_done() {
        let body = format!(
            "{}{}{}data: [DONE]\n{}",
            delta("Hello"),
            delta(" "),
            delta("World"),
            delta("after done")
        );
        assert_eq!(collect(&body), vec!["Hello", " ", "World"]);
    }

    #[test]
    fn noise_between_lines_does_not_change_output() {
        let clean = format!("{}{}data: [DONE]\n", delta("a"), delta("b"));
        let noisy = format!(
            ": keepalive\n\n{}event: ping\ndata: {{broken\n\n{}data: {{\"choices\":[{{\"delta\":{{\"content\":\"\"}}}}]}}\ndata: [DONE]\n",
            delta("a"),
            delta("b")
        );
        assert_eq!(collect(&clean), collect(&noisy));
    }

    #[test]
    fn missing_done_is_normal_end() {
        let body = format!("{}{}", delta("a"), delta("b"));
        assert_eq!(collect(&body), vec!["a", "b"]);
    }

    #[test]
    fn body_without_content_yields_nothing() {
        assert!(collect("data: [DONE]\n").is_empty());
        assert!(collect("").is_empty());
        assert!(collect(": only comments\n\n").is_empty());
    }

    #[test]
    fn unterminated_trailing_line_is_dropped() {
        let body = format!("{}{}", delta("kept"), delta("lost").trim_end());
        assert_eq!(collect(&body), vec!["kept"]);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let body = delta("x").replace('\n', "\r\n");
        assert_eq!(collect(&body), vec!["x"]);
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
            }
            self.served = true;
            let line = b"data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n";
            buf[..line.len()].copy_from_slice(line);
            Ok(line.len())
        }
    }

    #[test]
    fn read_error_is_fatal() {
        let reader = io::BufReader::new(FailingReader { served: false });
        let mut out = Vec::new();
        let err = decode_reader(reader, |s| out.push(s.to_owned())).unwrap_err();
        assert!(matches!(err, ClientError::StreamRead { .. }));
        assert_eq!(out, vec!["partial"]);
    }

    #[test]
    fn decoder_reassembles_split_lines() {
        let body = format!("{}{}data: [DONE]\n", delta("Hello"), delta("World"));
        let mut decoder = SseDecoder::new();
        let mut out = Vec::new();

        for chunk in body.as_bytes().chunks(7) {
            if decoder.feed(chunk, &mut |s: &str| out.push(s.to_owned())) {
                break;
            }
        }

        assert!(decoder.is_done());
        assert_eq!(out, vec!["Hello", "World"]);
    }

    #[test]
    fn decoder_keeps_multibyte_characters_intact_across_chunks() {
        let body = delta("héllo wörld 🦙");
        let mut decoder = SseDecoder::new();
        let mut out = Vec::new();

        for byte in body.as_bytes() {
            decoder.feed(std::slice::from_ref(byte), &mut |s: &str| out.push(s.to_owned()));
        }

        assert_eq!(out, vec!["héllo wörld 🦙"]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn decoder_ignores_input_after_done() {
        let mut decoder = SseDecoder::new();
        let mut out = Vec::new();
        let mut sink = |s: &str| out.push(s.to_owned());

        assert!(decoder.feed(b"data: [DONE]\n", &mut sink));
        assert!(decoder.feed(delta("late").as_bytes(), &mut sink));
        assert!(out.is_empty());
    }

    #[test]
    fn decoder_scans_only_new_bytes_of_a_long_line() {
        let long = "x".repeat(64 * 1024);
        let body = format!("{}{}", delta(&long), delta("tail"));
        let mut decoder = SseDecoder::new();
        let mut out = Vec::new();

        for chunk in body.as_bytes().chunks(16) {
            decoder.feed(chunk, &mut |s: &str| out.push(s.to_owned()));
            assert_eq!(decoder.scanned, decoder.pending());
        }

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), long.len());
        assert_eq!(out[1], "tail");
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn decoder_resumes_scan_after_a_completed_line() {
        let mut decoder = SseDecoder::new();
        let mut out = Vec::new();
        let mut sink = |s: &str| out.push(s.to_owned());

        let first = delta("one");
        let second = delta("two");
        let (head, rest) = second.split_at(10);

        decoder.feed(format!("{first}{head}").as_bytes(), &mut sink);
        assert_eq!(decoder.pending(), head.len());
        decoder.feed(rest.as_bytes(), &mut sink);
        assert_eq!(decoder.pending(), 0);
        assert_eq!(out, vec!["one", "two"]);
    }

    #[test]
    fn decoder_finish_discards_partial_line() {
        let mut decoder = SseDecoder::new();
        let mut out = Vec::new();

        decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}", &mut |s: &str| {
            out.push(s.to_owned())
        });
        assert!(decoder.pending() > 0);
        decoder.finish();
        assert_eq!(decoder.pending(), 0);
        assert!(out.is_empty());
    }
}
