//! Incremental parser for server-sent-event frames. The provider streams
//! `data: {...}` lines whose chunk boundaries fall anywhere, including
//! mid-JSON, so the parser buffers until each newline.

use serde::Deserialize;

/// Terminal payload of a chat-completions stream.
pub const DONE_PAYLOAD: &str = "[DONE]";

/// Accumulates raw network bytes and yields complete `data:` payloads.
/// A partial trailing line is held until the next chunk and never emitted
/// on its own. The buffer is kept as bytes and only complete lines are
/// decoded, so a multi-byte character split across reads survives intact.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk, returning the payloads it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            payloads.push(data.trim_start().to_string());
        }
        payloads
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the content delta from one payload. Empty deltas yield `None`;
/// unparseable payloads are logged at debug level and skipped, never fatal.
pub fn parse_content_delta(payload: &str) -> Option<String> {
    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty()),
        Err(err) => {
            tracing::debug!("skipping unparseable stream payload: {}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut parser = SseParser::new();
        let payloads = parser.push(b"data: {\"x\":1}\n\n");
        assert_eq!(payloads, vec![r#"{"x":1}"#]);
    }

    #[test]
    fn test_multiple_events_in_one_chunk() {
        let mut parser = SseParser::new();
        let payloads = parser.push(b"data: a\ndata: b\n");
        assert_eq!(payloads, vec!["a", "b"]);
    }

    #[test]
    fn test_reassembles_line_split_mid_json() {
        let mut parser = SseParser::new();
        let first = parser.push(br#"data: {"choices":[{"delta":{"content":"Hel"#);
        assert!(first.is_empty());

        let second = parser.push(b"lo\"}}]}\n\ndata: [DONE]\n\n");
        assert_eq!(
            second,
            vec![
                r#"{"choices":[{"delta":{"content":"Hello"}}]}"#,
                DONE_PAYLOAD
            ]
        );
        assert_eq!(
            parse_content_delta(&second[0]).as_deref(),
            Some("Hello")
        );
    }

    #[test]
    fn test_reassembles_character_split_across_reads() {
        let raw = "data: {\"choices\":[{\"delta\":{\"content\":\"概要\"}}]}\n\n".as_bytes();
        // Split inside the three-byte encoding of 概 so the first read
        // ends with a partial character.
        let split = raw.iter().position(|&b| b == 0xe6).unwrap() + 1;

        let mut parser = SseParser::new();
        assert!(parser.push(&raw[..split]).is_empty());

        let payloads = parser.push(&raw[split..]);
        assert_eq!(parse_content_delta(&payloads[0]).as_deref(), Some("概要"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut parser = SseParser::new();
        let payloads = parser.push(b"data: {\"x\":1}\r\n");
        assert_eq!(payloads, vec![r#"{"x":1}"#]);
    }

    #[test]
    fn test_data_without_space() {
        let mut parser = SseParser::new();
        let payloads = parser.push(b"data:[DONE]\n");
        assert_eq!(payloads, vec![DONE_PAYLOAD]);
    }

    #[test]
    fn test_ignores_non_data_lines() {
        let mut parser = SseParser::new();
        let payloads = parser.push(b"event: ping\n: keep-alive\n\ndata: x\n");
        assert_eq!(payloads, vec!["x"]);
    }

    #[test]
    fn test_trailing_partial_is_never_emitted() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"data: {\"choices\"").is_empty());
        assert!(parser.push(b"").is_empty());
    }

    #[test]
    fn test_arbitrary_chunking_preserves_content() {
        let raw = "data: {\"choices\":[{\"delta\":{\"content\":\"foo\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"概要\"}}]}\n\ndata: [DONE]\n\n".as_bytes();
        for chunk_size in [1, 2, 3, 7, 64, raw.len()] {
            let mut parser = SseParser::new();
            let mut content = String::new();
            for chunk in raw.chunks(chunk_size) {
                for payload in parser.push(chunk) {
                    if payload == DONE_PAYLOAD {
                        continue;
                    }
                    if let Some(delta) = parse_content_delta(&payload) {
                        content.push_str(&delta);
                    }
                }
            }
            assert_eq!(content, "foo概要");
        }
    }

    #[test]
    fn test_parse_content_delta_rejects_garbage() {
        assert_eq!(parse_content_delta("{not json"), None);
    }

    #[test]
    fn test_parse_content_delta_handles_empty_choices() {
        assert_eq!(parse_content_delta(r#"{"choices":[]}"#), None);
        assert_eq!(parse_content_delta(r#"{"choices":[{"delta":{}}]}"#), None);
    }

    #[test]
    fn test_parse_content_delta_skips_empty_content() {
        assert_eq!(
            parse_content_delta(r#"{"choices":[{"delta":{"content":""}}]}"#),
            None
        );
    }
}
