//! Incremental decoder for a JSON array delivered in arbitrary byte chunks.
//!
//! `streamGenerateContent` without `alt=sse` answers with one JSON array whose
//! elements arrive over time. The decoder tracks nesting depth and string
//! state byte by byte and hands back each top-level element as soon as its
//! closing bracket is seen. A bare top-level object (no surrounding array) is
//! accepted as a single element.

use crate::{ProviderError, ProviderResult};
use serde_json::Value;

/// Streaming decoder for `[elem, elem, ...]`.
#[derive(Debug, Default)]
pub struct JsonArrayDecoder {
    /// Bytes of the element currently being read.
    buf: Vec<u8>,
    /// Bracket depth inside the current element.
    depth: usize,
    in_string: bool,
    escape: bool,
    /// Saw the opening `[` (or the start of a bare object).
    opened: bool,
    /// Saw the closing `]` (or the end of a bare object).
    closed: bool,
    /// Top level is a single object rather than an array.
    bare: bool,
}

impl JsonArrayDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk, returning every element completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> ProviderResult<Vec<Value>> {
        let mut out = Vec::new();

        for &byte in chunk {
            if self.depth > 0 {
                self.buf.push(byte);
                if self.in_string {
                    if self.escape {
                        self.escape = false;
                    } else if byte == b'\\' {
                        self.escape = true;
                    } else if byte == b'"' {
                        self.in_string = false;
                    }
                    continue;
                }
                match byte {
                    b'"' => self.in_string = true,
                    b'{' | b'[' => self.depth += 1,
                    b'}' | b']' => {
                        self.depth -= 1;
                        if self.depth == 0 {
                            out.push(serde_json::from_slice(&self.buf)?);
                            self.buf.clear();
                            if self.bare {
                                self.closed = true;
                            }
                        }
                    }
                    _ => {}
                }
                continue;
            }

            if byte.is_ascii_whitespace() {
                continue;
            }

            if self.closed {
                return Err(ProviderError::invalid_response(
                    "unexpected data after the end of the response array",
                ));
            }

            if !self.opened {
                match byte {
                    b'[' => self.opened = true,
                    b'{' => {
                        self.opened = true;
                        self.bare = true;
                        self.start_element(byte);
                    }
                    other => {
                        return Err(ProviderError::invalid_response(format!(
                            "expected a JSON array, found '{}'",
                            other as char
                        )));
                    }
                }
                continue;
            }

            match byte {
                b',' => {}
                b']' => self.closed = true,
                b'{' | b'[' => self.start_element(byte),
                other => {
                    return Err(ProviderError::invalid_response(format!(
                        "unexpected '{}' between array elements",
                        other as char
                    )));
                }
            }
        }

        Ok(out)
    }

    /// Check that the input ended on a complete array.
    pub fn finish(&self) -> ProviderResult<()> {
        if !self.opened {
            return Err(ProviderError::invalid_response("empty response body"));
        }
        if self.depth > 0 {
            return Err(ProviderError::stream_interrupted(
                "response ended inside an array element",
            ));
        }
        if !self.closed {
            return Err(ProviderError::stream_interrupted(
                "response ended before the array was closed",
            ));
        }
        Ok(())
    }

    fn start_element(&mut self, byte: u8) {
        self.buf.clear();
        self.buf.push(byte);
        self.depth = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_in_chunks(input: &str, chunk_size: usize) -> Vec<Value> {
        let mut decoder = JsonArrayDecoder::new();
        let mut values = Vec::new();
        for chunk in input.as_bytes().chunks(chunk_size) {
            values.extend(decoder.feed(chunk).unwrap());
        }
        decoder.finish().unwrap();
        values
    }

    #[test]
    fn test_single_chunk() {
        let values = decode_in_chunks(r#"[{"a":1},{"b":2}]"#, 1024);
        assert_eq!(values, vec![json!({"a":1}), json!({"b":2})]);
    }

    #[test]
    fn test_split_at_every_byte() {
        let input = "[\n{\"text\": \"a ] tricky } \\\"string\\\" [\"},\r\n{\"n\": [1, {\"x\": []}]}\n]";
        let values = decode_in_chunks(input, 1);
        assert_eq!(values.len(), 2);
        assert_eq!(values[0]["text"], "a ] tricky } \"string\" [");
        assert_eq!(values[1]["n"][1]["x"], json!([]));
    }

    #[test]
    fn test_multibyte_text_split_mid_character() {
        let input = r#"[{"text":"héllo wörld ✓"}]"#;
        let values = decode_in_chunks(input, 3);
        assert_eq!(values[0]["text"], "héllo wörld ✓");
    }

    #[test]
    fn test_elements_emitted_as_soon_as_complete() {
        let mut decoder = JsonArrayDecoder::new();
        assert!(decoder.feed(b"[{\"a\":").unwrap().is_empty());
        assert_eq!(decoder.feed(b"1}\n,").unwrap(), vec![json!({"a":1})]);
        assert!(decoder.feed(b"{\"b\"").unwrap().is_empty());
        assert_eq!(decoder.feed(b":2}]").unwrap(), vec![json!({"b":2})]);
        decoder.finish().unwrap();
    }

    #[test]
    fn test_empty_array() {
        assert!(decode_in_chunks("[ ]", 1).is_empty());
    }

    #[test]
    fn test_bare_object() {
        let values = decode_in_chunks(r#"{"error":{"code":400}}"#, 5);
        assert_eq!(values, vec![json!({"error":{"code":400}})]);
    }

    #[test]
    fn test_truncated_element_is_error() {
        let mut decoder = JsonArrayDecoder::new();
        decoder.feed(br#"[{"a":1},{"b":"#).unwrap();
        assert!(matches!(
            decoder.finish(),
            Err(ProviderError::StreamInterrupted(_))
        ));
    }

    #[test]
    fn test_unclosed_array_is_error() {
        let mut decoder = JsonArrayDecoder::new();
        decoder.feed(br#"[{"a":1}"#).unwrap();
        assert!(decoder.finish().is_err());
    }

    #[test]
    fn test_empty_body_is_error() {
        let decoder = JsonArrayDecoder::new();
        assert!(matches!(
            decoder.finish(),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_not_an_array() {
        let mut decoder = JsonArrayDecoder::new();
        assert!(decoder.feed(b"data: {}").is_err());
    }

    #[test]
    fn test_trailing_garbage() {
        let mut decoder = JsonArrayDecoder::new();
        assert!(decoder.feed(b"[] x").is_err());
    }

    #[test]
    fn test_invalid_element_json() {
        let mut decoder = JsonArrayDecoder::new();
        assert!(matches!(
            decoder.feed(b"[{\"a\" 1}]"),
            Err(ProviderError::Json(_))
        ));
    }
}
