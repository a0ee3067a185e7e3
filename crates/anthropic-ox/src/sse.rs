//! Server-Sent Events framing for the Messages streaming endpoint.
//!
//! Network chunks carry no relation to event boundaries: an event can arrive
//! split over several chunks, and one chunk can hold several events. The
//! decoder keeps the unterminated tail of the previous chunk and only hands
//! out `data:` payloads once the blank line that ends their event was seen.

use crate::error::AnthropicRequestError;

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next network chunk and collect every event it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<String>, AnthropicRequestError> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8(line_bytes)
                .map_err(|e| AnthropicRequestError::InvalidEventData(format!("UTF-8 decode error: {e}")))?;

            if let Some(payload) = self.process_line(&line) {
                payloads.push(payload);
            }
        }

        Ok(payloads)
    }

    /// Flush whatever the stream left behind when it closed without a
    /// trailing blank line.
    pub fn finish(&mut self) -> Result<Option<String>, AnthropicRequestError> {
        if !self.buffer.is_empty() {
            let line = String::from_utf8(std::mem::take(&mut self.buffer))
                .map_err(|e| AnthropicRequestError::InvalidEventData(format!("UTF-8 decode error: {e}")))?;
            if let Some(payload) = self.process_line(&line) {
                return Ok(Some(payload));
            }
        }

        Ok(self.take_event())
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim_end_matches(['\n', '\r']);

        if line.is_empty() {
            return self.take_event();
        }

        // comment / keep-alive
        if line.starts_with(':') {
            return None;
        }

        if let Some(rest) = line.strip_prefix("data:") {
            let data = rest.strip_prefix(' ').unwrap_or(rest);
            if data == "[DONE]" {
                self.data_lines.clear();
            } else {
                self.data_lines.push(data.to_string());
            }
        }

        // `event:`, `id:` and `retry:` carry nothing the JSON payload lacks
        None
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }

        let payload = self.data_lines.join("\n");
        self.data_lines.clear();

        if payload.trim().is_empty() {
            None
        } else {
            Some(payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_split_across_chunks_is_emitted_once_complete() {
        let mut decoder = SseDecoder::new();

        let first = decoder
            .feed(b"event: message_stop\ndata: {\"type\":\"mess")
            .unwrap();
        assert!(first.is_empty());

        let second = decoder.feed(b"age_stop\"}\n\n").unwrap();
        assert_eq!(second, vec![r#"{"type":"message_stop"}"#.to_string()]);
    }

    #[test]
    fn several_events_in_one_chunk_keep_their_order() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder
            .feed(b"data: {\"n\":1}\r\n\r\n: ping\n\ndata: {\"n\":2}\n\n")
            .unwrap();
        assert_eq!(payloads, vec![r#"{"n":1}"#, r#"{"n":2}"#]);
    }

    #[test]
    fn multibyte_text_split_inside_a_line_survives() {
        let mut decoder = SseDecoder::new();
        let event = "data: {\"text\":\"héllo\"}\n\n".as_bytes();
        // split inside the two-byte `é`
        let split = event.iter().position(|&b| b == 0xC3).unwrap() + 1;

        assert!(decoder.feed(&event[..split]).unwrap().is_empty());
        assert_eq!(
            decoder.feed(&event[split..]).unwrap(),
            vec![r#"{"text":"héllo"}"#]
        );
    }

    #[test]
    fn done_sentinel_and_unterminated_tail() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: [DONE]\n\n").unwrap().is_empty());

        assert!(decoder.feed(b"data: {\"last\":true}").unwrap().is_empty());
        assert_eq!(decoder.finish().unwrap().as_deref(), Some(r#"{"last":true}"#));
        assert_eq!(decoder.finish().unwrap(), None);
    }
}
