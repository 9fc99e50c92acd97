//! Line-oriented event feed.
//!
//! Accepts the two shapes the salt tooling prints:
//! - full form, one JSON object per line: `{"tag": "...", "data": {...}}`
//! - plain form, tag then payload: `salt/job/123/new\t{...}`

use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::types::SaltEvent;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read event feed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum LineError {
    #[error("invalid event JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("tag {0:?} has no payload")]
    MissingPayload(String),

    #[error("line is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Parse one feed line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<SaltEvent>, LineError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    if line.starts_with('{') {
        return Ok(Some(serde_json::from_str(line)?));
    }

    let Some((tag, payload)) = line.split_once(char::is_whitespace) else {
        return Err(LineError::MissingPayload(line.to_string()));
    };
    let data: Value = serde_json::from_str(payload.trim_start())?;
    Ok(Some(SaltEvent::new(tag, data)))
}

/// Reads events from any buffered async reader until end of input.
pub struct EventSource<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: u64,
    skipped: u64,
}

impl<R> EventSource<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Next decodable event, or `None` at end of input.
    ///
    /// Lines that fail to decode are logged and skipped; only read failures
    /// are returned as errors.
    pub async fn next_event(&mut self) -> Result<Option<SaltEvent>, SourceError> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let decoded = String::from_utf8(std::mem::take(&mut self.buf))
                .map_err(LineError::from)
                .and_then(|line| parse_line(&line));
            match decoded {
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => {}
                Err(e) => {
                    self.skipped += 1;
                    warn!(line = self.line_no, error = %e, "Skipping undecodable event");
                }
            }
        }
    }

    /// Number of lines dropped because they could not be decoded.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_form() {
        let event = parse_line(r#"{"tag": "salt/job/1/new", "data": {"jid": "1"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event.tag, "salt/job/1/new");
        assert_eq!(event.data, json!({"jid": "1"}));
    }

    #[test]
    fn parses_plain_form() {
        let event = parse_line("salt/job/1/ret/web1\t{\"return\": true}")
            .unwrap()
            .unwrap();
        assert_eq!(event.tag, "salt/job/1/ret/web1");
        assert_eq!(event.data, json!({"return": true}));
    }

    #[test]
    fn plain_form_tolerates_extra_spacing() {
        let event = parse_line("salt/auth   {\"act\": \"accept\"}").unwrap().unwrap();
        assert_eq!(event.tag, "salt/auth");
    }

    #[test]
    fn blank_line_is_nothing() {
        assert!(parse_line("   ").unwrap().is_none());
    }

    #[test]
    fn bare_tag_is_an_error() {
        assert!(matches!(
            parse_line("salt/auth"),
            Err(LineError::MissingPayload(tag)) if tag == "salt/auth"
        ));
    }

    #[test]
    fn garbage_payload_is_an_error() {
        assert!(matches!(
            parse_line("salt/auth {not json"),
            Err(LineError::InvalidJson(_))
        ));
    }
}
