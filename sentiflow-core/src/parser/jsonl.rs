//! JSONL parser for trigger events
//!
//! Each line is either a flat `{"bucketName": ..., "objectKey": ...}` event or
//! an audit-trail API call envelope. Envelopes for anything other than an
//! object write are skipped.

use crate::models::{AuditEventEnvelope, ObjectCreatedEvent};
use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Events read from a stream
#[derive(Debug, Default)]
pub struct ParsedEvents {
    pub events: Vec<ObjectCreatedEvent>,
    /// Lines that were not object-created events
    pub skipped: usize,
    /// Lines that could not be parsed
    pub invalid: usize,
}

/// Parse one JSONL line. Blank lines and non-matching envelopes yield `None`.
pub fn parse_event_line(line: &str) -> Result<Option<ObjectCreatedEvent>> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let json: serde_json::Value =
        serde_json::from_str(line).context("Failed to parse JSONL line")?;

    if json.get("detail").is_some() {
        let envelope: AuditEventEnvelope =
            serde_json::from_value(json).context("Malformed audit event envelope")?;
        return Ok(envelope.object_created());
    }

    let event: ObjectCreatedEvent =
        serde_json::from_value(json).context("Line is not an object-created event")?;
    Ok(Some(event))
}

/// Read every line from `reader`. Bad lines are logged and counted, not fatal.
pub async fn read_events<R>(reader: R) -> Result<ParsedEvents>
where
    R: AsyncBufRead + Unpin,
{
    let mut parsed = ParsedEvents::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read event stream")?
    {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match parse_event_line(&line) {
            Ok(Some(event)) => parsed.events.push(event),
            Ok(None) => parsed.skipped += 1,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Skipping invalid event line");
                parsed.invalid += 1;
            }
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUT_OBJECT: &str = r#"{"source":"aws.s3","detail-type":"AWS API Call via CloudTrail","detail":{"eventSource":"s3.amazonaws.com","eventName":"PutObject","requestParameters":{"bucketName":"in-bucket","key":"doc1.txt"}}}"#;

    #[test]
    fn test_flat_event() {
        let event = parse_event_line(r#"{"bucketName":"in-bucket","objectKey":"doc1.txt"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event, ObjectCreatedEvent::new("in-bucket", "doc1.txt"));
    }

    #[test]
    fn test_put_object_envelope() {
        let event = parse_event_line(PUT_OBJECT).unwrap().unwrap();
        assert_eq!(event, ObjectCreatedEvent::new("in-bucket", "doc1.txt"));
    }

    #[test]
    fn test_other_api_calls_are_skipped() {
        let delete = PUT_OBJECT.replace("PutObject", "DeleteObject");
        assert!(parse_event_line(&delete).unwrap().is_none());

        let other_source = PUT_OBJECT.replace("\"aws.s3\"", "\"aws.ec2\"");
        assert!(parse_event_line(&other_source).unwrap().is_none());
    }

    #[test]
    fn test_blank_and_invalid_lines() {
        assert!(parse_event_line("   ").unwrap().is_none());
        assert!(parse_event_line("{not json").is_err());
        assert!(parse_event_line(r#"{"bucketName":"in-bucket"}"#).is_err());
    }

    #[tokio::test]
    async fn test_read_events_counts_lines() {
        let input = format!(
            "{}\n\n{}\n{}\nnot json\n",
            r#"{"bucketName":"in-bucket","objectKey":"a.txt"}"#,
            PUT_OBJECT,
            PUT_OBJECT.replace("PutObject", "GetObject"),
        );
        let parsed = read_events(input.as_bytes()).await.unwrap();
        assert_eq!(parsed.events.len(), 2);
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.invalid, 1);
    }
}
