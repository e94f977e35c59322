//! Webhook payload decoding.
//!
//! The platform delivers a JSON envelope `{"events": [...]}`. Decoding is
//! permissive at the outer level (unknown event types become [`Event::Other`])
//! but strict per message event: a `message` event missing its reply token or
//! content is dropped on its own, without failing the batch.

use serde_json::Value;
use thiserror::Error;

/// One inbound HTTP delivery: the exact raw body plus the declared signature
/// header, if any. Owned by a single request and discarded afterwards.
#[derive(Debug)]
pub struct WebhookEnvelope {
    pub body: Vec<u8>,
    pub signature: Option<String>,
}

/// The envelope itself could not be decoded. The request is acknowledged but
/// not processed.
#[derive(Debug, Error)]
#[error("malformed webhook payload: {0}")]
pub struct MalformedPayload(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    /// Non-text content (sticker, image, ...). The kind string is kept for
    /// logging; the reply pipeline does not act on it.
    NonText(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Message {
        /// Single-use, platform-issued credential for exactly one reply.
        reply_token: String,
        content: MessageContent,
    },
    Follow,
    Unfollow,
    Other,
}

/// Decode a raw webhook body into events.
///
/// Fails only when the body is not valid JSON or lacks the `events` array.
pub fn parse(raw: &[u8]) -> Result<Vec<Event>, MalformedPayload> {
    let doc: Value =
        serde_json::from_slice(raw).map_err(|e| MalformedPayload(e.to_string()))?;
    let Some(events) = doc.get("events").and_then(Value::as_array) else {
        return Err(MalformedPayload("missing \"events\" array".into()));
    };

    let mut parsed = Vec::with_capacity(events.len());
    for raw_event in events {
        match raw_event.get("type").and_then(Value::as_str) {
            Some("message") => match parse_message_event(raw_event) {
                Some(event) => parsed.push(event),
                None => {
                    tracing::warn!("dropping message event missing replyToken or content");
                }
            },
            Some("follow") => parsed.push(Event::Follow),
            Some("unfollow") => parsed.push(Event::Unfollow),
            _ => parsed.push(Event::Other),
        }
    }
    Ok(parsed)
}

fn parse_message_event(raw: &Value) -> Option<Event> {
    let reply_token = raw.get("replyToken").and_then(Value::as_str)?;
    let message = raw.get("message")?;
    let content = match message.get("type").and_then(Value::as_str)? {
        "text" => MessageContent::Text(message.get("text").and_then(Value::as_str)?.to_string()),
        kind => MessageContent::NonText(kind.to_string()),
    };
    Some(Event::Message {
        reply_token: reply_token.to_string(),
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_message_event() {
        let body = r#"{
            "events": [{
                "type": "message",
                "replyToken": "tok-1",
                "message": {"type": "text", "text": "こんにちは"}
            }]
        }"#
        .as_bytes();
        let events = parse(body).unwrap();
        assert_eq!(
            events,
            vec![Event::Message {
                reply_token: "tok-1".into(),
                content: MessageContent::Text("こんにちは".into()),
            }]
        );
    }

    #[test]
    fn unknown_event_types_map_to_other() {
        let body = br#"{"events": [{"type": "beacon"}, {"type": "follow"}, {"type": "unfollow"}, {}]}"#;
        let events = parse(body).unwrap();
        assert_eq!(
            events,
            vec![Event::Other, Event::Follow, Event::Unfollow, Event::Other]
        );
    }

    #[test]
    fn message_without_reply_token_is_dropped_alone() {
        let body = br#"{
            "events": [
                {"type": "message", "message": {"type": "text", "text": "orphan"}},
                {"type": "message", "replyToken": "tok-2",
                 "message": {"type": "text", "text": "kept"}}
            ]
        }"#;
        let events = parse(body).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            Event::Message {
                reply_token: "tok-2".into(),
                content: MessageContent::Text("kept".into()),
            }
        );
    }

    #[test]
    fn text_message_without_text_field_is_dropped() {
        let body = br#"{
            "events": [{"type": "message", "replyToken": "tok", "message": {"type": "text"}}]
        }"#;
        assert!(parse(body).unwrap().is_empty());
    }

    #[test]
    fn non_text_content_keeps_its_kind() {
        let body = br#"{
            "events": [{"type": "message", "replyToken": "tok",
                        "message": {"type": "sticker", "stickerId": "1"}}]
        }"#;
        let events = parse(body).unwrap();
        assert_eq!(
            events[0],
            Event::Message {
                reply_token: "tok".into(),
                content: MessageContent::NonText("sticker".into()),
            }
        );
    }

    #[test]
    fn invalid_json_fails_whole_parse() {
        assert!(parse(b"{not json").is_err());
    }

    #[test]
    fn missing_events_key_fails_whole_parse() {
        assert!(parse(br#"{"destination": "U123"}"#).is_err());
    }

    #[test]
    fn empty_events_array_is_fine() {
        assert!(parse(br#"{"events": []}"#).unwrap().is_empty());
    }
}
