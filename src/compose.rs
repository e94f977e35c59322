//! Reply composition: turns a resolved template into a wire-ready payload.
//!
//! Structured templates are validated against the configured layout bounds
//! before rendering. A validation failure is recoverable by design: the
//! pipeline substitutes the configured plain-text fallback so the single-use
//! reply token still gets spent on a reply the user can see.

use crate::layout::{LayoutError, LayoutLimits};
use crate::template::ReplyTemplate;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("layout validation failed: {0}")]
    Layout(#[from] LayoutError),
}

/// Alt text shown by clients that cannot render a rich layout, when the
/// layout itself carries no text run to borrow.
const DEFAULT_ALT_TEXT: &str = "メッセージが届いています";

/// One outbound reply message, ready for the delivery wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundPayload {
    Text { text: String },
    Flex { alt_text: String, contents: Value },
}

impl OutboundPayload {
    /// Wire object for the reply endpoint's `messages` array.
    pub fn to_wire(&self) -> Value {
        match self {
            OutboundPayload::Text { text } => json!({"type": "text", "text": text}),
            OutboundPayload::Flex { alt_text, contents } => json!({
                "type": "flex",
                "altText": alt_text,
                "contents": contents,
            }),
        }
    }
}

/// Stateless composer carrying the layout bounds and reply phrasing.
#[derive(Debug, Clone)]
pub struct Composer {
    limits: LayoutLimits,
    echo_format: String,
    fallback_text: String,
}

impl Composer {
    pub fn new(limits: LayoutLimits, echo_format: String, fallback_text: String) -> Self {
        Self {
            limits,
            echo_format,
            fallback_text,
        }
    }

    pub fn compose(&self, template: &ReplyTemplate) -> Result<OutboundPayload, CompositionError> {
        match template {
            ReplyTemplate::Text(text) => Ok(OutboundPayload::Text { text: text.clone() }),
            ReplyTemplate::Structured(root) => {
                root.validate(&self.limits)?;
                let alt_text = root
                    .first_text()
                    .unwrap_or(DEFAULT_ALT_TEXT)
                    .to_string();
                Ok(OutboundPayload::Flex {
                    alt_text,
                    contents: json!({"type": "bubble", "body": root.to_doc()}),
                })
            }
        }
    }

    /// Compose, substituting the text fallback on any validation failure.
    pub fn compose_or_fallback(&self, template: &ReplyTemplate) -> OutboundPayload {
        match self.compose(template) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("reply composition failed, using fallback text: {e}");
                self.fallback()
            }
        }
    }

    /// The configured plain-text fallback reply.
    pub fn fallback(&self) -> OutboundPayload {
        OutboundPayload::Text {
            text: self.fallback_text.clone(),
        }
    }

    /// Echo the user's own text inside the configured format string.
    pub fn echo(&self, user_text: &str) -> OutboundPayload {
        OutboundPayload::Text {
            text: self.echo_format.replace("{text}", user_text),
        }
    }
}
