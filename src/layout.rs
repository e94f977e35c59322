//! Recursive rich-layout tree.
//!
//! Template documents describe a nested flex-style layout: boxes holding text
//! runs, images, and buttons with actions. External sources are untrusted, so
//! a document is first decoded into [`LayoutNode`] (shape errors surface
//! here) and then validated against bounded depth/breadth and per-node field
//! requirements before composition.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("document is not a recognized layout: {0}")]
    Shape(String),
    #[error("layout exceeds maximum depth of {0}")]
    TooDeep(usize),
    #[error("box holds {count} children, maximum is {max}")]
    TooWide { count: usize, max: usize },
    #[error("text run is empty")]
    EmptyText,
    #[error("image url must be http(s): {0:?}")]
    BadImageUrl(String),
    #[error("uri action url must be http(s): {0:?}")]
    BadActionUrl(String),
    #[error("message action text is empty")]
    EmptyActionText,
}

/// Depth/breadth bounds for layout validation. Prevents pathological external
/// templates from producing unbounded payloads.
#[derive(Debug, Clone, Copy)]
pub struct LayoutLimits {
    pub max_depth: usize,
    pub max_breadth: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxDirection {
    #[default]
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// Open a URL when tapped.
    Uri {
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        uri: String,
    },
    /// Send `text` back into the chat when tapped.
    Message { label: String, text: String },
}

/// One node of the layout tree, mirroring the wire document's `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayoutNode {
    Box {
        #[serde(default)]
        direction: BoxDirection,
        #[serde(default)]
        children: Vec<LayoutNode>,
    },
    #[serde(rename = "text")]
    TextRun {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        size: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        weight: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    Image {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        size: Option<String>,
        #[serde(rename = "aspectMode", skip_serializing_if = "Option::is_none")]
        aspect_mode: Option<String>,
    },
    Button {
        action: Action,
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<String>,
    },
}

impl LayoutNode {
    /// Fallible conversion from a raw template document.
    pub fn from_doc(doc: &Value) -> Result<Self, LayoutError> {
        serde_json::from_value(doc.clone()).map_err(|e| LayoutError::Shape(e.to_string()))
    }

    /// Canonical document form. Structurally equivalent to the source
    /// document modulo key ordering and defaulted fields.
    pub fn to_doc(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Enforce bounded depth/breadth and per-node required fields.
    pub fn validate(&self, limits: &LayoutLimits) -> Result<(), LayoutError> {
        self.validate_at(1, limits)
    }

    fn validate_at(&self, depth: usize, limits: &LayoutLimits) -> Result<(), LayoutError> {
        if depth > limits.max_depth {
            return Err(LayoutError::TooDeep(limits.max_depth));
        }
        match self {
            LayoutNode::Box { children, .. } => {
                if children.len() > limits.max_breadth {
                    return Err(LayoutError::TooWide {
                        count: children.len(),
                        max: limits.max_breadth,
                    });
                }
                for child in children {
                    child.validate_at(depth + 1, limits)?;
                }
                Ok(())
            }
            LayoutNode::TextRun { text, .. } => {
                if text.is_empty() {
                    return Err(LayoutError::EmptyText);
                }
                Ok(())
            }
            LayoutNode::Image { url, .. } => {
                if !is_http_url(url) {
                    return Err(LayoutError::BadImageUrl(url.clone()));
                }
                Ok(())
            }
            LayoutNode::Button { action, .. } => match action {
                Action::Uri { uri, .. } => {
                    if is_http_url(uri) {
                        Ok(())
                    } else {
                        Err(LayoutError::BadActionUrl(uri.clone()))
                    }
                }
                Action::Message { text, .. } => {
                    if text.is_empty() {
                        Err(LayoutError::EmptyActionText)
                    } else {
                        Ok(())
                    }
                }
            },
        }
    }

    /// First text run in document order, used as alt text for rich replies.
    pub fn first_text(&self) -> Option<&str> {
        match self {
            LayoutNode::TextRun { text, .. } => Some(text),
            LayoutNode::Box { children, .. } => children.iter().find_map(Self::first_text),
            LayoutNode::Image { .. } | LayoutNode::Button { .. } => None,
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LIMITS: LayoutLimits = LayoutLimits {
        max_depth: 4,
        max_breadth: 3,
    };

    fn menu_doc() -> Value {
        json!({
            "type": "box",
            "direction": "vertical",
            "children": [
                {"type": "text", "text": "本日のメニュー", "weight": "bold"},
                {"type": "image", "url": "https://example.com/menu.png", "size": "full"},
                {"type": "button", "style": "primary",
                 "action": {"type": "uri", "label": "予約する", "uri": "https://example.com/reserve"}}
            ]
        })
    }

    #[test]
    fn decodes_nested_document() {
        let node = LayoutNode::from_doc(&menu_doc()).unwrap();
        let LayoutNode::Box { children, direction } = &node else {
            panic!("expected box root");
        };
        assert_eq!(*direction, BoxDirection::Vertical);
        assert_eq!(children.len(), 3);
        assert!(node.validate(&LIMITS).is_ok());
    }

    #[test]
    fn canonical_round_trip_is_structurally_equal() {
        let doc = menu_doc();
        let node = LayoutNode::from_doc(&doc).unwrap();
        assert_eq!(node.to_doc(), doc);
    }

    #[test]
    fn unrecognized_document_is_a_shape_error() {
        let err = LayoutNode::from_doc(&json!({"type": "carousel"})).unwrap_err();
        assert!(matches!(err, LayoutError::Shape(_)));
    }

    #[test]
    fn depth_beyond_limit_fails_validation() {
        // Depth 5 chain of boxes against max_depth 4.
        let mut doc = json!({"type": "text", "text": "leaf"});
        for _ in 0..4 {
            doc = json!({"type": "box", "children": [doc]});
        }
        let node = LayoutNode::from_doc(&doc).unwrap();
        assert!(matches!(
            node.validate(&LIMITS),
            Err(LayoutError::TooDeep(4))
        ));
    }

    #[test]
    fn breadth_beyond_limit_fails_validation() {
        let children = vec![json!({"type": "text", "text": "x"}); 4];
        let doc = json!({"type": "box", "children": children});
        let node = LayoutNode::from_doc(&doc).unwrap();
        assert!(matches!(
            node.validate(&LIMITS),
            Err(LayoutError::TooWide { count: 4, max: 3 })
        ));
    }

    #[test]
    fn image_requires_http_url() {
        let node = LayoutNode::from_doc(&json!({"type": "image", "url": "ftp://host/x.png"})).unwrap();
        assert!(matches!(node.validate(&LIMITS), Err(LayoutError::BadImageUrl(_))));
    }

    #[test]
    fn uri_action_requires_http_url() {
        let node = LayoutNode::from_doc(&json!({
            "type": "button",
            "action": {"type": "uri", "uri": "javascript:alert(1)"}
        }))
        .unwrap();
        assert!(matches!(node.validate(&LIMITS), Err(LayoutError::BadActionUrl(_))));
    }

    #[test]
    fn message_action_requires_text() {
        let node = LayoutNode::from_doc(&json!({
            "type": "button",
            "action": {"type": "message", "label": "はい", "text": ""}
        }))
        .unwrap();
        assert!(matches!(node.validate(&LIMITS), Err(LayoutError::EmptyActionText)));
    }

    #[test]
    fn first_text_walks_document_order() {
        let node = LayoutNode::from_doc(&menu_doc()).unwrap();
        assert_eq!(node.first_text(), Some("本日のメニュー"));

        let image = LayoutNode::from_doc(&json!({"type": "image", "url": "https://e.com/a.png"})).unwrap();
        assert_eq!(image.first_text(), None);
    }
}
