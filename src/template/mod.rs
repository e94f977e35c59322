//! Keyword-to-template resolution.
//!
//! A template store maps a keyword (case-sensitive, exact) to a raw
//! structured document. Documents are open-ended JSON and must be converted
//! to a [`ReplyTemplate`] before use; the conversion is fallible and the
//! pipeline degrades to a text fallback on any store or conversion failure,
//! never a hard error, because reply tokens are single-use.

pub mod remote_table;
pub mod static_file;

pub use remote_table::RemoteTableStore;
pub use static_file::StaticFileStore;

use crate::layout::{LayoutError, LayoutNode};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Raw structured document as stored by a template source.
pub type RawTemplateDoc = Value;

/// The only error a store surfaces. I/O failures, malformed rows, and
/// timeouts all collapse into this so callers fall back to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no template registered for keyword")]
pub struct NotFound;

/// Capability to resolve keywords against a pluggable backing source.
/// Lookups must be safe under concurrent access.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn resolve(&self, key: &str) -> Result<RawTemplateDoc, NotFound>;

    /// Every keyword the source currently knows, for offline validation.
    /// Best-effort for remote sources.
    async fn keywords(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyTemplate {
    Text(String),
    Structured(LayoutNode),
}

impl ReplyTemplate {
    /// Convert a raw store document. A JSON string is a plain-text template;
    /// anything else must decode as a layout tree.
    pub fn from_doc(doc: &RawTemplateDoc) -> Result<Self, LayoutError> {
        match doc {
            Value::String(text) => Ok(ReplyTemplate::Text(text.clone())),
            other => Ok(ReplyTemplate::Structured(LayoutNode::from_doc(other)?)),
        }
    }
}
