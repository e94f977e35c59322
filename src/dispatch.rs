//! Outbound reply delivery.
//!
//! Single attempt, bounded timeout, no retry: reply tokens are short-lived
//! and single-use, so a retry after expiry cannot succeed and must not be
//! attempted. A delivery failure is surfaced to the caller and logged; it
//! never aborts the rest of the event batch.

use crate::compose::OutboundPayload;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("refusing to send credentials over non-HTTPS reply endpoint")]
    InsecureEndpoint,
    #[error("reply request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("reply endpoint rejected the message ({status}): {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Outbound boundary of the pipeline.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(&self, reply_token: &str, payload: &OutboundPayload)
        -> Result<(), DeliveryError>;
}

/// Production dispatcher for the LINE reply endpoint.
pub struct LineDispatcher {
    access_token: String,
    endpoint: String,
    client: reqwest::Client,
}

impl LineDispatcher {
    pub fn new(
        access_token: String,
        endpoint: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            access_token,
            endpoint,
            client,
        })
    }
}

#[async_trait]
impl Dispatcher for LineDispatcher {
    async fn send(
        &self,
        reply_token: &str,
        payload: &OutboundPayload,
    ) -> Result<(), DeliveryError> {
        if !self.endpoint.starts_with("https://") {
            return Err(DeliveryError::InsecureEndpoint);
        }

        let body = json!({
            "replyToken": reply_token,
            "messages": [payload.to_wire()],
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status,
                body: truncate_error_body(&body),
            });
        }

        Ok(())
    }
}

/// Keep rejection bodies log-sized.
fn truncate_error_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() <= MAX {
        body.to_string()
    } else {
        let truncated: String = body.chars().take(MAX).collect();
        format!("{truncated}…")
    }
}
