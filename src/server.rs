//! HTTP boundary and the per-request reply pipeline.
//!
//! `POST /callback` is the platform webhook: signature verification runs over
//! the raw body before any decoding. Signature rejection is the only
//! non-success HTTP outcome; once the request is verified and parsed, every
//! downstream failure is recovered internally (fallback text, logged delivery
//! errors) because reply tokens give no second chance.

use crate::compose::{Composer, OutboundPayload};
use crate::dispatch::Dispatcher;
use crate::event::{self, Event, MessageContent, WebhookEnvelope};
use crate::router::RuleSet;
use crate::signature::{self, SignatureCheck};
use crate::template::{ReplyTemplate, TemplateStore};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Everything request handling needs, constructed once at startup and shared
/// immutably. No hidden globals.
pub struct Context {
    pub channel_secret: String,
    pub allow_unsigned: bool,
    pub rules: RuleSet,
    /// Routed keys equal to this echo the user's text instead of hitting the
    /// store.
    pub echo_template_key: String,
    pub composer: Composer,
    pub store: Arc<dyn TemplateStore>,
    pub dispatcher: Arc<dyn Dispatcher>,
}

#[derive(Clone)]
struct AppState {
    ctx: Arc<Context>,
}

/// Terminal state of one webhook request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Signature missing (with `allow_unsigned` off) or wrong. HTTP 400.
    InvalidSignature,
    /// Envelope undecodable. Acknowledged with 200, not processed.
    MalformedPayload,
    /// Events handled in array order; `replied` counts successful deliveries.
    Processed { replied: usize },
}

pub fn router(ctx: Arc<Context>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/callback", post(handle_callback))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(AppState { ctx })
}

pub async fn run(
    host: &str,
    port: u16,
    max_body_bytes: usize,
    ctx: Arc<Context>,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("webhook server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(ctx, max_body_bytes))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn handle_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let envelope = WebhookEnvelope {
        body: body.to_vec(),
        signature,
    };

    match process_webhook(&state.ctx, &envelope).await {
        CallbackOutcome::InvalidSignature => {
            (StatusCode::BAD_REQUEST, "signature verification failed")
        }
        CallbackOutcome::MalformedPayload | CallbackOutcome::Processed { .. } => {
            (StatusCode::OK, "OK")
        }
    }
}

/// The full pipeline for one request, independent of the HTTP layer.
pub async fn process_webhook(ctx: &Context, envelope: &WebhookEnvelope) -> CallbackOutcome {
    match signature::check(
        &ctx.channel_secret,
        &envelope.body,
        envelope.signature.as_deref(),
    ) {
        SignatureCheck::Valid => {}
        SignatureCheck::Missing if ctx.allow_unsigned => {
            tracing::debug!("accepting unsigned webhook (allow_unsigned is on)");
        }
        SignatureCheck::Missing => {
            tracing::warn!("rejecting unsigned webhook");
            return CallbackOutcome::InvalidSignature;
        }
        SignatureCheck::Invalid => {
            tracing::warn!("rejecting webhook with bad signature");
            return CallbackOutcome::InvalidSignature;
        }
    }

    let events = match event::parse(&envelope.body) {
        Ok(events) => events,
        Err(e) => {
            tracing::warn!("acknowledging undecodable webhook: {e}");
            return CallbackOutcome::MalformedPayload;
        }
    };

    let mut replied = 0;
    for event in &events {
        match event {
            Event::Message {
                reply_token,
                content: MessageContent::Text(text),
            } => {
                let payload = resolve_reply(ctx, text).await;
                match ctx.dispatcher.send(reply_token, &payload).await {
                    Ok(()) => replied += 1,
                    // Logged, not retried; siblings still get their turn.
                    Err(e) => tracing::error!("reply delivery failed: {e}"),
                }
            }
            Event::Message {
                content: MessageContent::NonText(kind),
                ..
            } => {
                tracing::debug!("not replying to non-text message content ({kind})");
            }
            Event::Follow => tracing::info!("new follower"),
            Event::Unfollow => tracing::info!("user unfollowed"),
            Event::Other => {}
        }
    }
    CallbackOutcome::Processed { replied }
}

/// Route user text to a wire-ready payload. Never fails: store misses and
/// composition errors all land on the text fallback.
async fn resolve_reply(ctx: &Context, text: &str) -> OutboundPayload {
    let key = ctx.rules.route(text);
    if key == ctx.echo_template_key {
        return ctx.composer.echo(text);
    }

    match ctx.store.resolve(key).await {
        Ok(doc) => match ReplyTemplate::from_doc(&doc) {
            Ok(template) => ctx.composer.compose_or_fallback(&template),
            Err(e) => {
                tracing::warn!("template {key:?} failed conversion: {e}");
                ctx.composer.fallback()
            }
        },
        Err(_) => {
            tracing::warn!("no template for keyword {key:?}, replying with fallback");
            ctx.composer.fallback()
        }
    }
}
