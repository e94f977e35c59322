//! Configuration schema. Loaded from TOML; secrets may be overridden from
//! the environment so they never have to live in the file.

use crate::compose::Composer;
use crate::layout::LayoutLimits;
use crate::router::{KeywordRule, Matcher, RuleSet, RuleSetError};
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_CHANNEL_SECRET: &str = "KAESHI_CHANNEL_SECRET";
pub const ENV_CHANNEL_ACCESS_TOKEN: &str = "KAESHI_CHANNEL_ACCESS_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Channel secret used to verify `X-Line-Signature`.
    pub channel_secret: String,
    /// Channel access token for the reply endpoint.
    pub channel_access_token: String,
    /// Accept webhooks that carry no signature header at all.
    /// Only for deployments where the endpoint sits behind a separately
    /// authenticated channel. Signed-but-wrong is always rejected.
    pub allow_unsigned: bool,
    pub server: ServerConfig,
    pub templates: TemplateSourceConfig,
    pub limits: LimitsConfig,
    pub delivery: DeliveryConfig,
    pub reply: ReplyConfig,
    /// Ordered keyword rules. The last rule must be `match = "any"`.
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateSourceKind {
    StaticFile,
    RemoteTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSourceConfig {
    pub kind: TemplateSourceKind,
    /// File path for `static-file`, URL for `remote-table`.
    pub location: String,
    /// Bound on one remote table fetch.
    pub fetch_timeout_ms: u64,
}

impl Default for TemplateSourceConfig {
    fn default() -> Self {
        Self {
            kind: TemplateSourceKind::StaticFile,
            location: "templates.json".into(),
            fetch_timeout_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_layout_depth: usize,
    pub max_layout_breadth: usize,
    /// Cap on the inbound webhook body.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_layout_depth: 6,
            max_layout_breadth: 12,
            max_body_bytes: 65_536,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub timeout_ms: u64,
    pub reply_endpoint: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            reply_endpoint: "https://api.line.me/v2/bot/message/reply".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyConfig {
    /// Routed keys equal to this compose an echo of the user's text instead
    /// of a store lookup. Conventionally the catch-all rule's key.
    pub echo_template_key: String,
    /// Echo phrasing; `{text}` is replaced with the user's message.
    pub echo_format: String,
    /// Plain-text reply used whenever a template cannot be resolved or
    /// rendered.
    pub fallback_text: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            echo_template_key: "echo".into(),
            echo_format: "それな〜『{text}』って感じ💋".into(),
            fallback_text: "メッセージを表示できませんでした🙏".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Contains,
    Any,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(rename = "match")]
    pub kind: MatchKind,
    #[serde(default)]
    pub pattern: String,
    pub template: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel_secret: String::new(),
            channel_access_token: String::new(),
            allow_unsigned: false,
            server: ServerConfig::default(),
            templates: TemplateSourceConfig::default(),
            limits: LimitsConfig::default(),
            delivery: DeliveryConfig::default(),
            reply: ReplyConfig::default(),
            rules: vec![
                RuleConfig {
                    kind: MatchKind::Contains,
                    pattern: "こんにちは".into(),
                    template: "greeting".into(),
                },
                RuleConfig {
                    kind: MatchKind::Any,
                    pattern: String::new(),
                    template: "echo".into(),
                },
            ],
        }
    }
}

impl Config {
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment always wins over the file for credentials.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var(ENV_CHANNEL_SECRET) {
            if !secret.is_empty() {
                self.channel_secret = secret;
            }
        }
        if let Ok(token) = std::env::var(ENV_CHANNEL_ACCESS_TOKEN) {
            if !token.is_empty() {
                self.channel_access_token = token;
            }
        }
    }

    pub fn rule_set(&self) -> Result<RuleSet, RuleSetError> {
        let rules = self
            .rules
            .iter()
            .map(|rule| KeywordRule {
                matcher: match rule.kind {
                    MatchKind::Exact => Matcher::Exact(rule.pattern.clone()),
                    MatchKind::Contains => Matcher::Contains(rule.pattern.clone()),
                    MatchKind::Any => Matcher::Any,
                },
                template_key: rule.template.clone(),
            })
            .collect();
        RuleSet::new(rules)
    }

    pub fn layout_limits(&self) -> LayoutLimits {
        LayoutLimits {
            max_depth: self.limits.max_layout_depth,
            max_breadth: self.limits.max_layout_breadth,
        }
    }

    pub fn composer(&self) -> Composer {
        Composer::new(
            self.layout_limits(),
            self.reply.echo_format.clone(),
            self.reply.fallback_text.clone(),
        )
    }
}
