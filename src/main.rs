#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::uninlined_format_args)]

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use kaeshi::config::{Config, TemplateSourceKind};
use kaeshi::dispatch::LineDispatcher;
use kaeshi::server::{self, Context};
use kaeshi::template::{RemoteTableStore, ReplyTemplate, StaticFileStore, TemplateStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "kaeshi", version, about = "Keyword-driven LINE webhook reply bot")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "kaeshi.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the webhook server
    Serve {
        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Validate configuration, rules, and every template in the source
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config).await?;

    match cli.command {
        Command::Serve { host, port } => serve(config, host, port).await,
        Command::Check => check(config).await,
    }
}

async fn serve(config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if config.channel_secret.is_empty() && !config.allow_unsigned {
        bail!(
            "channel_secret is required (set it in the config file or via {})",
            kaeshi::config::schema::ENV_CHANNEL_SECRET
        );
    }
    if config.channel_access_token.is_empty() {
        bail!(
            "channel_access_token is required (set it in the config file or via {})",
            kaeshi::config::schema::ENV_CHANNEL_ACCESS_TOKEN
        );
    }

    let rules = config.rule_set()?;
    let store = build_store(&config).await?;
    let dispatcher = Arc::new(LineDispatcher::new(
        config.channel_access_token.clone(),
        config.delivery.reply_endpoint.clone(),
        Duration::from_millis(config.delivery.timeout_ms),
    )?);

    let ctx = Arc::new(Context {
        channel_secret: config.channel_secret.clone(),
        allow_unsigned: config.allow_unsigned,
        rules,
        echo_template_key: config.reply.echo_template_key.clone(),
        composer: config.composer(),
        store,
        dispatcher,
    });

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    server::run(&host, port, config.limits.max_body_bytes, ctx).await
}

async fn build_store(config: &Config) -> Result<Arc<dyn TemplateStore>> {
    let store: Arc<dyn TemplateStore> = match config.templates.kind {
        TemplateSourceKind::StaticFile => Arc::new(
            StaticFileStore::load(std::path::Path::new(&config.templates.location)).await?,
        ),
        TemplateSourceKind::RemoteTable => Arc::new(RemoteTableStore::new(
            config.templates.location.clone(),
            Duration::from_millis(config.templates.fetch_timeout_ms),
        )?),
    };
    Ok(store)
}

/// Offline validation pass: every keyword in the source must convert to a
/// template and pass layout validation with the configured limits.
async fn check(config: Config) -> Result<()> {
    let rules = config.rule_set()?;
    println!("rules: ok (default key {:?})", rules.default_key());

    let store = build_store(&config).await?;
    let limits = config.layout_limits();

    let mut keywords = store.keywords().await;
    keywords.sort();
    if keywords.is_empty() {
        println!("template source is empty");
    }

    let mut bad = 0usize;
    for keyword in &keywords {
        let Ok(doc) = store.resolve(keyword).await else {
            println!("{keyword}: disappeared from source during check");
            bad += 1;
            continue;
        };
        match ReplyTemplate::from_doc(&doc) {
            Ok(ReplyTemplate::Text(_)) => println!("{keyword}: text"),
            Ok(ReplyTemplate::Structured(root)) => match root.validate(&limits) {
                Ok(()) => println!("{keyword}: layout ok"),
                Err(e) => {
                    println!("{keyword}: layout invalid ({e}), would fall back at runtime");
                    bad += 1;
                }
            },
            Err(e) => {
                println!("{keyword}: not a template ({e}), would fall back at runtime");
                bad += 1;
            }
        }
    }

    // The runtime never hard-fails on these, but `check` exits non-zero so
    // CI catches templates that would silently fall back.
    if bad > 0 {
        bail!("{bad} of {} templates would fall back at runtime", keywords.len());
    }
    println!("{} templates ok", keywords.len());
    Ok(())
}
