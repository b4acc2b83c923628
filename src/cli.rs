use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{error, info};

use crate::interface::Capabilities;
use crate::provider::context::FIELD_NAMESPACE;
use crate::provider::{get_client, InstanceState, ProviderConfig, ProviderMeta};

#[derive(Parser)]
#[command(
    name = "vault-provider",
    about = "Inspect what a Vault provider configuration resolves to",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub config: ProviderConfig,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the server version and edition the provider sees.
    Status,
    /// Read a path through the client resolved for a namespace.
    Read {
        path: String,
        /// Namespace relative to the provider namespace.
        #[arg(long = "in-namespace")]
        in_namespace: Option<String>,
    },
    /// List keys under a path through the client resolved for a namespace.
    List {
        path: String,
        /// Namespace relative to the provider namespace.
        #[arg(long = "in-namespace")]
        in_namespace: Option<String>,
    },
}

/// Logs go to stderr so that stdout carries only the command's output.
pub fn init_cli_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn context_state(namespace: Option<String>) -> InstanceState {
    let mut state = InstanceState::default();
    if let Some(ns) = namespace {
        state.attributes.insert(FIELD_NAMESPACE.to_string(), ns);
    }
    state
}

fn print_json(value: Option<Value>) -> Result<()> {
    match value {
        Some(v) => println!("{}", serde_json::to_string_pretty(&v)?),
        None => println!("null"),
    }
    Ok(())
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let meta = ProviderMeta::configure(cli.config)
        .await
        .context("Failed to configure provider")?;

    match cli.command {
        Commands::Status => match meta.server_info() {
            Some(info) => {
                info!(
                    "Vault version: {}, enterprise: {}",
                    info.version, info.enterprise
                );
                println!(
                    "{} ({})",
                    info.version,
                    if info.enterprise { "enterprise" } else { "community" }
                );
            }
            None => {
                error!("Vault version unknown (version lookup skipped)");
                return Err(anyhow::anyhow!("Vault version unknown"));
            }
        },
        Commands::Read { path, in_namespace } => {
            let state = context_state(in_namespace);
            let client = get_client((&state).into(), &meta)?;
            let value = client
                .read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path))?;
            print_json(value)?;
        }
        Commands::List { path, in_namespace } => {
            let state = context_state(in_namespace);
            let client = get_client((&state).into(), &meta)?;
            let value = client
                .list(&path)
                .await
                .with_context(|| format!("Failed to list {}", path))?;
            print_json(value)?;
        }
    }
    Ok(())
}
