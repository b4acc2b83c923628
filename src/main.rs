// src/main.rs
use vault_provider::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::init_cli_logging();
    cli::run_cli().await
}
