//! docsign server binary

use anyhow::Context;
use clap::Parser;
use docsign_core::auth::TokenKey;
use docsign_engine::DocSignServices;
use docsign_server::{Cli, DocSignServer, LogFormat};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = cli.service_config().context("invalid configuration")?;
    let key = match cli.token_key().context("invalid token seed")? {
        Some(key) => key,
        None => {
            warn!("No token seed configured; issued tokens will not survive a restart");
            TokenKey::generate()
        }
    };

    info!("Starting docsign server");
    info!("Data directory: {}", config.data_dir.display());

    let services = DocSignServices::open(&config, &key).context("failed to open storage")?;

    let listener = TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;

    let server = DocSignServer::new(services, config.max_upload_bytes);
    server
        .serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("Server shutdown gracefully");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
