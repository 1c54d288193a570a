use clap::Parser;
use planeboard::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), PlaneboardError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from(Cli::parse());
    let resolver = ArchidektResolver::new(config.deck_fetch_timeout)?;
    let server = PlaneboardServer::builder()
        .config(config)
        .build(resolver)
        .await?;

    if let Ok(addr) = server.local_addr() {
        tracing::info!(%addr, "planeboard listening");
    }
    server.run().await
}
