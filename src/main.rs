use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pavilion::room::{MemoryRepository, RoomService};
use pavilion::server;

#[derive(Parser)]
#[command(about = "Multi-room Singaporean mahjong server")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pavilion=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let service = Arc::new(RoomService::new(Arc::new(MemoryRepository::new())));
    let app = server::router(service);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
