mod api;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "MANGA_READER_PORT", default_value_t = 3000)]
    port: u16,

    /// Address to bind the HTTP server to
    #[arg(short, long, env = "MANGA_READER_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Path to data directory
    #[arg(short, long, env = "MANGA_READER_DATA_DIR", default_value = "./data")]
    data_dir: String,

    /// Maximum number of pooled database connections
    #[arg(long, env = "MANGA_READER_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "manga_reader=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!("Starting Manga Reader on port {}", args.port);

    let storage =
        manga_reader_storage::Storage::new(&args.data_dir, args.max_connections).await?;
    api::server::serve(&args.bind, args.port, storage).await?;

    Ok(())
}
