use anyhow::Result;
use manga_reader_storage::Storage;
use tokio::net::TcpListener;

pub async fn serve(bind: &str, port: u16, storage: Storage) -> Result<()> {
    let app = super::routes::create_router(storage);
    let listener = TcpListener::bind(format!("{}:{}", bind, port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {:?}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
