use calorie_ledger::{
    AppState, Config, JsonFileStore, LedgerManager, Store, accounts::AccountService, router,
};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env()?;
    let clock = Arc::new(config.clock());
    let store: Arc<dyn Store> = Arc::new(JsonFileStore::open(&config.data_path).await?);

    match config.utc_offset {
        Some(offset) => info!(%offset, "ledger days follow fixed utc offset"),
        None => info!("ledger days follow server-local date"),
    }

    let ledger = LedgerManager::new(Arc::clone(&store), clock.clone(), config.store_timeout)
        .with_weekly_window(config.weekly_window);
    let accounts = AccountService::new(store, clock, config.store_timeout);
    let app = router(AppState::new(ledger, accounts));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
