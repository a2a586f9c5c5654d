use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use sahaya::api::{start_server, ApiContext};
use sahaya::{config, db};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    std::fs::create_dir_all(config::app_data_dir())?;
    let conn = db::open_database(&config::database_path())?;

    let bind: SocketAddr = std::env::var("SAHAYA_BIND")
        .unwrap_or_else(|_| config::DEFAULT_BIND.to_string())
        .parse()?;

    let server = start_server(ApiContext::new(conn), bind).await?;
    tracing::info!(addr = %server.addr, "Alert API listening");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    drop(server);
    Ok(())
}
