use deadline_board::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("deadline_board=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        tick_ms = config.tick_period.as_millis() as u64,
        filter = %config.default_filter,
        "Starting deadline board"
    );

    deadline_board::api::serve(config).await
}
