use rangerace::{ServerBuilder, ServerError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("RANGERACE_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let server = ServerBuilder::new().bind(&addr).build().await?;
    let local = server.local_addr()?;
    tracing::info!(addr = %local, "listening");
    server.run().await
}
