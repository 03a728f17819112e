use anyhow::Context;

use maintops_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    maintops_observability::init();

    let config = AppConfig::from_env().context("reading configuration")?;
    let app = maintops_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
