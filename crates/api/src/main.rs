use std::sync::Arc;

use anyhow::Context;

use expcat_infra::{ExpcatConfig, blob_store::{BlobStore, FsBlobStore}};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    expcat_observability::init();

    let config = ExpcatConfig::from_env().context("invalid configuration")?;

    let backups: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(config.backup_bucket.clone()));
    let models: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(config.models_bucket.clone()));
    let services = Arc::new(expcat_api::app::services::build_services(&config, backups, models));

    services.warm_up().await.context("loading models")?;

    let app = expcat_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
