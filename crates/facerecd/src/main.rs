use anyhow::{Context, Result};
use facerec_core::{OnnxExtractor, Registry};
use facerecd::{router, spawn_engine, AppState, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("facerecd starting");

    let config = Config::load().context("loading configuration")?;
    tracing::info!(
        bind = %config.bind,
        faces_dir = %config.faces_dir.display(),
        model_dir = %config.model_dir.display(),
        policy = ?config.load_policy(),
        "configuration loaded"
    );

    let mut extractor = OnnxExtractor::load(&config.model_dir).context("loading face models")?;

    tracing::info!("generating encodings for reference images");
    let registry = Registry::load(&config.faces_dir, &mut extractor, config.load_policy())
        .context("enrolling reference images")?;

    let engine = spawn_engine(extractor).context("starting extraction engine")?;
    let state = AppState::new(registry, engine, config.faces_dir.clone());
    let app = router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!(addr = %listener.local_addr()?, "facerecd ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("serving HTTP")?;

    tracing::info!("facerecd shutting down");
    Ok(())
}
