use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use depression_relay::config::Config;
use depression_relay::prediction::OrtTextClassifier;
use depression_relay::routes;
use depression_relay::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    depression_relay::logging::init();

    let config = Config::from_env()?;

    // Model loading may download weights, keep it off the async workers
    let model_config = config.model.clone();
    let classifier =
        tokio::task::spawn_blocking(move || OrtTextClassifier::from_config(&model_config)).await??;
    info!("Loaded classifier {}", config.model.model_id);

    let app = routes::create_routes(AppState::new(Arc::new(classifier)));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
