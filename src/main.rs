use std::sync::Arc;

use challenge_cam::{ChallengeEngine, config::{ServerArgs, ServerConfig}, http};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: ServerArgs = argh::from_env();
    let config = ServerConfig::from_env(args)?;

    let engine = Arc::new(ChallengeEngine::new(config.detector(), config.model()));
    let app = http::router(engine, &config.public_dir);

    log::info!("🚀 Starting the server");
    log::info!("🔥 Listening on: http://{}", config.addr);
    log::info!("🧠 Model: {}", config.model);
    log::info!("🔧 Press Ctrl+C to stop the server");

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
