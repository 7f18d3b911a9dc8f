use anyhow::Context;
use faresight_api::{app, AppState};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "faresight_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = faresight_store::Config::load().context("Failed to load config")?;
    tracing::info!("Starting Faresight API on port {}", config.server.port);

    // Models, routes and fees are loaded once; a missing artifact stops startup here
    let (estimator, options) =
        faresight_store::build_estimator(&config).context("Failed to build fare estimator")?;
    let app = app(AppState::new(estimator, options));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
