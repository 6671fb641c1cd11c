use classifieds::{app, config::AppConfig, state::AppState, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let config = AppConfig::from_env()?;
    let addr = config.listen_addr()?;
    tracing::info!(token_ttl_secs = config.token.ttl_secs, "configuration loaded");

    let app_state = AppState::init(config).await?;
    app::serve(app::build_app(app_state), addr).await
}
