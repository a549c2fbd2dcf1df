use finrobot_dashboard::{api::start_server, config::Settings, config::fingerprint};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env before the filter so RUST_LOG can live there too
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;

    info!("FinRobot dashboard");
    info!(
        backend = %settings.llm.backend,
        model = %settings.llm.model,
        llm_key = %fingerprint(&settings.keys.llm),
        "LLM configured"
    );

    let missing = settings.keys.missing();
    if !missing.is_empty() {
        warn!(
            missing = ?missing,
            "API keys missing, runs will be refused until they are set in the sidebar"
        );
    }

    start_server(settings).await?;

    Ok(())
}
