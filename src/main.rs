use clap::Parser;
use pca_gatekeeper::{
    api::start_api_server,
    cli::{config_summary, Cli, Commands},
    observability::{init_observability, log_config_info},
    AppConfig, Application, Result, APP_NAME, VERSION,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (optional - won't fail if missing)
    // This must happen before any config is read from environment
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    if cli.command() == &Commands::CheckConfig {
        print!("{}", config_summary(&config)?);
        return Ok(());
    }

    init_observability(&config.observability)?;
    info!(app_name = APP_NAME, version = VERSION, "Starting PCA gatekeeper");
    log_config_info(&config);

    let router = Application::from_config(&config)?.router(config.server.max_body_size);
    start_api_server(&config.server, router).await?;

    info!("Gatekeeper shutdown completed");
    Ok(())
}
