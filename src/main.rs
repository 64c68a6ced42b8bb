use boozebot::{config::Config, BotError};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

#[tokio::main]
async fn main() -> Result<(), BotError> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config_path = Config::path_from_env();
    tracing::info!("Loading config from {}", config_path.display());
    let config = Config::from_file(config_path)?;

    boozebot::start(
        &std::env::var("DISCORD_TOKEN").expect("DISCORD_TOKEN not provided"),
        config,
    )
    .await?;

    Ok(())
}
