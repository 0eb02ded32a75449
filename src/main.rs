use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use padbot::bot::{self, Dispatcher};
use padbot::config::Config;
use padbot::events::Handler;
use padbot::platform::Platform;
use padbot::platform::rpc::RpcPlatform;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // Initialize logging with sensible defaults
    // If RUST_LOG is not set, default to "info" level for our crate,
    // or "debug" when the DEBUG toggle is on
    let default_filter = if Config::debug() {
        "padbot=debug"
    } else {
        "padbot=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting padbot...");

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded successfully");
    info!("Editor template: {}", config.editor_template.display());

    if !config.editor_template.is_file() {
        anyhow::bail!(
            "editor template not found at {} (set EDITOR_TEMPLATE)",
            config.editor_template.display()
        );
    }

    // Spawn the platform RPC server and bring the account online
    let platform: Arc<dyn Platform> = Arc::new(RpcPlatform::connect(&config).await?);
    info!("Platform connected");

    // Build the dispatcher and the event handler
    let dispatcher = Dispatcher::new(config.editor_template.clone());
    let handler = Handler::new(platform.clone(), dispatcher, config);

    // Run the bot
    bot::runtime::run(platform, handler).await;

    Ok(())
}
