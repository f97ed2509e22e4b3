use catalogue::app;
use catalogue::config::Config;

/// Main entry point for the catalogue web application
///
/// Initializes logging, reads the process configuration from the
/// environment, and runs the web server.
///
/// # Environment
/// * `GOOGLE_CLIENT_EMAIL`, `GOOGLE_PRIVATE_KEY`, `SHEET_ID` - required
/// * `SHEET_RANGE`, `BIND_ADDR`, `CACHE_TTL_SECS`, `RUST_LOG` - optional
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env()?;

    // Start the web application
    app::run(config).await?;

    Ok(())
}
