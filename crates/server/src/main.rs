use careline_config::Settings;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_logs = std::env::var("CARELINE_LOG_FORMAT")
        .map(|format| format == "json")
        .unwrap_or(false);
    if json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config_path = std::env::var("CARELINE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("careline.toml"));

    let settings = match Settings::load(Some(&config_path)) {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(err) = careline_server::run(settings).await {
        error!(error = %err, "server exited with error");
        std::process::exit(1);
    }
}
