use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use diet_coach::blocks::{BlockRenderer, StaticMapUrl};
use diet_coach::cli;
use diet_coach::client::HttpCoachClient;
use diet_coach::config::CoachConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CoachConfig::from_env().context("Invalid configuration")?;

    // Held for the life of the program so buffered file logs are flushed.
    let _log_guard = init_tracing(&config);

    eprintln!("🥗 Diet Coach v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", config.api_base_url);
    if let Some(ref dir) = config.log_dir {
        eprintln!("   Logs: {}", dir.display());
    }
    if config.maps_api_key.is_none() {
        eprintln!("   Maps: placeholder (GOOGLE_MAPS_API_KEY not set)");
    }
    eprintln!("   Type {} to exit.\n", cli::QUIT_COMMAND);

    let backend = Arc::new(HttpCoachClient::new(&config).context("Failed to build HTTP client")?);

    let mut renderer = BlockRenderer::new();
    if let Some(ref key) = config.maps_api_key {
        renderer = renderer.with_map_source(Arc::new(StaticMapUrl::new(key.clone())));
    }

    cli::run(cli::stdin_lines(), config, backend, renderer)
        .await
        .context("Onboarding failed")?;

    eprintln!("👋 Goodbye!");
    Ok(())
}

/// Logs go to stderr, and also to a daily file when a log dir is set.
fn init_tracing(config: &CoachConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);

    match config.log_dir {
        Some(ref dir) => {
            let appender = tracing_appender::rolling::daily(dir, "diet-coach.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(fmt::layer().with_target(false).with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}
