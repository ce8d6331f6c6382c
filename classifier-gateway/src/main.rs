//! Classifier Gateway - HTTP front end for an image-classification model backend.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use classifier_gateway::{api, AppState, Config, Gateway, LabelTable};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("classifier-gateway {}", VERSION);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        print_version();
        return Ok(());
    }

    // Load configuration
    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Make sure config.toml exists or set GATEWAY__MODEL__INPUT_SIZE.",
            e
        )
    })?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting classifier-gateway {}", VERSION);

    let labels = LabelTable::load_or_default(config.model.labels_path.as_deref())?;
    match config.model.labels_path {
        Some(ref path) => tracing::info!("Loaded {} labels from {}", labels.len(), path.display()),
        None => tracing::info!("Using built-in CIFAR-10 labels"),
    }

    let gateway = Arc::new(Gateway::from_config(&config, Arc::new(labels))?);
    tracing::info!(
        "Backend predict URL: {}, input size: {}x{}, max attempts: {}",
        config.backend.predict_url(),
        config.model.input_size,
        config.model.input_size,
        config.retry.max_attempts
    );

    if let Some(secs) = config.health.poll_interval_secs {
        let _poller = gateway.spawn_health_poller(Duration::from_secs(secs.max(1)));
        tracing::info!("Polling backend health every {}s", secs.max(1));
    }

    let addr = format!("{}:{}", config.api.host, config.api.port);
    let state = Arc::new(AppState::new(config, gateway));
    let app = api::app(state);

    // Start server
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
