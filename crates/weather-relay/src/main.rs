//! Weather relay binary entry point.
//!
//! Usage: weather-relay [--backend-url <url>] [--log-level <level>]
//!
//! Broker settings come from `RABBITMQ_USER`, `RABBITMQ_PASSWORD`,
//! `RABBITMQ_HOST` and `RABBITMQ_PORT`.

use clap::Parser;
use observability::{LogConfig, LogFormat};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use weather_relay::{
    shutdown_signal, BrokerSession, Forwarder, HttpBackend, RelayConfig, RelayError, RelayResult,
    Shutdown,
};

/// Weather relay: forwards queued weather readings to the backend.
#[derive(Parser, Debug)]
#[command(name = "weather-relay")]
#[command(about = "Forwards weather readings from RabbitMQ to the HTTP backend")]
struct Args {
    /// Backend URL every message is POSTed to (overrides BACKEND_URL).
    #[arg(long)]
    backend_url: Option<String>,

    /// Backend request timeout in seconds (overrides BACKEND_TIMEOUT_SECS).
    #[arg(long)]
    backend_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Console log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "compact")]
    log_format: LogFormat,

    /// Also append JSON logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut RelayConfig) {
        if let Some(url) = &self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(secs) = self.backend_timeout_secs {
            config.backend_timeout = Duration::from_secs(secs);
        }
    }
}

#[tokio::main]
async fn main() -> RelayResult<()> {
    let args = Args::parse();

    observability::init_with_config(LogConfig {
        service_name: "weather-relay".into(),
        default_level: args.log_level.clone(),
        format: args.log_format,
        log_path: args.log_file.clone(),
    })?;

    info!("Weather relay starting...");

    let mut config = RelayConfig::from_env()?;
    args.apply(&mut config);

    info!(
        broker = %config.broker.redacted_uri(),
        queue = %config.queue_name,
        backend_url = %config.backend_url,
        backend_timeout_secs = config.backend_timeout.as_secs(),
        "Configuration loaded"
    );

    let backend = HttpBackend::from_config(&config)?;

    let mut shutdown = Shutdown::on_signal(shutdown_signal());

    let session = tokio::select! {
        result = BrokerSession::connect(&config) => result.map_err(|e| {
            error!(error = %e, "Could not connect to broker");
            e
        })?,
        _ = shutdown.recv() => {
            info!("Shutdown requested before the broker connection was ready");
            return Ok(());
        }
    };

    let deliveries = session.consume().await?;
    let forwarder = Forwarder::new(backend, config.failure_delay);

    let forwarder_task = tokio::spawn(async move {
        let result = forwarder.run(deliveries, shutdown).await;
        session.close().await;
        result
    });

    info!("Waiting for messages. To exit press CTRL+C");

    let joined = forwarder_task.await;

    match joined.map_err(RelayError::from)? {
        Ok(stats) => {
            info!(
                acknowledged = stats.acknowledged,
                requeued = stats.requeued,
                settle_errors = stats.settle_errors,
                "Weather relay stopped"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Forwarder exited with error");
            Err(e)
        }
    }
}
