//! Publishes one weather reading to the relay's queue.
//!
//! Usage: weather-relay-publish [--city <name>] [--stdin]
//!
//! Uses the same broker settings as the relay. With `--stdin` the message
//! body is read verbatim from standard input instead.

use chrono::Utc;
use clap::Parser;
use observability::LogConfig;
use std::io::Read;
use tracing::info;
use weather_relay::{BrokerSession, RelayConfig, RelayResult, WeatherReading};

#[derive(Parser, Debug)]
#[command(name = "weather-relay-publish")]
#[command(about = "Publish a sample weather reading to the weather_data queue")]
struct Args {
    /// City name for the generated reading.
    #[arg(long, default_value = "Sao Paulo")]
    city: String,

    /// Read the message body from stdin instead of generating one.
    #[arg(long)]
    stdin: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn message_body(args: &Args) -> RelayResult<Vec<u8>> {
    if args.stdin {
        let mut body = Vec::new();
        std::io::stdin().read_to_end(&mut body)?;
        return Ok(body);
    }

    let reading = WeatherReading::sample(&args.city, Utc::now());
    Ok(serde_json::to_vec(&reading)?)
}

#[tokio::main]
async fn main() -> RelayResult<()> {
    let args = Args::parse();

    observability::init_with_config(LogConfig {
        service_name: "weather-relay-publish".into(),
        default_level: args.log_level.clone(),
        ..Default::default()
    })?;

    let config = RelayConfig::from_env()?;
    let body = message_body(&args)?;

    let session = BrokerSession::connect(&config).await?;
    session.enable_publisher_confirms().await?;
    session.publish(&body).await?;

    info!(
        queue = %session.queue(),
        payload_len = body.len(),
        "Message published"
    );

    session.close().await;
    Ok(())
}
