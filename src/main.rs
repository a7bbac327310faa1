//! mqtt-outbound - publish messages to an MQTT broker from the command line

use clap::{Parser, Subcommand};
use mqtt_outbound::adapter::{resolve_connect_request, ConnectionBuilder, PublishAdapter};
use mqtt_outbound::config::AdapterConfig;
use mqtt_outbound::observability::init_default_logging;
use mqtt_outbound::protocol::{OutboundMessage, TOPIC_HEADER};
use mqtt_outbound::transport::mqtt::RumqttcClient;
use mqtt_outbound::transport::MqttTransport;
use std::error::Error;
use std::path::PathBuf;
use std::process;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, Level};

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Publish messages to an MQTT broker
#[derive(Parser)]
#[command(name = "mqtt-outbound")]
#[command(about = "Publish messages to an MQTT broker")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "MQTT_OUTBOUND_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a single message
    Publish {
        /// Message body, published as its UTF-8 bytes
        message: String,
        /// Publish to this topic instead of the configured one
        #[arg(long)]
        topic: Option<String>,
    },
    /// Publish every line read from stdin as its own message
    Pipe {
        /// Publish to this topic instead of the configured one
        #[arg(long)]
        topic: Option<String>,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level_override = match cli.verbose {
        0 => None,
        1 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    };
    init_default_logging(level_override);

    info!("Starting mqtt-outbound v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Publish { message, topic } => {
            publish_message(config, message, topic.as_deref()).await
        }
        Commands::Pipe { topic } => publish_stdin(config, topic.as_deref()).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_configuration(config_path: &Option<PathBuf>) -> CliResult<AdapterConfig> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(AdapterConfig::load_from_file(path)?)
        }
        None => {
            let default_paths = ["mqtt-outbound.toml", "config/mqtt-outbound.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(AdapterConfig::load_from_file(&path)?);
                }
            }

            Err("No configuration file found. Please provide one with -c/--config \
                 or create mqtt-outbound.toml"
                .into())
        }
    }
}

/// Connect and wrap the client in a publish adapter
async fn connect(
    config: &AdapterConfig,
) -> CliResult<(ConnectionBuilder<MqttTransport>, PublishAdapter<RumqttcClient>)> {
    let builder = ConnectionBuilder::new(&config.connection, MqttTransport::new())?;
    info!(
        server_uri = %builder.request().server_uri,
        client_id = %builder.request().client_id,
        "Connecting to broker"
    );

    let client = builder.client().await?;
    let adapter = PublishAdapter::new(client, config.publish.clone())?;
    Ok((builder, adapter))
}

fn outbound_message(body: String, topic: Option<&str>) -> OutboundMessage {
    let message = OutboundMessage::new(body.into_bytes());
    match topic {
        Some(topic) => message.with_header(TOPIC_HEADER, topic),
        None => message,
    }
}

async fn publish_message(config: AdapterConfig, body: String, topic: Option<&str>) -> CliResult<()> {
    let (builder, adapter) = connect(&config).await?;

    let result = adapter.handle(&outbound_message(body, topic)).await;
    builder.shutdown().await?;

    result?;
    info!("Message published");
    Ok(())
}

async fn publish_stdin(config: AdapterConfig, topic: Option<&str>) -> CliResult<()> {
    let (builder, adapter) = connect(&config).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut published = 0usize;

    let result: CliResult<()> = async {
        loop {
            tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => {
                        adapter.handle(&outbound_message(line, topic)).await?;
                        published += 1;
                    }
                    None => break,
                },
                _ = signal::ctrl_c() => {
                    info!("Received SIGINT, stopping");
                    break;
                }
            }
        }
        Ok(())
    }
    .await;

    info!(published, "Finished reading stdin");
    builder.shutdown().await?;
    result
}

fn handle_config_command(config: &AdapterConfig, show: bool) -> CliResult<()> {
    let request = resolve_connect_request(&config.connection)?;
    info!(
        server_uri = %request.server_uri,
        topic = %config.publish.topic,
        "Configuration is valid"
    );

    if show {
        // Secrets serialize masked
        println!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}
