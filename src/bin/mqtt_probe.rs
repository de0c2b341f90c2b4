// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use ups_monitor::config::Config;
use ups_monitor::sinks::{MessagePublisher, MqttPublisher};

/// Connect to the configured MQTT broker and publish a single test message
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Configuration file holding the mqtt section
    #[clap(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Topic, `{base_topic}/probe` by default
    #[clap(long)]
    topic: Option<String>,

    /// Message body
    #[clap(long, default_value = "{\"probe\":true}")]
    message: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();
    let config = Config::from_file(&args.config)?;
    let Some(mqtt) = config.mqtt.as_ref() else {
        anyhow::bail!("{} has no mqtt section", args.config.display());
    };

    let topic = args
        .topic
        .unwrap_or_else(|| format!("{}/probe", mqtt.base_topic.trim_end_matches('/')));

    let mut publisher = MqttPublisher::from_config(mqtt, "ups-monitor-probe");
    println!("Connecting to MQTT broker at {}", publisher.endpoint());
    publisher.connect().await?;
    publisher.publish(&topic, args.message.into_bytes()).await?;
    println!("Published test message on {}", topic);
    publisher.shutdown().await?;

    Ok(())
}
