// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use clap::Parser;
use std::time::Duration;

use ups_monitor::display::format_reading;
use ups_monitor::modbus::registers::{STATUS_FUNCTIONS, STATUS_FUNCTIONS_WORDS};
use ups_monitor::modbus::{
    decode_reading, FieldBusClient, RegisterCatalog, StatusFlags, TokioModbusClient,
};
use ups_monitor::monitor::RegisterReading;

/// One-shot dump of the TRIO UPS register catalog
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Modbus gateway address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Modbus gateway port
    #[clap(long, default_value = "502")]
    port: u16,

    /// Unit id of the UPS
    #[clap(long, default_value = "1")]
    unit_id: u8,

    /// Timeout of every request in seconds
    #[clap(long, default_value = "5")]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();

    let mut client = TokioModbusClient::new(
        args.address,
        args.port,
        args.unit_id,
        Duration::from_secs(args.timeout),
    );
    println!("Connecting to Modbus gateway at {}", client.endpoint());
    client.connect().await?;

    let status = match client
        .read_holding_registers(STATUS_FUNCTIONS, STATUS_FUNCTIONS_WORDS, args.unit_id)
        .await
    {
        Ok(words) => {
            println!("Status words: {:04X?}", words);
            StatusFlags::from_words(&words)
        }
        Err(e) => {
            println!("Status registers unavailable: {e}");
            StatusFlags::degraded()
        }
    };
    println!("{:?}", status);

    for spec in RegisterCatalog::standard().lookup() {
        let read = client
            .read_holding_registers(spec.address, spec.word_count, args.unit_id)
            .await;
        let reading = RegisterReading {
            spec: spec.clone(),
            value: decode_reading(spec, read),
        };
        println!("{}", format_reading(&reading));
    }

    client.close().await;
    Ok(())
}
