// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::net::TcpListener;

use ups_monitor::modbus::UpsSimulator;

/// Modbus TCP server answering like a TRIO UPS behind its gateway
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Listen address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Listen port
    #[clap(long, default_value = "5020")]
    port: u16,

    /// Start with the UPS running on battery
    #[clap(long)]
    battery_mode: bool,

    /// Battery voltage in millivolts
    #[clap(long)]
    battery_millivolts: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();

    let simulator = UpsSimulator::new();
    simulator.set_battery_mode(args.battery_mode);
    if let Some(millivolts) = args.battery_millivolts {
        simulator.set_register(ups_monitor::modbus::registers::BATTERY_VOLTAGE, millivolts);
    }

    let listener = TcpListener::bind((args.address.as_str(), args.port)).await?;
    info!("UPS simulator listening on {}", listener.local_addr()?);

    tokio::select! {
        result = simulator.serve(listener) => result?,
        _ = tokio::signal::ctrl_c() => info!("Stopping UPS simulator"),
    }
    Ok(())
}
