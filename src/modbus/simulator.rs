// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated TRIO UPS served over Modbus TCP
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client". The simulator is the server: it answers
//! holding register reads the way the UPS behind its gateway does, including
//! the `0xFFFF` "no data" sentinel. It backs the `ups_simulator` binary and the
//! client integration tests.

use std::{
    collections::HashMap,
    future,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use log::{debug, error, info};
use tokio::net::TcpListener;
use tokio_modbus::{
    prelude::*,
    server::tcp::{accept_tcp_connection, Server},
};

use super::registers::{BATTERY_VOLTAGE, STATUS_FUNCTIONS};
use super::status::BATTERY_MODE_MASK;

/// Shared holding register bank
type RegisterBank = Arc<Mutex<HashMap<u16, u16>>>;

/// Modbus service answering like a TRIO UPS on mains power.
///
/// Clones share the same register bank, so values changed through one handle
/// are served to every connection.
#[derive(Debug, Clone)]
pub struct UpsSimulator {
    holding_registers: RegisterBank,
}

impl Default for UpsSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl tokio_modbus::server::Service for UpsSimulator {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        let res = match req {
            Request::ReadHoldingRegisters(addr, cnt) => match self.holding_registers.lock() {
                Ok(registers) => {
                    register_read(&registers, addr, cnt).map(Response::ReadHoldingRegisters)
                }
                Err(_) => Err(ExceptionCode::ServerDeviceFailure),
            },
            _ => {
                error!("SIMULATOR: Exception::IllegalFunction - Unimplemented function code in request: {req:?}");
                Err(ExceptionCode::IllegalFunction)
            }
        };
        future::ready(res)
    }
}

impl UpsSimulator {
    /// Simulator pre-filled with a healthy UPS on mains power.
    pub fn new() -> Self {
        let mut registers = HashMap::new();
        // Status Functions and Status Interface: battery present, sensor connected
        for (offset, word) in [0x0000u16, 0x1100, 0x0000, 0x0000].into_iter().enumerate() {
            registers.insert(STATUS_FUNCTIONS + offset as u16, word);
        }
        registers.insert(0x2006, 24000); // Output Voltage, 24.000 V
        registers.insert(0x2007, 1500); // Output Current, mA
        registers.insert(BATTERY_VOLTAGE, 26000); // 26.000 V
        registers.insert(0x200B, 200); // Battery Current, mA
        registers.insert(0x200D, 298); // Battery Temperature, K
        registers.insert(0x200E, 303); // Device Temperature, K
        registers.insert(0x203C, 0xFFFF); // no shutdown timer armed
        registers.insert(0x2024, 0x0000);
        registers.insert(0x2025, 600); // Battery Mode Time, 10 min in seconds
        registers.insert(0x2026, 0xFFFF);
        registers.insert(0x2027, 0xFFFF);
        registers.insert(0x1064, 120); // Battery Capacity
        registers.insert(0x0010, u16::from_be_bytes(*b"TR"));
        registers.insert(0x0011, u16::from_be_bytes(*b"IO"));
        Self {
            holding_registers: Arc::new(Mutex::new(registers)),
        }
    }

    /// Set one holding register, creating it when absent.
    pub fn set_register(&self, address: u16, value: u16) {
        if let Ok(mut registers) = self.holding_registers.lock() {
            registers.insert(address, value);
        }
    }

    pub fn register(&self, address: u16) -> Option<u16> {
        self.holding_registers
            .lock()
            .ok()
            .and_then(|registers| registers.get(&address).copied())
    }

    /// Switch between mains and battery operation.
    pub fn set_battery_mode(&self, active: bool) {
        if let Ok(mut registers) = self.holding_registers.lock() {
            let word = registers.entry(STATUS_FUNCTIONS).or_insert(0);
            if active {
                *word |= BATTERY_MODE_MASK;
            } else {
                *word &= !BATTERY_MODE_MASK;
            }
        }
    }

    /// Serve Modbus TCP connections on `listener` until the task is aborted.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!("UPS simulator listening on {}", addr);
        }
        let server = Server::new(listener);

        // Every connection shares the same register bank
        let on_connected = move |stream, socket_addr: SocketAddr| {
            let service = self.clone();
            debug!("Simulator connection from {}", socket_addr);
            async move {
                accept_tcp_connection(stream, socket_addr, move |_| Ok(Some(service.clone())))
            }
        };

        let on_process_error = |err| {
            error!("Simulator connection error: {err}");
        };

        server.serve(&on_connected, on_process_error).await?;
        Ok(())
    }
}

/// Read registers from the bank.
///
/// Unknown addresses raise `IllegalDataAddress`, as the real gateway does.
fn register_read(
    registers: &HashMap<u16, u16>,
    addr: u16,
    cnt: u16,
) -> Result<Vec<u16>, ExceptionCode> {
    let mut response_values = vec![0; cnt.into()];
    for i in 0..cnt {
        let reg_addr = addr.wrapping_add(i);
        match registers.get(&reg_addr) {
            Some(value) => response_values[i as usize] = *value,
            None => {
                debug!("SIMULATOR: Exception::IllegalDataAddress 0x{reg_addr:04X}");
                return Err(ExceptionCode::IllegalDataAddress);
            }
        }
    }
    Ok(response_values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_address_is_illegal() {
        let simulator = UpsSimulator::new();
        let registers = simulator.holding_registers.lock().unwrap();
        assert_eq!(
            register_read(&registers, 0x4000, 1),
            Err(ExceptionCode::IllegalDataAddress)
        );
    }

    #[test]
    fn battery_mode_toggles_status_bit() {
        let simulator = UpsSimulator::new();
        simulator.set_battery_mode(true);
        assert_eq!(simulator.register(STATUS_FUNCTIONS), Some(0x0004));
        simulator.set_battery_mode(false);
        assert_eq!(simulator.register(STATUS_FUNCTIONS), Some(0x0000));
    }

    #[test]
    fn device_name_is_packed_ascii() {
        let simulator = UpsSimulator::new();
        let registers = simulator.holding_registers.lock().unwrap();
        assert_eq!(register_read(&registers, 0x0010, 2), Ok(vec![0x5452, 0x494F]));
    }
}
