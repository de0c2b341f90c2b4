// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Field-bus client
//!
//! The poll loop only depends on the narrow [`FieldBusClient`] contract:
//! connect, read holding registers, close. [`TokioModbusClient`] implements it
//! over Modbus TCP with `tokio-modbus`; tests substitute scripted doubles.
//!
//! Every call is bounded by the configured timeout so that a silent gateway
//! cannot stall a cycle.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::time::timeout;
use tokio_modbus::client::{tcp, Context};
use tokio_modbus::prelude::*;

use super::error::FieldBusError;

/// Connection to a Modbus device.
///
/// The orchestrator opens a fresh connection every cycle and always closes it
/// at the end of the cycle.
#[async_trait]
pub trait FieldBusClient: Send + fmt::Debug {
    /// Open the connection to the device
    async fn connect(&mut self) -> Result<(), FieldBusError>;

    /// Read `count` holding registers starting at `address` from `unit_id`
    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, FieldBusError>;

    /// Release the connection. Closing a closed client is a no-op.
    async fn close(&mut self);

    /// `host:port` of the device, for logging
    fn endpoint(&self) -> String;
}

/// Modbus TCP client backed by `tokio-modbus`.
pub struct TokioModbusClient {
    host: String,
    port: u16,
    unit_id: u8,
    timeout: Duration,
    context: Option<Context>,
}

impl fmt::Debug for TokioModbusClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioModbusClient")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("unit_id", &self.unit_id)
            .field("timeout", &self.timeout)
            .field("connected", &self.context.is_some())
            .finish()
    }
}

impl TokioModbusClient {
    pub fn new(host: impl Into<String>, port: u16, unit_id: u8, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            unit_id,
            timeout,
            context: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.context.is_some()
    }
}

/// Resolve `host:port` to the first socket address
async fn resolve(endpoint: String) -> Result<SocketAddr, FieldBusError> {
    let mut addresses = tokio::net::lookup_host(endpoint.as_str())
        .await
        .map_err(|e| FieldBusError::Connect {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;
    addresses.next().ok_or_else(|| FieldBusError::Connect {
        endpoint: endpoint.clone(),
        reason: "host did not resolve to any address".to_string(),
    })
}

#[async_trait]
impl FieldBusClient for TokioModbusClient {
    async fn connect(&mut self) -> Result<(), FieldBusError> {
        if self.context.is_some() {
            return Ok(());
        }

        let socket_addr = timeout(self.timeout, resolve(self.endpoint()))
            .await
            .map_err(|_| FieldBusError::Timeout(self.timeout))??;

        debug!("Connecting to Modbus gateway at {}", socket_addr);
        let context = timeout(
            self.timeout,
            tcp::connect_slave(socket_addr, Slave(self.unit_id)),
        )
        .await
        .map_err(|_| FieldBusError::Timeout(self.timeout))?
        .map_err(|e| FieldBusError::Connect {
            endpoint: self.endpoint(),
            reason: e.to_string(),
        })?;

        self.context = Some(context);
        Ok(())
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, FieldBusError> {
        let limit = self.timeout;
        let context = self.context.as_mut().ok_or(FieldBusError::NotConnected)?;
        context.set_slave(Slave(unit_id));

        let response = timeout(limit, context.read_holding_registers(address, count))
            .await
            .map_err(|_| FieldBusError::Timeout(limit))?;

        match response {
            Ok(Ok(words)) => Ok(words),
            Ok(Err(exception)) => Err(FieldBusError::Exception(format!("{exception:?}"))),
            Err(e) => Err(FieldBusError::Transport(e.to_string())),
        }
    }

    async fn close(&mut self) {
        if let Some(mut context) = self.context.take() {
            match timeout(self.timeout, context.disconnect()).await {
                Ok(Err(e)) => warn!("Error closing Modbus connection: {}", e),
                Ok(_) => debug!("Modbus connection to {} closed", self.endpoint()),
                Err(_) => warn!("Closing Modbus connection timed out"),
            }
        }
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_without_connection_is_rejected() {
        let mut client = TokioModbusClient::new("127.0.0.1", 502, 1, Duration::from_secs(1));
        let err = client.read_holding_registers(0x2000, 4, 1).await.unwrap_err();
        assert_eq!(err, FieldBusError::NotConnected);
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut client = TokioModbusClient::new("127.0.0.1", port, 1, Duration::from_secs(2));
        assert!(client.connect().await.is_err());
        assert!(!client.is_connected());
        client.close().await;
    }
}
