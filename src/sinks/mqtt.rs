// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! MQTT publisher implementation
//!
//! Publishes the UPS payload to an MQTT broker with `rumqttc`. The event loop
//! runs on its own task; when it reports an error the publisher is marked as
//! disconnected and the orchestrator reconnects on the next cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, MqttOptions, Packet, QoS};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::MessagePublisher;
use crate::config::MqttConfig;

/// Capacity of the request channel between the client and its event loop
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// MQTT publisher
///
/// Keeps one long-lived broker session. `connect()` waits for the broker's
/// CONNACK so that a refused or unreachable broker is reported immediately.
#[derive(Debug)]
pub struct MqttPublisher {
    host: String,
    port: u16,
    client_id: String,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connect_timeout: Duration,
    publish_timeout: Duration,
    client: Option<AsyncClient>,
    event_loop: Option<JoinHandle<()>>,
    connected: Arc<AtomicBool>,
}

impl MqttPublisher {
    pub fn new(host: impl Into<String>, port: u16, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: client_id.into(),
            credentials: None,
            keep_alive: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(5),
            publish_timeout: Duration::from_secs(5),
            client: None,
            event_loop: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build a publisher from the `mqtt` configuration section
    pub fn from_config(config: &MqttConfig, client_id: impl Into<String>) -> Self {
        let mut publisher = Self::new(config.host.clone(), config.port, client_id)
            .with_keep_alive(Duration::from_secs(config.keep_alive_secs))
            .with_connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .with_publish_timeout(Duration::from_secs(config.publish_timeout_secs));
        if !config.username.is_empty() {
            publisher = publisher.with_credentials(config.username.clone(), config.password.clone());
        }
        publisher
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        // rumqttc rejects keep-alive intervals below one second
        self.keep_alive = keep_alive.max(Duration::from_secs(1));
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_publish_timeout(mut self, publish_timeout: Duration) -> Self {
        self.publish_timeout = publish_timeout;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn teardown(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        self.client = None;
        if let Some(handle) = self.event_loop.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl MessagePublisher for MqttPublisher {
    async fn connect(&mut self) -> Result<()> {
        self.teardown();

        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username.clone(), password.clone());
        }

        let (client, mut event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        let (ack_tx, ack_rx) = oneshot::channel::<Result<(), String>>();
        let connected = self.connected.clone();
        let endpoint = self.endpoint();

        let handle = tokio::spawn(async move {
            let mut ack_tx = Some(ack_tx);
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        let outcome = if ack.code == ConnectReturnCode::Success {
                            connected.store(true, Ordering::SeqCst);
                            Ok(())
                        } else {
                            Err(format!("broker refused connection: {:?}", ack.code))
                        };
                        let refused = outcome.is_err();
                        if let Some(tx) = ack_tx.take() {
                            let _ = tx.send(outcome);
                        }
                        if refused {
                            break;
                        }
                    }
                    Ok(event) => debug!("MQTT event: {:?}", event),
                    Err(e) => {
                        connected.store(false, Ordering::SeqCst);
                        match ack_tx.take() {
                            Some(tx) => {
                                let _ = tx.send(Err(e.to_string()));
                            }
                            None => warn!("MQTT connection to {} lost: {}", endpoint, e),
                        }
                        break;
                    }
                }
            }
        });

        self.client = Some(client);
        self.event_loop = Some(handle);

        match timeout(self.connect_timeout, ack_rx).await {
            Ok(Ok(Ok(()))) => {
                info!("Connected to MQTT broker {}", self.endpoint());
                Ok(())
            }
            Ok(Ok(Err(reason))) => {
                self.teardown();
                Err(anyhow!("MQTT connection to {} failed: {}", self.endpoint(), reason))
            }
            Ok(Err(_)) => {
                self.teardown();
                Err(anyhow!("MQTT event loop for {} stopped", self.endpoint()))
            }
            Err(_) => {
                self.teardown();
                Err(anyhow!(
                    "MQTT connection to {} timed out after {:?}",
                    self.endpoint(),
                    self.connect_timeout
                ))
            }
        }
    }

    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<()> {
        if !self.is_connected() {
            return Err(anyhow!("Not connected to MQTT broker {}", self.endpoint()));
        }
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| anyhow!("MQTT client not initialized"))?;

        match timeout(
            self.publish_timeout,
            client.publish(topic, QoS::AtLeastOnce, false, payload),
        )
        .await
        {
            Ok(Ok(())) => {
                debug!("Published message to topic: {}", topic);
                Ok(())
            }
            Ok(Err(e)) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(anyhow!("MQTT publish to {} failed: {}", topic, e))
            }
            Err(_) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(anyhow!(
                    "MQTT publish to {} timed out after {:?}",
                    topic,
                    self.publish_timeout
                ))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn publisher_type(&self) -> &str {
        "mqtt"
    }

    async fn shutdown(&mut self) -> Result<()> {
        if let Some(client) = &self.client {
            match timeout(self.publish_timeout, client.disconnect()).await {
                Ok(Ok(())) => info!("Disconnected from MQTT broker {}", self.endpoint()),
                Ok(Err(e)) => warn!("Error disconnecting from MQTT broker: {}", e),
                Err(_) => warn!("MQTT disconnect timed out"),
            }
        }
        self.teardown();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_before_connect_fails() {
        let mut publisher = MqttPublisher::new("127.0.0.1", 1883, "test");
        assert!(!publisher.is_connected());
        assert!(publisher.publish("ups/test", b"{}".to_vec()).await.is_err());
    }

    #[tokio::test]
    async fn unreachable_broker_is_reported() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut publisher = MqttPublisher::new("127.0.0.1", port, "test")
            .with_connect_timeout(Duration::from_secs(2));
        assert!(publisher.connect().await.is_err());
        assert!(!publisher.is_connected());
        assert_eq!(publisher.publisher_type(), "mqtt");
    }
}
