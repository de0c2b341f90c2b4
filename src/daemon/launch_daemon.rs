// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Management Module
//!
//! Runs and manages the background tasks of the UPS monitor. The only task
//! is the poll loop (field bus, SOC, CSV log and MQTT); it runs on its own
//! Tokio task and checks the shared `running` flag to terminate gracefully.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::Config;
use crate::modbus::TokioModbusClient;
use crate::monitor::{MonitorContext, PollOrchestrator};
use crate::sinks::payload::topic_for;
use crate::sinks::{CsvLogSink, HeaderStatus, MqttPublisher, SinkKind};
use crate::utility::{installation_id, topic_safe, ErrorJournal};

/// How long `join` waits for each task
const JOIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Represents a daemon task manager that coordinates the background services
///
/// # Fields
///
/// * `tasks` - Collection of handles to running tasks for management and cleanup
/// * `running` - Atomic flag shared between tasks to coordinate shutdown
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance with no tasks and the running flag set
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Launch all configured tasks
    ///
    /// # Errors
    ///
    /// Fails when the installation id, the CSV log header or the register
    /// catalog cannot be set up. Unreachable devices are not errors: the poll
    /// loop retries them.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        self.start_poll_loop(config).await
    }

    /// Build the orchestrator from the configuration and spawn its loop
    async fn start_poll_loop(&mut self, config: &Config) -> Result<()> {
        let id = installation_id::load_or_create(&config.storage.id_file)?;
        info!("Installation id: {}", id);

        let journal = ErrorJournal::new(config.storage.error_log.clone());

        let field_bus = TokioModbusClient::new(
            config.modbus.host.clone(),
            config.modbus.port,
            config.modbus.unit_id,
            config.modbus.timeout(),
        );

        let mqtt = config
            .mqtt
            .as_ref()
            .filter(|_| config.sink_enabled(SinkKind::Mqtt));
        let topic = mqtt.map(|mqtt| topic_for(&mqtt.base_topic, &topic_safe(&id)));

        let context = MonitorContext::from_config(config, topic.clone())?;
        let mut orchestrator = PollOrchestrator::new(context, Box::new(field_bus), journal)
            .with_history(config.soc.history());

        if let (Some(mqtt), Some(topic)) = (mqtt, topic) {
            let client_id = mqtt
                .client_id
                .clone()
                .unwrap_or_else(|| format!("ups-monitor-{id}"));
            info!(
                "Publishing to mqtt://{} on topic {} as {}",
                mqtt.endpoint(),
                topic,
                client_id
            );
            orchestrator =
                orchestrator.with_publisher(Box::new(MqttPublisher::from_config(mqtt, client_id)));
        } else {
            info!("MQTT sink is disabled");
        }

        if config.sink_enabled(SinkKind::Csv) {
            let csv_log =
                CsvLogSink::new(config.storage.values_csv.clone(), config.storage.log_interval());
            let status = csv_log.ensure_header().with_context(|| {
                format!("Failed to prepare CSV log {}", csv_log.path().display())
            })?;
            match status {
                HeaderStatus::Created => info!("Created CSV log {}", csv_log.path().display()),
                HeaderStatus::Repaired => warn!("Repaired CSV header of {}", csv_log.path().display()),
                HeaderStatus::Inserted => warn!("Inserted missing CSV header in {}", csv_log.path().display()),
                HeaderStatus::Present => debug!("CSV log header is up to date"),
            }
            orchestrator = orchestrator.with_csv_log(csv_log);
        } else {
            info!("CSV sink is disabled");
        }

        let running = self.running.clone();
        let task = tokio::spawn(async move { orchestrator.run(running).await });
        self.tasks.push(task);
        info!("Poll loop started");
        Ok(())
    }

    /// Signal all tasks to terminate
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for all tasks to complete
    ///
    /// Task panics and errors are logged, never returned.
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match time::timeout(JOIN_TIMEOUT, task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => log::error!("Task failed: {:#}", e),
                Ok(Err(e)) => log::error!("Task panicked: {}", e),
                Err(_) => {
                    warn!("Task did not complete within timeout period, may be hung");
                }
            }
        }
        Ok(())
    }
}
