// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Poll cycle orchestrator
//!
//! One cycle, strictly in order:
//!
//! 0. make sure the long-lived broker connection is up, reconnecting it
//!    when it dropped
//! 1. connect to the field bus (fresh connection every cycle)
//! 2. read the Status Functions register into [`StatusFlags`]
//! 3. read and decode every catalog register, each one independently
//! 4. derive the SOC from the battery voltage and record it
//! 5. build the immutable [`PollResult`]
//! 6. publish it when step 0 left the broker connected
//! 7. append it to the CSV log when the log interval has elapsed
//! 8. close the field-bus connection, whatever happened before
//!
//! A failed field-bus connection skips steps 2 to 7 and the loop waits for
//! the backoff delay; the broker is still kept alive by step 0. A broker
//! failure only skips step 6. Every broker loss or failed reconnect is
//! written to the error journal. Errors and panics inside a cycle end that
//! cycle, never the loop.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Local;
use futures::FutureExt;
use log::{debug, info, trace, warn};

use super::backoff::BackoffStrategy;
use super::result::{PollResult, RegisterReading};
use super::state::ConnectionState;
use crate::config::Config;
use crate::display::{render_report, render_trend, trend::TREND_WINDOW};
use crate::modbus::registers::{BATTERY_VOLTAGE, STATUS_FUNCTIONS, STATUS_FUNCTIONS_WORDS};
use crate::modbus::{
    decode_reading, DecodedValue, FieldBusClient, RawReading, RegisterCatalog, StatusFlags,
};
use crate::sinks::{CsvLogSink, MessagePublisher, UpsPayload};
use crate::soc::{estimate_soc, SocCalibration, SocHistory, SocSample};
use crate::utility::ErrorJournal;

/// Granularity at which a sleeping loop notices a shutdown request
const SHUTDOWN_POLL: Duration = Duration::from_secs(1);

/// Settings the orchestrator needs, built once at startup.
#[derive(Debug, Clone)]
pub struct MonitorContext {
    pub catalog: RegisterCatalog,
    pub calibration: SocCalibration,
    pub unit_id: u8,
    /// MQTT topic, `None` when nothing is published
    pub topic: Option<String>,
    pub battery_mode_interval: Duration,
    pub mains_interval: Duration,
    pub backoff: BackoffStrategy,
    /// Print the report and the SOC trend after every cycle
    pub console: bool,
}

impl MonitorContext {
    pub fn from_config(config: &Config, topic: Option<String>) -> Result<Self> {
        Ok(Self {
            catalog: config.catalog()?,
            calibration: config.soc.calibration,
            unit_id: config.modbus.unit_id,
            topic,
            battery_mode_interval: config.polling.battery_mode_interval(),
            mains_interval: config.polling.mains_interval(),
            backoff: config.polling.backoff.clone(),
            console: config.display.console,
        })
    }
}

impl Default for MonitorContext {
    fn default() -> Self {
        Self {
            catalog: RegisterCatalog::standard(),
            calibration: SocCalibration::default(),
            unit_id: 1,
            topic: None,
            battery_mode_interval: Duration::from_secs(5),
            mains_interval: Duration::from_secs(10),
            backoff: BackoffStrategy::default(),
            console: false,
        }
    }
}

/// What a completed cycle did
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub result: Arc<PollResult>,
    pub published: bool,
    pub logged: bool,
}

/// Outcome of one poll cycle
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The field bus could not be reached; nothing was read
    FieldBusUnavailable,
    /// Registers were read and handed to the sinks
    Completed(CycleReport),
    /// The cycle was aborted by an unexpected error
    Failed(String),
}

impl CycleOutcome {
    pub fn battery_mode(&self) -> bool {
        match self {
            CycleOutcome::Completed(report) => report.result.status().battery_mode,
            _ => false,
        }
    }
}

/// Drives the poll loop and owns every resource it touches.
#[derive(Debug)]
pub struct PollOrchestrator {
    context: MonitorContext,
    field_bus: Box<dyn FieldBusClient>,
    publisher: Option<Box<dyn MessagePublisher>>,
    csv_log: Option<CsvLogSink>,
    journal: ErrorJournal,
    history: SocHistory,
    field_bus_state: ConnectionState,
    broker_state: ConnectionState,
}

impl PollOrchestrator {
    pub fn new(
        context: MonitorContext,
        field_bus: Box<dyn FieldBusClient>,
        journal: ErrorJournal,
    ) -> Self {
        Self {
            context,
            field_bus,
            publisher: None,
            csv_log: None,
            journal,
            history: SocHistory::default(),
            field_bus_state: ConnectionState::Disconnected,
            broker_state: ConnectionState::Disconnected,
        }
    }

    pub fn with_publisher(mut self, publisher: Box<dyn MessagePublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_csv_log(mut self, csv_log: CsvLogSink) -> Self {
        self.csv_log = Some(csv_log);
        self
    }

    pub fn with_history(mut self, history: SocHistory) -> Self {
        self.history = history;
        self
    }

    pub fn field_bus_state(&self) -> &ConnectionState {
        &self.field_bus_state
    }

    pub fn broker_state(&self) -> &ConnectionState {
        &self.broker_state
    }

    pub fn history(&self) -> &SocHistory {
        &self.history
    }

    /// Run cycles until `running` is cleared, then release the broker.
    pub async fn run(&mut self, running: Arc<AtomicBool>) -> Result<()> {
        info!(
            "Polling {} every {:?} on mains, {:?} on battery",
            self.field_bus.endpoint(),
            self.context.mains_interval,
            self.context.battery_mode_interval
        );

        while running.load(Ordering::SeqCst) {
            let outcome = self.run_cycle().await;
            let delay = self.next_delay(&outcome);
            debug!("Waiting {:?} before next cycle", delay);
            sleep_while_running(delay, &running).await;
        }

        info!("Poll loop stopping");
        if let Some(publisher) = self.publisher.as_mut() {
            if let Err(e) = publisher.shutdown().await {
                warn!("Error shutting down {} publisher: {:#}", publisher.publisher_type(), e);
            }
        }
        self.broker_state.mark_closed();
        Ok(())
    }

    /// Run one cycle. Never panics and always releases the field bus.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let outcome = match AssertUnwindSafe(self.cycle()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                self.journal
                    .record_error(&format!("Unexpected error during poll cycle: {message}"));
                CycleOutcome::Failed(message)
            }
        };

        self.field_bus.close().await;
        self.field_bus_state.mark_closed();
        outcome
    }

    /// Wait before the cycle following `outcome`
    pub fn next_delay(&self, outcome: &CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::FieldBusUnavailable => self
                .context
                .backoff
                .delay(self.field_bus_state.retry_count()),
            CycleOutcome::Completed(report) if report.result.status().battery_mode => {
                self.context.battery_mode_interval
            }
            CycleOutcome::Completed(_) | CycleOutcome::Failed(_) => self.context.mains_interval,
        }
    }

    async fn cycle(&mut self) -> CycleOutcome {
        // 0. broker connection, independent of the field bus
        let broker_ready = self.ensure_broker().await;

        // 1. field-bus connection
        self.field_bus_state.begin_connect();
        if let Err(e) = self.field_bus.connect().await {
            let failures = self.field_bus_state.mark_failed(e.to_string());
            self.journal.record_error(&format!(
                "Modbus connection failed to {}: {} (attempt {})",
                self.field_bus.endpoint(),
                e,
                failures
            ));
            return CycleOutcome::FieldBusUnavailable;
        }
        self.field_bus_state.mark_connected();
        info!("Modbus connected to {}", self.field_bus.endpoint());

        let unit_id = self.context.unit_id;
        let mut last_read_error = None;

        // 2. status flags
        let status = match self
            .field_bus
            .read_holding_registers(STATUS_FUNCTIONS, STATUS_FUNCTIONS_WORDS, unit_id)
            .await
        {
            Ok(words) => StatusFlags::from_words(&words),
            Err(e) => {
                self.journal
                    .record_error(&format!("Status registers unavailable: {e}"));
                last_read_error = Some(e.to_string());
                StatusFlags::degraded()
            }
        };
        debug!("Status flags: {:?}", status);

        // 3. every catalog register, failures isolated
        let mut readings = Vec::with_capacity(self.context.catalog.len());
        for spec in self.context.catalog.lookup() {
            let read = self
                .field_bus
                .read_holding_registers(spec.address, spec.word_count, unit_id)
                .await
                .map(|words| RawReading {
                    address: spec.address,
                    words,
                    fetched_at: Local::now(),
                });
            if let Ok(raw) = &read {
                trace!("{:?}", raw);
            }
            let value = decode_reading(spec, read.map(|raw| raw.words));
            if let DecodedValue::Error(e) = &value {
                self.journal.record_error(&format!(
                    "Error reading register {} (0x{:04X}): {}",
                    spec.label, spec.address, e
                ));
                last_read_error = Some(e.to_string());
            }
            readings.push(RegisterReading {
                spec: spec.clone(),
                value,
            });
        }
        if let Some(error) = last_read_error {
            self.field_bus_state.mark_degraded(error);
        }

        // 4. battery voltage and SOC
        let timestamp = Local::now();
        let voltage_raw = match readings
            .iter()
            .find(|reading| reading.spec.address == BATTERY_VOLTAGE)
        {
            Some(reading) => match &reading.value {
                DecodedValue::Numeric { raw, .. } => u16::try_from(*raw).ok(),
                _ => None,
            },
            None => match self
                .field_bus
                .read_holding_registers(BATTERY_VOLTAGE, 1, unit_id)
                .await
            {
                Ok(words) => words.first().copied(),
                Err(e) => {
                    self.journal
                        .record_error(&format!("Error reading battery voltage: {e}"));
                    None
                }
            },
        };
        let soc = voltage_raw
            .and_then(|raw| estimate_soc(raw, &self.context.calibration))
            .map(|percent| SocSample { timestamp, percent });
        let battery_voltage = soc.and(voltage_raw).map(|raw| f64::from(raw) / 1000.0);
        match &soc {
            Some(sample) => {
                self.history.record(sample.timestamp, sample.percent);
                info!("Calculated SOC: {:.2}%", sample.percent);
            }
            None => warn!("Battery Voltage unavailable, cannot calculate SOC"),
        }

        // 5. immutable result
        let result = Arc::new(PollResult::new(
            timestamp,
            status,
            readings,
            battery_voltage,
            soc,
        ));

        if self.context.console {
            println!("{}", render_report(&result));
            println!(
                "{}\n",
                render_trend(&self.history.windowed(TREND_WINDOW), timestamp)
            );
        }

        // 6. publish
        let published = broker_ready && self.publish(&result).await;

        // 7. CSV log
        let mut logged = false;
        if let Some(csv_log) = self.csv_log.as_mut() {
            match csv_log.append(&result, published, Instant::now()) {
                Ok(written) => {
                    if written {
                        info!("Data logged to {}", csv_log.path().display());
                    }
                    logged = written;
                }
                Err(e) => self
                    .journal
                    .record_error(&format!("CSV log write failed: {e:#}")),
            }
        }

        CycleOutcome::Completed(CycleReport {
            result,
            published,
            logged,
        })
    }

    /// Bring the broker connection up when it is not. A connection that
    /// dropped since the last cycle is journaled before reconnecting.
    /// Returns whether the broker is connected.
    async fn ensure_broker(&mut self) -> bool {
        let Some(publisher) = self.publisher.as_mut() else {
            return false;
        };
        if self.context.topic.is_none() {
            return false;
        }

        if publisher.is_connected() {
            if !self.broker_state.is_connected() {
                self.broker_state.mark_connected();
            }
            return true;
        }

        if self.broker_state.is_connected() {
            self.broker_state.mark_degraded("connection lost");
            self.journal
                .record_error("MQTT connection to broker lost, reconnecting");
        }

        self.broker_state.begin_connect();
        match publisher.connect().await {
            Ok(()) => {
                self.broker_state.mark_connected();
                info!("MQTT broker connected");
                true
            }
            Err(e) => {
                let failures = self.broker_state.mark_failed(e.to_string());
                self.journal.record_error(&format!(
                    "MQTT connection failed: {e:#} (attempt {failures})"
                ));
                false
            }
        }
    }

    /// Hand `result` to the connected publisher. Returns whether it was
    /// accepted.
    async fn publish(&mut self, result: &PollResult) -> bool {
        let (Some(publisher), Some(topic)) =
            (self.publisher.as_mut(), self.context.topic.as_deref())
        else {
            return false;
        };

        let payload = match UpsPayload::from_result(result).to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                self.journal
                    .record_error(&format!("MQTT payload serialization failed: {e:#}"));
                return false;
            }
        };

        match publisher.publish(topic, payload).await {
            Ok(()) => {
                info!("MQTT Published → Topic: {}", topic);
                true
            }
            Err(e) => {
                self.broker_state.mark_degraded(e.to_string());
                self.journal
                    .record_error(&format!("MQTT publish failed: {e:#}"));
                false
            }
        }
    }
}

/// Sleep for `delay`, returning early once `running` is cleared
pub async fn sleep_while_running(delay: Duration, running: &AtomicBool) {
    let deadline = tokio::time::Instant::now() + delay;
    while running.load(Ordering::SeqCst) {
        let now = tokio::time::Instant::now();
        if now >= deadline {
            break;
        }
        tokio::time::sleep((deadline - now).min(SHUTDOWN_POLL)).await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
