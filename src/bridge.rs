// MIT License
// Main polling loop tying decoder, state machine, encoder and sinks together.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::dongle::DongleConnector;
use crate::error::{BridgeError, Result};
use crate::protocol::{decode_line, LineKind};
use crate::registry::DeviceRegistry;
use crate::sink::EventSink;
use crate::state::{apply_event, LogEvent, SystemState};
use crate::transport::LineTransport;

/// The bridge: owns the registry, the system state, the sink and the
/// connector. One instance per process; all protocol work happens on
/// the task that calls [`run`](Self::run), so decode/dispatch/encode
/// are atomic with respect to inbound lines.
pub struct AlarmBridge<T> {
    config: BridgeConfig,
    connector: DongleConnector<T>,
    registry: DeviceRegistry,
    state: SystemState,
    sink: EventSink,
}

impl<T: LineTransport> AlarmBridge<T> {
    pub fn new(config: BridgeConfig, transport: T) -> Result<Self> {
        let sink = EventSink::open(
            config.log_file.as_deref(),
            config.temperature_csv.as_deref(),
        )?;
        let connector =
            DongleConnector::new(transport, Duration::from_millis(config.reply_timeout_ms));
        let state = SystemState {
            siren: config.siren_mode,
            enroll: config.enrollment_mode,
            ..SystemState::default()
        };
        Ok(Self {
            config,
            connector,
            registry: DeviceRegistry::reference_installation(),
            state,
            sink,
        })
    }

    pub fn state(&self) -> &SystemState {
        &self.state
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Startup diagnostics before entering the loop.
    pub async fn startup(&mut self) -> Result<()> {
        for device in self.registry.devices() {
            debug!(
                "Registered {} {} {:?}",
                device.address,
                device.hardware_type.description(),
                device.name
            );
        }
        if self.config.scan_slots_on_start {
            self.connector.scan_slots(&mut self.sink).await?;
        }
        Ok(())
    }

    /// Run until the shutdown signal flips.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!("Bridge loop started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                res = self.run_cycle() => {
                    if let Err(e) = res {
                        if !e.is_recoverable() {
                            return Err(e);
                        }
                        warn!("Cycle error: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
            sleep(Duration::from_millis(self.config.loop_delay_ms)).await;
        }
        info!("Bridge loop stopped");
        Ok(())
    }

    /// One loop iteration: at most one inbound line, the dispatch it
    /// triggers, one state re-transmission, and the battery sweep.
    ///
    /// A read timeout skips event processing but still performs the
    /// sweep. Decode errors drop the line and continue.
    pub async fn run_cycle(&mut self) -> Result<()> {
        let timeout = Duration::from_millis(self.config.read_timeout_ms);
        match self.connector.read_line(timeout).await? {
            Some(line) => self.handle_line(&line).await?,
            None => debug!("No line this cycle"),
        }

        // Report every device currently flagged low-battery, whether or
        // not a line arrived.
        let flagged: Vec<String> = self
            .registry
            .low_battery_devices()
            .map(|d| d.address.clone())
            .collect();
        for address in flagged {
            self.sink.report(&LogEvent::LowBattery { address })?;
        }

        self.sink.flush()?;
        Ok(())
    }

    async fn handle_line(&mut self, line: &str) -> Result<()> {
        let event = match decode_line(line) {
            Ok(LineKind::Event(event)) => event,
            Ok(control) => {
                // OK/ERROR/banner lines end the receive phase of a cycle.
                debug!("Control line: {:?}", control);
                return Ok(());
            }
            Err(e @ BridgeError::Decode { .. }) => {
                self.sink.report(&LogEvent::Error {
                    message: e.to_string(),
                })?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match self.registry.lookup(&event.address) {
            Some(device) => {
                let device = device.clone();
                debug!(
                    "DONGLE: {} DEVICE: {} DATA: {}",
                    event.address, event.name, event.payload
                );

                if let Some(flag) = event.low_battery {
                    self.registry.apply_battery_flag(&event.address, flag);
                }

                for log_event in apply_event(&mut self.state, &device, &event) {
                    self.sink.report(&log_event)?;
                }
                if let Some(temp) = &event.interior_temp {
                    self.sink.record_temperature(temp)?;
                }
            }
            None => {
                let e = BridgeError::UnregisteredDevice {
                    address: event.address.clone(),
                };
                self.sink.report(&LogEvent::Error {
                    message: e.to_string(),
                })?;
            }
        }

        // Re-transmit the composite state every cycle that saw a device
        // line. A failure leaves state untouched; the next cycle
        // re-sends it anyway.
        self.connector.send_state(&self.state, &mut self.sink).await?;
        Ok(())
    }
}
