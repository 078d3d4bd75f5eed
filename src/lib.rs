// MIT License
//
//! # turris-gadgets-bridge
//!
//! Serial bridge for the Turris Gadgets USB dongle, which fronts a
//! Jablotron OASiS wireless sensor network (keyfob remotes, door and
//! PIR sensors, smoke detector, siren, thermostat, switched sockets).
//!
//! The bridge keeps the authoritative in-memory state of the alarm
//! installation (armed, alarm-triggered, PGX/PGY relays, siren mode,
//! temperature) and continuously re-derives and re-transmits that
//! state to the dongle over a line-oriented serial protocol.
//!
//! ## Quick Start
//!
//! ```no_run
//! use turris_gadgets_bridge::{AlarmBridge, BridgeConfig, SerialLineTransport};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BridgeConfig::builder()
//!         .port("/dev/ttyUSB0")
//!         .log_file("/var/log/gadgets.log")
//!         .temperature_csv("thermometer.csv")
//!         .build();
//!
//!     let transport = SerialLineTransport::open(&config.port, config.baud_rate)?;
//!     let mut bridge = AlarmBridge::new(config, transport)?;
//!     bridge.startup().await?;
//!
//!     let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         let _ = shutdown_tx.send(true);
//!     });
//!     bridge.run(shutdown_rx).await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod dongle;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod sink;
pub mod state;
pub mod transport;

// Re-exports for convenience
pub use bridge::AlarmBridge;
pub use config::{BridgeConfig, BridgeConfigBuilder};
pub use dongle::DongleConnector;
pub use error::{BridgeError, Result};
pub use protocol::{decode_line, Command, DecodedEvent, LineKind, SlotAddress, StatusTokens};
pub use registry::{Device, DeviceRegistry, HardwareType, Role};
pub use sink::EventSink;
pub use state::{apply_event, LogEvent, SirenMode, SystemState};
pub use transport::serial::SerialLineTransport;
pub use transport::LineTransport;
