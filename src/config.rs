// MIT License
// Bridge configuration.

use std::path::PathBuf;

use crate::state::SirenMode;

/// Configuration for a dongle bridge instance.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Serial device node of the dongle
    pub port: String,
    /// Serial baud rate (dongle default: 57600)
    pub baud_rate: u32,
    /// Bounded wait for one inbound line per loop iteration
    pub read_timeout_ms: u64,
    /// Reply wait for a synchronous command
    pub reply_timeout_ms: u64,
    /// Fixed inter-iteration delay throttling the loop
    pub loop_delay_ms: u64,
    /// Append-only event log; `None` disables the file sink
    pub log_file: Option<PathBuf>,
    /// Temperature CSV; `None` disables it
    pub temperature_csv: Option<PathBuf>,
    /// Run the WHO AM I? / slot-scan diagnostics before the loop
    pub scan_slots_on_start: bool,
    /// Initial siren beep mode carried in the TX frame
    pub siren_mode: SirenMode,
    /// Initial enrollment flag (permits pairing new devices)
    pub enrollment_mode: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 57600,
            read_timeout_ms: 5000,
            reply_timeout_ms: 5000,
            loop_delay_ms: 100,
            log_file: None,
            temperature_csv: None,
            scan_slots_on_start: true,
            siren_mode: SirenMode::None,
            enrollment_mode: false,
        }
    }
}

impl BridgeConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }
}

/// Builder for [`BridgeConfig`].
#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.config.port = port.into();
        self
    }

    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.config.baud_rate = baud;
        self
    }

    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    pub fn reply_timeout_ms(mut self, ms: u64) -> Self {
        self.config.reply_timeout_ms = ms;
        self
    }

    pub fn loop_delay_ms(mut self, ms: u64) -> Self {
        self.config.loop_delay_ms = ms;
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_file = Some(path.into());
        self
    }

    pub fn temperature_csv(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.temperature_csv = Some(path.into());
        self
    }

    pub fn scan_slots_on_start(mut self, scan: bool) -> Self {
        self.config.scan_slots_on_start = scan;
        self
    }

    pub fn siren_mode(mut self, mode: SirenMode) -> Self {
        self.config.siren_mode = mode;
        self
    }

    pub fn enrollment_mode(mut self, enroll: bool) -> Self {
        self.config.enrollment_mode = enroll;
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}
