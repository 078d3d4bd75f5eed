// MIT License
// gadgetsd — alarm bridge daemon for the Turris Gadgets dongle.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

use turris_gadgets_bridge::{AlarmBridge, BridgeConfig, SerialLineTransport, SirenMode};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "gadgetsd")]
#[command(about = "Alarm bridge for the Turris Gadgets dongle")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "gadgets.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(default)]
    dongle: DongleToml,
    #[serde(default)]
    sink: SinkToml,
}

#[derive(Debug, Deserialize)]
struct DongleToml {
    #[serde(default = "default_port")]
    port: String,
    #[serde(default = "default_baud_rate")]
    baud_rate: u32,
    #[serde(default = "default_read_timeout")]
    read_timeout_ms: u64,
    #[serde(default = "default_reply_timeout")]
    reply_timeout_ms: u64,
    #[serde(default = "default_loop_delay")]
    loop_delay_ms: u64,
    #[serde(default)]
    skip_slot_scan: bool,
    /// Siren beep mode: NONE, SLOW or FAST
    #[serde(default = "default_siren_mode")]
    siren_mode: String,
    #[serde(default)]
    enrollment_mode: bool,
}

impl Default for DongleToml {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout(),
            reply_timeout_ms: default_reply_timeout(),
            loop_delay_ms: default_loop_delay(),
            skip_slot_scan: false,
            siren_mode: default_siren_mode(),
            enrollment_mode: false,
        }
    }
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_baud_rate() -> u32 {
    57600
}
fn default_read_timeout() -> u64 {
    5000
}
fn default_reply_timeout() -> u64 {
    5000
}
fn default_loop_delay() -> u64 {
    100
}
fn default_siren_mode() -> String {
    "NONE".to_string()
}

#[derive(Debug, Deserialize, Default)]
struct SinkToml {
    /// Append-only event log; omit to disable
    log_file: Option<PathBuf>,
    /// Temperature CSV; omit to disable
    temperature_csv: Option<PathBuf>,
}

fn build_bridge_config(config: &Config) -> Result<BridgeConfig> {
    let siren_mode = SirenMode::from_name(&config.dongle.siren_mode)
        .with_context(|| format!("Unknown siren mode: {}", config.dongle.siren_mode))?;

    let mut builder = BridgeConfig::builder()
        .port(&config.dongle.port)
        .baud_rate(config.dongle.baud_rate)
        .read_timeout_ms(config.dongle.read_timeout_ms)
        .reply_timeout_ms(config.dongle.reply_timeout_ms)
        .loop_delay_ms(config.dongle.loop_delay_ms)
        .scan_slots_on_start(!config.dongle.skip_slot_scan)
        .siren_mode(siren_mode)
        .enrollment_mode(config.dongle.enrollment_mode);

    if let Some(path) = &config.sink.log_file {
        builder = builder.log_file(path);
    }
    if let Some(path) = &config.sink.temperature_csv {
        builder = builder.temperature_csv(path);
    }
    Ok(builder.build())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or
    // RUST_LOG=turris_gadgets_bridge=trace). Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();

    let config: Config = match std::fs::read_to_string(&cli.config) {
        Ok(text) => toml::from_str(&text).context("Failed to parse config file")?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Config file {} not found, using defaults", cli.config);
            Config {
                dongle: DongleToml::default(),
                sink: SinkToml::default(),
            }
        }
        Err(e) => return Err(e).context("Failed to read config file"),
    };

    let bridge_config = build_bridge_config(&config)?;

    info!(
        "Connecting to dongle on {} at {} baud",
        bridge_config.port, bridge_config.baud_rate
    );
    let transport = SerialLineTransport::open(&bridge_config.port, bridge_config.baud_rate)
        .context("Failed to open serial port")?;

    let mut bridge = AlarmBridge::new(bridge_config, transport)?;
    bridge.startup().await.context("Startup diagnostics failed")?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
        let _ = shutdown_tx.send(true);
    });

    info!("Bridge running. Send SIGINT/SIGTERM to stop.");
    bridge.run(shutdown_rx).await?;

    info!("Shutdown complete");
    Ok(())
}
