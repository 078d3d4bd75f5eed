// MIT License
// Append-only side-effect sinks: event log and temperature CSV.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Local;
use tracing::info;

use crate::error::Result;
use crate::state::LogEvent;

/// Append-only targets the state machine reports to.
///
/// Both files are optional; a disabled sink is a no-op. Every event is
/// also mirrored to tracing so diagnostics work without files. The log
/// is flushed once per loop cycle so it stays tail-able.
pub struct EventSink {
    log: Option<File>,
    temperatures: Option<File>,
}

impl EventSink {
    /// Open the sink files, appending when they already exist.
    pub fn open(log_path: Option<&Path>, csv_path: Option<&Path>) -> Result<Self> {
        Ok(Self {
            log: log_path.map(open_append).transpose()?,
            temperatures: csv_path.map(open_append).transpose()?,
        })
    }

    /// A sink that writes nowhere (tracing mirror only).
    pub fn disabled() -> Self {
        Self {
            log: None,
            temperatures: None,
        }
    }

    /// Append one structured event line to the log.
    pub fn report(&mut self, event: &LogEvent) -> Result<()> {
        info!("{}", event);
        if let Some(log) = &mut self.log {
            writeln!(log, "{}", event)?;
        }
        Ok(())
    }

    /// Append a free-text line (startup diagnostics).
    pub fn report_raw(&mut self, line: &str) -> Result<()> {
        info!("{}", line);
        if let Some(log) = &mut self.log {
            writeln!(log, "{}", line)?;
        }
        Ok(())
    }

    /// Append a `timestamp,temperature` CSV row.
    pub fn record_temperature(&mut self, raw: &str) -> Result<()> {
        if let Some(csv) = &mut self.temperatures {
            let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            writeln!(csv, "{},{}", stamp, raw)?;
            csv.flush()?;
        }
        Ok(())
    }

    /// Flush the event log, called at the end of every cycle.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(log) = &mut self.log {
            log.flush()?;
        }
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("gadgets.log");

        let mut sink = EventSink::open(Some(&log_path), None).unwrap();
        sink.report(&LogEvent::Armed { name: "remote1L".into() }).unwrap();
        sink.flush().unwrap();
        drop(sink);

        let mut sink = EventSink::open(Some(&log_path), None).unwrap();
        sink.report(&LogEvent::CommandOk).unwrap();
        sink.flush().unwrap();

        let text = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(text, "ARMED: remote1L\nCMD_OK\n");
    }

    #[test]
    fn test_temperature_rows() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("thermometer.csv");

        let mut sink = EventSink::open(None, Some(&csv_path)).unwrap();
        sink.record_temperature("22.5").unwrap();
        sink.record_temperature("23.0").unwrap();

        let text = std::fs::read_to_string(&csv_path).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].ends_with(",22.5"), "row was {:?}", rows[0]);
        assert!(rows[1].ends_with(",23.0"));
        // timestamp,temperature shape
        assert_eq!(rows[0].split(',').count(), 2);
    }

    #[test]
    fn test_disabled_sink_is_noop() {
        let mut sink = EventSink::disabled();
        sink.report(&LogEvent::CommandFailed).unwrap();
        sink.record_temperature("21.0").unwrap();
        sink.flush().unwrap();
    }
}
