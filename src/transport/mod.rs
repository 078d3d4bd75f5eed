// MIT License
// Line-oriented transport abstraction.

pub mod serial;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Bidirectional line channel to the dongle.
///
/// One decoded text line per read; `None` means the bounded wait
/// expired with no data, which is not an error. The production
/// implementation is [`serial::SerialLineTransport`]; tests substitute
/// a scripted transport.
#[async_trait]
pub trait LineTransport: Send {
    /// Blocking read of one line, bounded by `timeout`.
    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>>;

    /// Write one line (terminator appended by the transport).
    async fn write_line(&mut self, line: &str) -> Result<()>;
}
