// MIT License
// Serial transport over the dongle's USB CDC device node.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

use crate::error::{BridgeError, Result};
use crate::transport::LineTransport;

/// Line transport over a serial device node (e.g. `/dev/ttyUSB0`).
pub struct SerialLineTransport {
    reader: BufReader<ReadHalf<SerialStream>>,
    writer: WriteHalf<SerialStream>,
}

impl SerialLineTransport {
    /// Open the serial port. Failure here is the only fatal error in
    /// the bridge.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        info!("Opening serial port {} at {} baud", path, baud_rate);
        let stream = tokio_serial::new(path, baud_rate).open_native_async()?;
        let (read_half, write_half) = tokio::io::split(stream);
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }
}

#[async_trait]
impl LineTransport for SerialLineTransport {
    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        let mut buf = String::new();
        match tokio::time::timeout(timeout, self.reader.read_line(&mut buf)).await {
            Ok(Ok(0)) => Err(BridgeError::Disconnected),
            Ok(Ok(_)) => {
                let line = buf.trim_end_matches(['\r', '\n']).to_string();
                debug!("<< {}", line);
                Ok(Some(line))
            }
            Ok(Err(e)) => Err(BridgeError::Io(e)),
            Err(_) => Ok(None),
        }
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        debug!(">> {}", line);
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}
