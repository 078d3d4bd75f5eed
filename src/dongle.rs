// MIT License
// Synchronous request/reply engine and startup diagnostics for the dongle.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{BridgeError, Result};
use crate::protocol::{is_ack, parse_slot_reply, Command, SlotAddress};
use crate::sink::EventSink;
use crate::state::{LogEvent, SystemState};
use crate::transport::LineTransport;

/// Number of registration slots on the dongle.
pub const SLOT_COUNT: u8 = 32;

/// Wraps a line transport with the dongle's one-command-one-reply
/// protocol. No pipelining: each `request` writes a line and waits for
/// exactly one reply within the configured bound.
pub struct DongleConnector<T> {
    transport: T,
    reply_timeout: Duration,
}

impl<T: LineTransport> DongleConnector<T> {
    pub fn new(transport: T, reply_timeout: Duration) -> Self {
        Self {
            transport,
            reply_timeout,
        }
    }

    /// Read one inbound line, bounded by `timeout`. `None` on timeout.
    pub async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        self.transport.read_line(timeout).await
    }

    /// Send a command and wait for its single reply line.
    pub async fn request(&mut self, command: &Command) -> Result<String> {
        let wire = command.to_wire_string();
        debug!("Sending command: {}", wire);
        self.transport.write_line(&wire).await?;
        match self.transport.read_line(self.reply_timeout).await? {
            Some(reply) => Ok(reply),
            None => Err(BridgeError::CommandTimeout { command: wire }),
        }
    }

    /// Free-text dongle identity.
    pub async fn who_am_i(&mut self) -> Result<String> {
        self.request(&Command::WhoAmI).await
    }

    /// Address registered on one dongle slot.
    pub async fn get_slot(&mut self, index: u8) -> Result<SlotAddress> {
        let reply = self.request(&Command::GetSlot { index }).await?;
        parse_slot_reply(&reply, index)
    }

    /// Startup diagnostics: identity line plus all 32 slot registrations,
    /// written to the event sink.
    pub async fn scan_slots(&mut self, sink: &mut EventSink) -> Result<()> {
        let identity = self.who_am_i().await?;
        sink.report_raw(&identity)?;
        for index in 0..SLOT_COUNT {
            match self.get_slot(index).await {
                Ok(SlotAddress::Registered(address)) => {
                    sink.report_raw(&format!("SLOT: {:02} - {}", index, address))?;
                }
                Ok(SlotAddress::Empty) => {
                    sink.report_raw(&format!("SLOT: {:02} - --------", index))?;
                }
                Err(BridgeError::InvalidSlotReply { reply }) => {
                    sink.report(&LogEvent::Error {
                        message: format!("slot {:02} reply {:?}", index, reply),
                    })?;
                }
                Err(e) => return Err(e),
            }
        }
        sink.flush()?;
        Ok(())
    }

    /// Transmit the composite state frame and validate the reply.
    ///
    /// Returns whether the dongle acknowledged. A wrong reply or a
    /// timeout is a logged failure with no retry; the next loop cycle
    /// re-sends the (possibly updated) state anyway.
    pub async fn send_state(
        &mut self,
        state: &SystemState,
        sink: &mut EventSink,
    ) -> Result<bool> {
        let command = state.tx_command();
        let frame = command.to_wire_string();
        sink.report(&LogEvent::Command { frame: frame.clone() })?;

        match self.request(&command).await {
            Ok(reply) if is_ack(&reply) => {
                sink.report(&LogEvent::CommandOk)?;
                Ok(true)
            }
            Ok(reply) => {
                warn!("Frame {:?}: {}", frame, BridgeError::CommandRejected { reply });
                sink.report(&LogEvent::CommandFailed)?;
                Ok(false)
            }
            Err(BridgeError::CommandTimeout { .. }) => {
                warn!("No reply to frame {:?}", frame);
                sink.report(&LogEvent::CommandFailed)?;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
