// MIT License
// Error types for the Turris Gadgets dongle bridge.

/// All errors that can occur in the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("Malformed protocol line: {line:?}")]
    Decode { line: String },

    #[error("Unregistered device address: {address}")]
    UnregisteredDevice { address: String },

    #[error("Address mismatch: header {header} vs embedded {embedded}")]
    AddressMismatch { header: String, embedded: String },

    #[error("Command rejected by dongle: {reply:?}")]
    CommandRejected { reply: String },

    #[error("Command timeout: {command}")]
    CommandTimeout { command: String },

    #[error("Invalid slot reply: {reply:?}")]
    InvalidSlotReply { reply: String },

    #[error("Transport disconnected")]
    Disconnected,
}

impl BridgeError {
    /// Whether the main loop should keep running after this error.
    ///
    /// Only transport loss is fatal to the loop; every protocol-level
    /// error is logged and the next cycle proceeds.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, BridgeError::Disconnected)
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(BridgeError::Decode { line: "garbage".into() }.is_recoverable());
        assert!(BridgeError::CommandRejected { reply: "ERROR".into() }.is_recoverable());
        assert!(BridgeError::CommandTimeout { command: "TX".into() }.is_recoverable());
        assert!(!BridgeError::Disconnected.is_recoverable());
    }
}
