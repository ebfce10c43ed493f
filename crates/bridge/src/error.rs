#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// No reply arrived before the deadline. Recoverable: callers fall
    /// back to a default search radius.
    Timeout { waited_ms: u64 },
    /// The other end of the channel is gone (surface torn down).
    ChannelClosed,
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::Timeout { waited_ms } => {
                write!(f, "request timed out after {waited_ms}ms")
            }
            BridgeError::ChannelClosed => write!(f, "bridge channel closed"),
        }
    }
}

impl std::error::Error for BridgeError {}
