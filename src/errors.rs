use crate::message::MessageType;
use crate::types::TargetAddress;

/// All error types that can occur when talking to LIFX devices.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A datagram violated the wire format. Inside the transport these are
    /// logged and dropped; only direct codec callers see them.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// Every attempt of a request timed out before the expected responses arrived.
    #[error(
        "no response from {target} to {message_type} after {attempts} attempt(s) ({received} response(s) received)"
    )]
    NoResponse {
        target: TargetAddress,
        message_type: MessageType,
        attempts: u32,
        received: usize,
    },

    /// A network socket operation failed.
    #[error("socket {action} error: {err:?}")]
    Socket { action: String, err: std::io::Error },

    /// Pushing an animation frame to a device failed.
    #[error("animation on {target} failed: {source}")]
    AnimationTick {
        target: TargetAddress,
        source: Box<Error>,
    },

    /// The connection's receive loop is gone.
    #[error("connection closed")]
    ConnectionClosed,

    /// The device does not support the requested operation.
    #[error("{target} does not support {operation}")]
    Unsupported {
        target: TargetAddress,
        operation: String,
    },

    /// A string could not be parsed as a MAC address.
    #[error("invalid target address: {0}")]
    InvalidTarget(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// All 256 sequence numbers are in flight for the same target.
    #[error("no free sequence number for {0}")]
    SequenceExhausted(TargetAddress),

    /// The device answered `GetService` without a usable UDP port.
    #[error("{0} offers no usable service")]
    NoService(TargetAddress),
}

impl Error {
    /// Create a new socket error
    pub fn socket(action: &str, err: std::io::Error) -> Self {
        Error::Socket {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new malformed packet error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedPacket(reason.into())
    }

    /// Create a new unsupported operation error
    pub fn unsupported(target: TargetAddress, operation: &str) -> Self {
        Error::Unsupported {
            target,
            operation: operation.to_string(),
        }
    }

    /// Wrap a failed frame push
    pub fn animation_tick(target: TargetAddress, err: Error) -> Self {
        Error::AnimationTick {
            target,
            source: Box::new(err),
        }
    }
}

/// Errors compare by message in tests; `io::Error` has no `PartialEq`.
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
