/// Monocoque Error Types
///
/// Comprehensive error handling for all Monocoque operations.

use std::io;
use thiserror::Error;

/// Which of the five broad classes an error falls into. Lets callers decide
/// retry/reconnect/abort policy without matching every variant by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Worth retrying as-is: interrupted syscalls, would-block, timeouts.
    Transient,
    /// The peer sent bytes that don't parse as a valid ZMTP stream.
    Protocol,
    /// The caller asked for something invalid: bad option value, state
    /// machine violation (EFSM-equivalent), malformed endpoint string.
    Configuration,
    /// Local resource exhaustion: oversized message, allocation failure.
    Resource,
    /// The remote end is gone or refused the connection.
    Peer,
}

/// Main error type for Monocoque operations
#[derive(Error, Debug)]
pub enum MonocoqueError {
    /// IO error during socket operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Protocol error during ZMTP handshake or framing
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Handshake timeout
    #[error("Handshake timeout after {0:?}")]
    HandshakeTimeout(std::time::Duration),

    /// Invalid greeting received
    #[error("Invalid greeting: {0}")]
    InvalidGreeting(String),

    /// Invalid frame format
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Socket closed
    #[error("Socket closed")]
    SocketClosed,

    /// Channel send error
    #[error("Channel send error")]
    ChannelSend,

    /// Channel receive error
    #[error("Channel receive error")]
    ChannelRecv,

    /// Peer disconnected
    #[error("Peer disconnected: {0}")]
    PeerDisconnected(String),

    /// Connection actively refused by the peer (ECONNREFUSED-equivalent).
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    /// Connection reset by the peer mid-stream (ECONNRESET-equivalent).
    #[error("Connection reset: {0}")]
    ConnectionReset(String),

    /// Invalid routing ID
    #[error("Invalid routing ID")]
    InvalidRoutingId,

    /// Caller requested an operation the socket's state machine forbids
    /// right now (EFSM-equivalent, e.g. `REQ::send` called twice in a row).
    #[error("Operation not valid in current state: {0}")]
    InvalidState(String),

    /// Caller supplied an invalid option value or endpoint string
    /// (EINVAL-equivalent).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Message too large
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Local resource exhausted (ENOMEM-equivalent): arena allocation
    /// failure, HWM-bounded queue permanently full with no reader.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Subscription error
    #[error("Subscription error: {0}")]
    Subscription(String),
}

/// Result type alias for Monocoque operations
pub type Result<T> = std::result::Result<T, MonocoqueError>;

impl MonocoqueError {
    /// Create a protocol error with a message
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
    
    /// Create an invalid greeting error
    pub fn invalid_greeting(msg: impl Into<String>) -> Self {
        Self::InvalidGreeting(msg.into())
    }
    
    /// Create an invalid frame error
    pub fn invalid_frame(msg: impl Into<String>) -> Self {
        Self::InvalidFrame(msg.into())
    }
    
    /// Create a peer disconnected error
    pub fn peer_disconnected(peer_id: impl Into<String>) -> Self {
        Self::PeerDisconnected(peer_id.into())
    }

    /// Create an invalid-state (EFSM-equivalent) error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create an invalid-configuration (EINVAL-equivalent) error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Classify this error into one of the five broad categories.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Io(e) => match e.kind() {
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                    ErrorCategory::Transient
                }
                io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::NotConnected
                | io::ErrorKind::BrokenPipe => ErrorCategory::Peer,
                _ => ErrorCategory::Transient,
            },
            Self::Protocol(_) | Self::InvalidGreeting(_) | Self::InvalidFrame(_) => {
                ErrorCategory::Protocol
            }
            Self::InvalidRoutingId | Self::InvalidState(_) | Self::InvalidConfig(_) | Self::Subscription(_) => {
                ErrorCategory::Configuration
            }
            Self::MessageTooLarge { .. } | Self::ResourceExhausted(_) => ErrorCategory::Resource,
            Self::SocketClosed
            | Self::PeerDisconnected(_)
            | Self::ConnectionRefused(_)
            | Self::ConnectionReset(_)
            | Self::HandshakeTimeout(_) => ErrorCategory::Peer,
            Self::ChannelSend | Self::ChannelRecv => ErrorCategory::Transient,
        }
    }

    /// Check if this error is recoverable (worth retrying the same op).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    /// Check if this is a connection error
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::SocketClosed
                | Self::PeerDisconnected(_)
                | Self::ConnectionRefused(_)
                | Self::ConnectionReset(_)
                | Self::HandshakeTimeout(_)
        )
    }
}
