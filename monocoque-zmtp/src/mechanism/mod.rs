pub mod null;
pub mod plain;

use bytes::Bytes;

use crate::codec::{ZmtpError, ZmtpFrame};
use crate::session::SocketType;

/// Role of this endpoint (client/server) for handshake behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Trait implemented by each security mechanism (NULL now, CURVE later).
///
/// The mechanism is responsible for:
/// - validating inbound command frames during handshake
/// - emitting outbound handshake frames (READY, ERROR, etc.)
/// - providing the peer metadata at handshake completion
pub trait Mechanism: Send {
    /// Feed an inbound frame (expected to be command frames during handshake).
    ///
    /// Returns:
    /// - Ok(()) for accepted frames
    /// - Err for protocol/handshake violation
    fn on_inbound(&mut self, frame: &ZmtpFrame) -> Result<(), ZmtpError>;

    /// Poll next outbound bytes to send (already framed bytes).
    ///
    /// Convention:
    /// - returns Some(Bytes) when it has something to send now
    /// - returns None when nothing pending
    fn next_outbound(&mut self) -> Option<Bytes>;

    /// Whether the handshake is finished (mechanism satisfied).
    fn is_done(&self) -> bool;

    /// Peer identity if known (ROUTER mapping). Must be **owned stable bytes**.
    ///
    /// Important:
    /// - This must not point into a slab that might be recycled.
    /// - So mechanisms should store it as owned `Bytes` (usually copy from READY prop).
    fn peer_identity(&self) -> Option<Bytes>;

    /// Peer socket type determined from READY.
    fn peer_socket_type(&self) -> Option<SocketType>;
}

/// Mechanism selection from greeting / config.
///
/// CURVE is not represented here: its wire exchange (HELLO/WELCOME/INITIATE
/// with encrypted bodies) doesn't fit this trait's plain command-frame
/// in/out shape, so it stays the separate opt-in path via
/// `CurveClient::handshake`/`CurveServer::handshake` (see `security::curve`).
pub enum MechanismKind {
    Null,
    PlainClient {
        username: String,
        password: String,
    },
    PlainServer {
        credentials: std::collections::BTreeMap<String, String>,
    },
}

impl MechanismKind {
    pub fn new_null() -> Self {
        Self::Null
    }

    /// The ZMTP greeting's 20-byte mechanism name for this kind.
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::PlainClient { .. } | Self::PlainServer { .. } => "PLAIN",
        }
    }

    /// Derive the mechanism to drive the handshake with from a socket's
    /// configured `SecurityMechanism` option.
    pub fn from_options(options: &monocoque_core::options::SecurityMechanism) -> Self {
        use monocoque_core::options::SecurityMechanism;
        match options {
            SecurityMechanism::Null => Self::Null,
            SecurityMechanism::PlainClient { username, password } => Self::PlainClient {
                username: username.clone(),
                password: password.clone(),
            },
            SecurityMechanism::PlainServer { credentials } => Self::PlainServer {
                credentials: credentials.clone(),
            },
        }
    }

    pub fn build(self, local_socket_type: SocketType) -> Box<dyn Mechanism> {
        match self {
            MechanismKind::Null => Box::new(crate::mechanism::null::NullMechanism::new(
                Role::Client,
                local_socket_type,
            )),
            MechanismKind::PlainClient { username, password } => Box::new(
                crate::mechanism::plain::PlainMechanism::new_client(
                    local_socket_type,
                    username,
                    password,
                ),
            ),
            MechanismKind::PlainServer { credentials } => Box::new(
                crate::mechanism::plain::PlainMechanism::new_server(local_socket_type, credentials),
            ),
        }
    }
}

/// Helper: in handshake, any non-command data frame is a violation.
/// (libzmq will drop you silently if you violate.)
#[inline]
pub fn require_command(frame: &ZmtpFrame) -> Result<(), ZmtpError> {
    if frame.is_command() {
        Ok(())
    } else {
        Err(ZmtpError::Protocol)
    }
}
