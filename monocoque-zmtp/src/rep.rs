//! REP socket implementation
//!
//! REP sockets are the server side of the REQ-REP pattern: `recv()` a
//! request, `send()` exactly one reply, repeat. Unlike REQ, REP carries no
//! correlation id of its own — whatever frames the request arrived with
//! (including a REQ-side correlation frame, if the peer has one enabled)
//! are simply echoed back by the application on `send()`.
//!
//! # Use Cases
//!
//! - Synchronous RPC servers
//! - Request-reply protocols
//! - Service endpoints

use crate::base::SocketBase;
use crate::codec::encode_multipart;
use crate::{handshake::perform_handshake_with_timeout, session::SocketType};
use bytes::Bytes;
use compio::io::{AsyncRead, AsyncWrite};
use compio::net::TcpStream;
use monocoque_core::config::BufferConfig;
use monocoque_core::options::SocketOptions;
use smallvec::SmallVec;
use std::io;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepState {
    AwaitingRequest,
    ReadyToReply,
}

/// REP socket for synchronous reply messaging.
pub struct RepSocket<S = TcpStream>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    base: SocketBase<S>,
    frames: SmallVec<[Bytes; 4]>,
    state: RepState,
}

impl<S> RepSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new REP socket from a stream with default buffer configuration.
    pub async fn new(stream: S) -> io::Result<Self> {
        Self::with_options(stream, BufferConfig::default(), SocketOptions::default()).await
    }

    /// Create a new REP socket with custom buffer configuration.
    pub async fn with_config(stream: S, config: BufferConfig) -> io::Result<Self> {
        Self::with_options(stream, config, SocketOptions::default()).await
    }

    /// Create a new REP socket with custom buffer configuration and socket options.
    pub async fn with_options(
        mut stream: S,
        config: BufferConfig,
        options: SocketOptions,
    ) -> io::Result<Self> {
        debug!("[REP] Creating new REP socket");

        let handshake_result = perform_handshake_with_timeout(
            &mut stream,
            SocketType::Rep,
            None,
            &options.mechanism,
            Some(options.handshake_timeout),
        )
        .await
        .map_err(|e| io::Error::other(format!("Handshake failed: {}", e)))?;

        debug!(
            peer_identity = ?handshake_result.peer_identity,
            peer_socket_type = ?handshake_result.peer_socket_type,
            "[REP] Handshake complete"
        );

        let options = options.with_buffer_config(config);
        Ok(Self {
            base: SocketBase::new(stream, SocketType::Rep, options),
            frames: SmallVec::new(),
            state: RepState::AwaitingRequest,
        })
    }

    /// Receive a request. Fails immediately, without touching the network,
    /// if a reply to the previous request hasn't been sent yet.
    pub async fn recv(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        if self.state == RepState::ReadyToReply {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "REP socket must send() a reply before receiving the next request",
            ));
        }

        trace!("[REP] Waiting for request");

        loop {
            loop {
                match self.base.decoder.decode(&mut self.base.recv)? {
                    Some(frame) => {
                        let more = frame.more();
                        self.frames.push(frame.payload);

                        if !more {
                            let request: Vec<Bytes> = self.frames.drain(..).collect();
                            self.state = RepState::ReadyToReply;
                            trace!("[REP] Received request with {} frames", request.len());
                            return Ok(Some(request));
                        }
                    }
                    None => break,
                }
            }

            let n = self.base.read_raw().await?;
            if n == 0 {
                trace!("[REP] Connection closed");
                return Ok(None);
            }
        }
    }

    /// Send a reply. Must follow a `recv()`.
    pub async fn send(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        if self.state == RepState::AwaitingRequest {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "REP socket must recv() a request before sending a reply",
            ));
        }

        trace!("[REP] Sending reply with {} frames", msg.len());

        self.base.write_buf.clear();
        encode_multipart(&msg, &mut self.base.write_buf);
        self.base.write_from_buf().await?;

        self.state = RepState::AwaitingRequest;
        Ok(())
    }

    /// Close the socket gracefully.
    pub async fn close(self) -> io::Result<()> {
        trace!("[REP] Closing socket");
        Ok(())
    }

    /// Get a reference to the socket options.
    #[inline]
    pub const fn options(&self) -> &SocketOptions {
        &self.base.options
    }

    /// Get a mutable reference to the socket options.
    #[inline]
    pub fn options_mut(&mut self) -> &mut SocketOptions {
        &mut self.base.options
    }

    /// Set socket options (builder-style).
    #[inline]
    pub fn set_options(&mut self, options: SocketOptions) {
        self.base.options = options;
    }

    /// Get the endpoint this socket is connected/bound to, if available.
    #[inline]
    pub const fn last_endpoint(&self) -> Option<&monocoque_core::endpoint::Endpoint> {
        self.base.last_endpoint()
    }

    /// Check if the last received message has more frames coming.
    #[inline]
    pub fn has_more(&self) -> bool {
        self.base.has_more()
    }

    /// Get current socket events (read/write readiness).
    #[inline]
    pub fn events(&self) -> u32 {
        self.base.events()
    }
}

// Specialized implementation for TCP streams to enable TCP_NODELAY
impl RepSocket<TcpStream> {
    /// Create a new REP socket from a TCP stream with TCP_NODELAY enabled.
    pub async fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        Self::from_tcp_with_config(stream, BufferConfig::default()).await
    }

    /// Create a new REP socket from a TCP stream with TCP_NODELAY and custom config.
    pub async fn from_tcp_with_config(stream: TcpStream, config: BufferConfig) -> io::Result<Self> {
        monocoque_core::tcp::enable_tcp_nodelay(&stream)?;
        debug!("[REP] TCP_NODELAY enabled");
        Self::with_options(stream, config, SocketOptions::default()).await
    }

    /// Create a new REP socket from a TCP stream with TCP_NODELAY and custom options.
    pub async fn from_tcp_with_options(stream: TcpStream, options: SocketOptions) -> io::Result<Self> {
        monocoque_core::tcp::enable_tcp_nodelay(&stream)?;
        debug!("[REP] TCP_NODELAY enabled");
        Self::with_options(stream, BufferConfig::default(), options).await
    }
}

crate::impl_socket_trait!(RepSocket<S>, SocketType::Rep);
