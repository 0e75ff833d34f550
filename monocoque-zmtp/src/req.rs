//! REQ socket implementation
//!
//! REQ sockets enforce a synchronous request-reply pattern: a `send()` must
//! be followed by a `recv()` before another `send()` is allowed. Setting
//! `SocketOptions::req_relaxed` lifts that restriction, and
//! `SocketOptions::req_correlate` prepends a 4-byte request id to every
//! outgoing message so stale or out-of-order replies can be told apart from
//! the one actually being waited on.
//!
//! # Use Cases
//!
//! - Synchronous RPC clients
//! - Simple request-reply protocols
//! - Client-server communication where one outstanding request at a time
//!   is acceptable

use crate::base::SocketBase;
use crate::codec::encode_multipart;
use crate::{handshake::perform_handshake_with_timeout, session::SocketType};
use bytes::Bytes;
use compio::io::{AsyncRead, AsyncWrite};
use compio::net::TcpStream;
use monocoque_core::options::SocketOptions;
use rand::RngCore;
use smallvec::SmallVec;
use std::io;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReqState {
    Idle,
    AwaitingReply,
}

/// REQ socket for synchronous request-reply messaging.
pub struct ReqSocket<S = TcpStream>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    base: SocketBase<S>,
    frames: SmallVec<[Bytes; 4]>,
    state: ReqState,
    /// Correlation id of the outstanding request, set only when
    /// `req_correlate` is enabled.
    outstanding_id: Option<Bytes>,
}

impl<S> ReqSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new REQ socket from a stream with default socket options.
    pub async fn new(stream: S) -> io::Result<Self> {
        Self::with_options(stream, SocketOptions::default()).await
    }

    /// Create a new REQ socket with custom socket options.
    pub async fn with_options(mut stream: S, options: SocketOptions) -> io::Result<Self> {
        debug!("[REQ] Creating new REQ socket");

        let handshake_result = perform_handshake_with_timeout(
            &mut stream,
            SocketType::Req,
            None,
            &options.mechanism,
            Some(options.handshake_timeout),
        )
        .await
        .map_err(|e| io::Error::other(format!("Handshake failed: {}", e)))?;

        debug!(
            peer_identity = ?handshake_result.peer_identity,
            peer_socket_type = ?handshake_result.peer_socket_type,
            "[REQ] Handshake complete"
        );

        Ok(Self {
            base: SocketBase::new(stream, SocketType::Req, options),
            frames: SmallVec::new(),
            state: ReqState::Idle,
            outstanding_id: None,
        })
    }

    /// Send a request. Fails in strict mode (`req_relaxed == false`, the
    /// default) if the previous request's reply hasn't been received yet.
    pub async fn send(&mut self, msg: Vec<Bytes>) -> io::Result<()> {
        if self.state == ReqState::AwaitingReply && !self.base.options.req_relaxed {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "REQ socket must await reply before sending again (call recv() first)",
            ));
        }

        trace!("[REQ] Sending {} frames", msg.len());

        self.base.write_buf.clear();
        if self.base.options.req_correlate {
            let mut id = [0u8; 4];
            rand::thread_rng().fill_bytes(&mut id);
            let id = Bytes::copy_from_slice(&id);
            let mut framed = Vec::with_capacity(msg.len() + 1);
            framed.push(id.clone());
            framed.extend(msg);
            encode_multipart(&framed, &mut self.base.write_buf);
            self.outstanding_id = Some(id);
        } else {
            encode_multipart(&msg, &mut self.base.write_buf);
            self.outstanding_id = None;
        }

        self.base.write_from_buf().await?;
        self.state = ReqState::AwaitingReply;
        Ok(())
    }

    /// Receive the reply to the outstanding request.
    ///
    /// Fails immediately, without touching the network, if there's no
    /// outstanding request to reply to. When `req_correlate` is set, replies
    /// whose leading frame doesn't match the id of the request just sent are
    /// silently discarded and the read continues.
    pub async fn recv(&mut self) -> io::Result<Option<Vec<Bytes>>> {
        if self.state == ReqState::Idle {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "REQ socket is Idle: call send() before recv()",
            ));
        }

        trace!("[REQ] Waiting for reply");

        'outer: loop {
            loop {
                match self.base.decoder.decode(&mut self.base.recv)? {
                    Some(frame) => {
                        let more = frame.more();
                        self.frames.push(frame.payload);

                        if !more {
                            let mut reply: Vec<Bytes> = self.frames.drain(..).collect();

                            if self.base.options.req_correlate {
                                let got_id = if reply.is_empty() {
                                    None
                                } else {
                                    Some(reply.remove(0))
                                };
                                if got_id != self.outstanding_id {
                                    debug!("[REQ] discarding reply with mismatched correlation id");
                                    continue 'outer;
                                }
                                self.outstanding_id = None;
                            }

                            self.state = ReqState::Idle;
                            trace!("[REQ] Received reply with {} frames", reply.len());
                            return Ok(Some(reply));
                        }
                    }
                    None => break,
                }
            }

            let n = self.base.read_raw().await?;
            if n == 0 {
                trace!("[REQ] Connection closed");
                return Ok(None);
            }
        }
    }

    /// Close the socket gracefully.
    pub async fn close(self) -> io::Result<()> {
        trace!("[REQ] Closing socket");
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
impl ReqSocket<TcpStream> {
    /// Create a new REQ socket from a TCP stream with TCP_NODELAY enabled.
    pub async fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        Self::from_tcp_with_options(stream, SocketOptions::default()).await
    }

    /// Create a new REQ socket from a TCP stream with TCP_NODELAY and custom options.
    pub async fn from_tcp_with_options(stream: TcpStream, options: SocketOptions) -> io::Result<Self> {
        monocoque_core::tcp::enable_tcp_nodelay(&stream)?;
        debug!("[REQ] TCP_NODELAY enabled");
        Self::with_options(stream, options).await
    }
}

crate::impl_socket_trait!(ReqSocket<S>, SocketType::Req);
