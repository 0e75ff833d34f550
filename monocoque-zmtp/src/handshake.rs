//! Synchronous ZMTP handshake that completes before spawning background tasks.
//! 
//! This eliminates race conditions by ensuring both peers complete the handshake
//! protocol before any application data can be sent.
//!
//! ## Memory Allocation Strategy
//!
//! This module uses **stack arrays** for all fixed-size protocol buffers:
//! - Greeting: 64-byte stack array
//! - Frame header: 2-byte stack array  
//! - Length field: 8-byte stack array
//!
//! The READY body uses a small `Vec` allocation (typically ~27 bytes) because:
//! 1. compio's ownership-passing API requires owned buffers (can't use &mut slice)
//! 2. Size is dynamic but bounded (max 512 bytes enforced)
//! 3. Handshake happens once per connection (not in hot path)
//! 4. Total allocation overhead: ~93 bytes one-time per connection
//!
//! After handshake completes, the main data path uses arena allocator for zero-copy IO.

use crate::codec::{ZmtpError, ZmtpFrame};
use crate::mechanism::MechanismKind;
use crate::session::SocketType;
use crate::utils::FLAG_COMMAND;
use bytes::{Bytes, BytesMut};
use compio::buf::BufResult;
use compio::io::{AsyncReadExt, AsyncWriteExt};
use compio::net::TcpStream;
use monocoque_core::alloc::IoBytes;
use monocoque_core::options::SecurityMechanism;
use std::time::Duration;
use tracing::debug;

/// Result of a successful handshake
#[derive(Debug)]
pub struct HandshakeResult {
    pub peer_identity: Option<Bytes>,
    pub peer_socket_type: SocketType,
}

/// Performs the complete ZMTP handshake synchronously on the stream.
///
/// This function blocks until:
/// 1. Greeting exchange is complete (mechanism name negotiated)
/// 2. The selected `Mechanism` reports `is_done()` (NULL/PLAIN's READY
///    exchange, PLAIN's HELLO/WELCOME exchange first)
///
/// Only after this completes should the stream be handed to `SocketActor`.
///
/// `identity` is currently unused by every caller (always `None`) and by
/// both `Mechanism` impls, which only ever send an empty Identity property;
/// ROUTER-assigned identities are applied after the handshake completes.
pub async fn perform_handshake(
    stream: &mut TcpStream,
    local_socket_type: SocketType,
    _identity: Option<&[u8]>,
    mechanism: &SecurityMechanism,
) -> Result<HandshakeResult, ZmtpError> {
    let kind = MechanismKind::from_options(mechanism);
    debug!(
        "[HANDSHAKE] Starting {} handshake for {}",
        kind.wire_name(),
        local_socket_type.as_str()
    );

    // Step 1: greeting exchange, advertising the configured mechanism name.
    let greeting_bytes = build_greeting(kind.wire_name());
    let io_buf = IoBytes::new(greeting_bytes.clone());
    let BufResult(write_res, _) = stream.write_all(io_buf).await;
    write_res.map_err(|_| ZmtpError::Protocol)?;
    debug!("[HANDSHAKE] Sent greeting ({} bytes)", greeting_bytes.len());

    let greeting_buf = [0u8; 64];
    let BufResult(read_res, greeting_buf) = stream.read_exact(greeting_buf).await;
    read_res.map_err(|_| ZmtpError::Protocol)?;
    debug!("[HANDSHAKE] Received peer greeting (64 bytes)");

    if greeting_buf[0] != 0xFF {
        return Err(ZmtpError::Protocol);
    }

    let peer_mechanism = std::str::from_utf8(&greeting_buf[12..32])
        .map_err(|_| ZmtpError::Protocol)?
        .trim_end_matches('\0');
    if peer_mechanism != kind.wire_name() {
        debug!(
            "[HANDSHAKE] Mechanism mismatch: local={} peer={}",
            kind.wire_name(),
            peer_mechanism
        );
        return Err(ZmtpError::Protocol);
    }

    // Step 2: drive the mechanism's own command-frame state machine
    // (HELLO/WELCOME for PLAIN, nothing extra for NULL) through READY.
    let mut mech = kind.build(local_socket_type);
    loop {
        while let Some(out) = mech.next_outbound() {
            let io_buf = IoBytes::new(out.clone());
            let BufResult(write_res, _) = stream.write_all(io_buf).await;
            write_res.map_err(|_| ZmtpError::Protocol)?;
        }

        if mech.is_done() {
            break;
        }

        let frame = read_command_frame(stream).await?;
        mech.on_inbound(&frame)?;
    }

    let peer_socket_type = mech.peer_socket_type().ok_or(ZmtpError::Protocol)?;
    debug!("[HANDSHAKE] Handshake complete! Peer is {}", peer_socket_type.as_str());

    Ok(HandshakeResult {
        peer_identity: mech.peer_identity(),
        peer_socket_type,
    })
}

/// Performs the handshake with an overall deadline.
///
/// `None` disables the timeout (equivalent to `perform_handshake`). Used by
/// every socket constructor so a peer that never completes its greeting
/// can't wedge `bind`/`connect` forever.
pub async fn perform_handshake_with_timeout(
    stream: &mut TcpStream,
    local_socket_type: SocketType,
    identity: Option<&[u8]>,
    mechanism: &SecurityMechanism,
    timeout: Option<Duration>,
) -> Result<HandshakeResult, ZmtpError> {
    match timeout {
        None => perform_handshake(stream, local_socket_type, identity, mechanism).await,
        Some(dur) => compio::time::timeout(
            dur,
            perform_handshake(stream, local_socket_type, identity, mechanism),
        )
        .await
        .map_err(|_| ZmtpError::Protocol)?,
    }
}

/// Build a ZMTP 3.0 greeting (64 bytes) advertising `mechanism_name`
/// (truncated to 20 bytes, null-padded — matches every name this crate uses).
fn build_greeting(mechanism_name: &str) -> Bytes {
    let mut b = BytesMut::with_capacity(64);

    // Signature
    b.extend_from_slice(&[0xFF]);
    b.extend_from_slice(&[0u8; 8]);
    b.extend_from_slice(&[0x7F]);

    // Version 3.0
    b.extend_from_slice(&[0x03, 0x00]);

    // Mechanism (20 bytes, null-padded)
    let name_bytes = mechanism_name.as_bytes();
    let take = name_bytes.len().min(20);
    b.extend_from_slice(&name_bytes[..take]);
    b.extend_from_slice(&vec![0u8; 20 - take]);

    // As-server flag = 0
    b.extend_from_slice(&[0x00]);

    // Padding
    b.extend_from_slice(&[0u8; 31]);

    b.freeze()
}

/// Read a single ZMTP command frame (header + optional long-length + body)
/// off the stream, used for both READY and PLAIN's HELLO/WELCOME/ERROR.
async fn read_command_frame(stream: &mut TcpStream) -> Result<ZmtpFrame, ZmtpError> {
    let header_buf = [0u8; 2];
    let BufResult(read_res, header_buf) = stream.read_exact(header_buf).await;
    read_res.map_err(|_| ZmtpError::Protocol)?;

    let flags = header_buf[0];
    let is_command = (flags & FLAG_COMMAND) != 0;
    let is_long = (flags & 0x02) != 0;

    if !is_command {
        debug!("[HANDSHAKE] ERROR: Expected COMMAND frame, got data frame");
        return Err(ZmtpError::Protocol);
    }

    let body_len = if is_long {
        let len_buf = [0u8; 8];
        let BufResult(read_res, len_buf) = stream.read_exact(len_buf).await;
        read_res.map_err(|_| ZmtpError::Protocol)?;
        u64::from_be_bytes(len_buf) as usize
    } else {
        header_buf[1] as usize
    };

    // Command frames exchanged during handshake are small (READY/HELLO/
    // WELCOME are all well under this); reject anything absurd.
    const MAX_COMMAND_SIZE: usize = 512;
    if body_len > MAX_COMMAND_SIZE {
        debug!("[HANDSHAKE] ERROR: command body too large: {} bytes", body_len);
        return Err(ZmtpError::Protocol);
    }

    let body_buf = vec![0u8; body_len];
    let BufResult(read_res, body_buf) = stream.read_exact(body_buf).await;
    read_res.map_err(|_| ZmtpError::Protocol)?;

    Ok(ZmtpFrame {
        flags,
        payload: Bytes::from(body_buf),
    })
}
