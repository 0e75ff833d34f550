//! Buffer sizing configuration shared by every transport-facing crate.
//!
//! Moved here from `monocoque-zmtp` so that both the codec (which needs
//! `STAGING_BUF_INITIAL_CAP`) and the engine (which needs `BufferConfig`)
//! can depend on a single definition instead of two crates each assuming the
//! other owns it.

/// Default read buffer size (8KB).
///
/// Used for arena-allocated read buffers. Tune based on expected message
/// sizes: small messages (< 1KB) work fine at 4096, large ones (> 8KB) may
/// want 16384 or 32768.
pub const DEFAULT_READ_BUF_SIZE: usize = 8192;

/// Default write buffer size (8KB), should match typical encoded message size.
pub const DEFAULT_WRITE_BUF_SIZE: usize = 8192;

/// Small read buffer size (4KB), tuned for REQ/REP ping-pong with small messages.
pub const SMALL_READ_BUF_SIZE: usize = 4096;

/// Small write buffer size (4KB).
pub const SMALL_WRITE_BUF_SIZE: usize = 4096;

/// Large read buffer size (16KB), tuned for DEALER/ROUTER with bigger payloads.
pub const LARGE_READ_BUF_SIZE: usize = 16384;

/// Large write buffer size (16KB).
pub const LARGE_WRITE_BUF_SIZE: usize = 16384;

/// Initial staging buffer capacity for decoder reassembly (256 bytes).
///
/// Pre-allocated to avoid a reallocation on the first fragmented frame; only
/// touched when a frame spans multiple reads (the decoder's slow path).
pub const STAGING_BUF_INITIAL_CAP: usize = 256;

/// Socket buffer configuration: read/write buffer sizes tuned per workload.
#[derive(Debug, Clone, Copy)]
pub struct BufferConfig {
    /// Read buffer size (arena allocation).
    pub read_buf_size: usize,
    /// Write buffer size (`BytesMut` capacity).
    pub write_buf_size: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            read_buf_size: DEFAULT_READ_BUF_SIZE,
            write_buf_size: DEFAULT_WRITE_BUF_SIZE,
        }
    }
}

impl BufferConfig {
    /// Configuration optimized for small messages (< 1KB), e.g. REQ/REP.
    #[must_use]
    pub const fn small() -> Self {
        Self {
            read_buf_size: SMALL_READ_BUF_SIZE,
            write_buf_size: SMALL_WRITE_BUF_SIZE,
        }
    }

    /// Configuration optimized for large messages (8-16KB), e.g. DEALER/ROUTER.
    #[must_use]
    pub const fn large() -> Self {
        Self {
            read_buf_size: LARGE_READ_BUF_SIZE,
            write_buf_size: LARGE_WRITE_BUF_SIZE,
        }
    }

    /// Custom buffer configuration.
    #[must_use]
    pub const fn custom(read_buf_size: usize, write_buf_size: usize) -> Self {
        Self {
            read_buf_size,
            write_buf_size,
        }
    }
}
