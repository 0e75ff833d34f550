//! The pipe: an SPSC queue between an engine and a socket's application-facing
//! side, with a credit-based high/low water mark protocol and a delimiter-
//! terminated shutdown handshake.
//!
//! `original_source/src/ypipe.hpp`/`yqueue.hpp` implement this as a chunked
//! linked list with a single atomic handoff pointer (`_c`) between reader and
//! writer threads — the one word of cross-thread state the whole queue
//! needs. `flume::bounded` already gives an SPSC/MPSC-safe channel with
//! exactly that property (a lock-free ring buffer internally), so building a
//! second lock-free queue on top of it would just be re-deriving what the
//! dependency already provides; the credit/HWM/LWM bookkeeping and the
//! delimiter/terminate state machine are the actual protocol value-add and
//! are implemented here explicitly.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::message::{Message, MsgFlags};

/// Lifecycle state of one end of a pipe, mirroring ZMQ's pipe_t states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeState {
    /// Normal operation.
    Active,
    /// A delimiter has been read; no more data messages will follow, but the
    /// pipe hasn't fully drained yet.
    Delimited,
    /// `terminate()` was called; draining remaining queued messages before
    /// the final ack.
    Terminating,
    /// Both ends have acked; the pipe is fully torn down.
    Terminated,
}

/// Shared HWM/LWM credit state between a pipe's two ends.
struct Credit {
    hwm: usize,
    lwm: usize,
    /// Messages currently queued but not yet read.
    outstanding: usize,
}

impl Credit {
    fn new(hwm: usize) -> Self {
        let lwm = (hwm / 2).max(1);
        Self {
            hwm,
            lwm,
            outstanding: 0,
        }
    }

    /// Whether the writer may still enqueue without exceeding HWM.
    fn has_room(&self) -> bool {
        self.hwm == 0 || self.outstanding < self.hwm
    }

    fn on_enqueue(&mut self) {
        self.outstanding += 1;
    }

    /// Returns true if this read crossed back below LWM, i.e. the writer
    /// should be woken if it was blocked on backpressure.
    fn on_dequeue(&mut self) -> bool {
        let was_above_lwm = self.outstanding > self.lwm;
        self.outstanding = self.outstanding.saturating_sub(1);
        was_above_lwm && self.outstanding <= self.lwm
    }
}

/// Write half of a pipe.
pub struct PipeWriter {
    tx: flume::Sender<Message>,
    credit: Arc<Mutex<Credit>>,
    conflate: bool,
    last: Arc<Mutex<Option<Message>>>,
    state: Arc<Mutex<PipeState>>,
}

/// Read half of a pipe.
pub struct PipeReader {
    rx: flume::Receiver<Message>,
    credit: Arc<Mutex<Credit>>,
    conflate: bool,
    last: Arc<Mutex<Option<Message>>>,
    state: Arc<Mutex<PipeState>>,
}

/// Outcome of a write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Message accepted.
    Ok,
    /// HWM reached; caller should apply its own backpressure policy (block,
    /// drop, or error depending on socket type).
    WouldBlock,
    /// The pipe is no longer accepting writes (delimited/terminating/terminated).
    Closed,
}

/// Create a connected pipe pair with the given high water mark. `hwm == 0`
/// means unbounded (matches ZMQ_SNDHWM/RCVHWM semantics of 0 = no limit).
#[must_use]
pub fn pipe_pair(hwm: usize, conflate: bool) -> (PipeWriter, PipeReader) {
    let (tx, rx) = if hwm == 0 {
        flume::unbounded()
    } else {
        flume::bounded(hwm)
    };
    let credit = Arc::new(Mutex::new(Credit::new(hwm)));
    let last = Arc::new(Mutex::new(None));
    let state = Arc::new(Mutex::new(PipeState::Active));
    (
        PipeWriter {
            tx,
            credit: credit.clone(),
            conflate,
            last: last.clone(),
            state: state.clone(),
        },
        PipeReader {
            rx,
            credit,
            conflate,
            last,
            state,
        },
    )
}

impl PipeWriter {
    /// Enqueue a message. Honors HWM unless conflate mode is active, in
    /// which case the message always "succeeds" by overwriting the single
    /// retained slot.
    pub fn write(&self, msg: Message) -> WriteOutcome {
        if *self.state.lock() != PipeState::Active {
            return WriteOutcome::Closed;
        }
        if self.conflate {
            *self.last.lock() = Some(msg);
            return WriteOutcome::Ok;
        }
        {
            let mut credit = self.credit.lock();
            if !credit.has_room() {
                return WriteOutcome::WouldBlock;
            }
            credit.on_enqueue();
        }
        match self.tx.try_send(msg) {
            Ok(()) => WriteOutcome::Ok,
            Err(_) => {
                self.credit.lock().on_dequeue();
                WriteOutcome::Closed
            }
        }
    }

    /// Write the delimiter: no more data messages after this. Subsequent
    /// `write` calls return `Closed`.
    pub fn write_delimiter(&self) {
        *self.state.lock() = PipeState::Delimited;
    }

    /// Begin the termination handshake.
    pub fn terminate(&self) {
        *self.state.lock() = PipeState::Terminating;
    }

    #[must_use]
    pub fn state(&self) -> PipeState {
        *self.state.lock()
    }

    /// Current number of messages queued but not yet read (always 0 under
    /// conflate mode, since there's only ever one retained message).
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.credit.lock().outstanding
    }
}

impl PipeReader {
    /// Non-blocking read of the next message, if any is ready.
    pub fn try_read(&self) -> Option<Message> {
        if self.conflate {
            return self.last.lock().take();
        }
        let msg = self.rx.try_recv().ok()?;
        self.credit.lock().on_dequeue();
        Some(msg)
    }

    /// Async read: waits for the next message or pipe closure.
    pub async fn read(&self) -> Option<Message> {
        if self.conflate {
            // Conflate mode has no backlog to await; poll is sufficient
            // since the writer side only ever holds at most one message.
            return self.last.lock().take();
        }
        let msg = self.rx.recv_async().await.ok()?;
        self.credit.lock().on_dequeue();
        Some(msg)
    }

    #[must_use]
    pub fn state(&self) -> PipeState {
        *self.state.lock()
    }

    /// Acknowledge termination once the reader has drained everything it
    /// needs to.
    pub fn ack_terminate(&self) {
        *self.state.lock() = PipeState::Terminated;
    }

    #[must_use]
    pub fn has_messages(&self) -> bool {
        if self.conflate {
            return self.last.lock().is_some();
        }
        !self.rx.is_empty()
    }
}

/// Convenience wrapper pairing a pipe with the `Bytes`-oriented multipart
/// message builder, for call sites that work in terms of raw frames rather
/// than `Message` directly.
pub fn bytes_to_message(data: Bytes) -> Message {
    Message::from_bytes(data)
}

/// Write a multipart body frame-by-frame through a pipe, setting ZMTP's
/// `MORE` flag on every frame but the last. Stops at the first frame whose
/// write doesn't return `Ok`, so a `WouldBlock` mid-send doesn't silently
/// drop the remaining frames into an already-full pipe.
pub fn write_multipart(pipe: &PipeWriter, parts: Vec<Bytes>) -> WriteOutcome {
    let last = parts.len().saturating_sub(1);
    let mut outcome = WriteOutcome::Ok;
    for (i, frame) in parts.into_iter().enumerate() {
        let mut msg = Message::from_bytes(frame);
        if i != last {
            msg.add_flag(MsgFlags::MORE);
        }
        outcome = pipe.write(msg);
        if outcome != WriteOutcome::Ok {
            break;
        }
    }
    outcome
}
