//! Object-id-addressed command bus between reactor-owned objects.
//!
//! `original_source/src/io_thread.hpp`/`object.hpp`/`own.hpp` run a fixed
//! pool of I/O threads, each driving a mailbox of commands addressed to
//! objects (sockets, pipes, engines) by a small integer id — `plug`, `own`,
//! `attach`, `bind`, `activate_read`/`activate_write`, `hiccup`, and the
//! two-phase `term_req`/`term`/`term_ack` shutdown handshake that lets a
//! parent wait for every child it owns to drain before reaping it. This
//! module is that same shape, built the way `router.rs`'s `RouterHub::run()`
//! already multiplexes channels with `futures::select!`/`FutureExt::fuse()`
//! — generalized here from two fixed channels to any number of
//! mailboxes registered at runtime, and addressed by id instead of by having
//! one channel field per purpose.
//!
//! A `Mailbox` is a single-consumer command queue; a `CommandBus` is the
//! shared registry mapping [`ObjectId`] to the sending half of a mailbox, so
//! any thread holding a `CommandBus` handle can address a command to any
//! registered object without knowing which thread owns it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Identifies one reactor-owned object (a socket, pipe, or engine) across
/// threads. Allocated by [`CommandBus::register`].
pub type ObjectId = u64;

/// Commands carried on the cross-thread command bus.
///
/// Mirrors the vocabulary `original_source/src/command.hpp` defines for
/// `zmq::command_t`, trimmed to the subset this implementation's transports
/// and patterns actually drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Shut this object down unconditionally; no drain, no ack expected.
    Stop,
    /// Finish second-stage initialization after construction.
    Plug,
    /// Take ownership of a newly created child object.
    Own(ObjectId),
    /// Attach a pipe endpoint to this object.
    Attach(ObjectId),
    /// Bind this object to a listening transport.
    Bind(ObjectId),
    /// The peer end of a pipe became readable.
    ActivateRead,
    /// The peer end of a pipe became writable again (credit freed).
    ActivateWrite,
    /// A pipe's peer reconnected; any in-flight un-acked I/O on the old
    /// connection should be considered lost.
    Hiccup,
    /// One side of a pipe is terminating; sent from the first side to start
    /// the 3-way pipe teardown handshake.
    PipeTerm,
    /// Acknowledges [`Command::PipeTerm`]; the pipe is fully drained on the
    /// sender's side.
    PipeTermAck,
    /// Parent asks a specific child to begin terminating. The child is
    /// expected to drain its pipes and reply with
    /// `TermAck(child_id)` addressed back to the parent's own mailbox.
    TermReq(ObjectId),
    /// Begin terminating self (no specific child — e.g. reactor shutdown).
    Term,
    /// A child finished terminating; carries the child's id so a parent
    /// waiting on several children can tell which one just acked.
    TermAck(ObjectId),
    /// Sent by a parent to the bus once a terminated child's `TermAck` has
    /// been observed, asking the bus to free that child's mailbox slot.
    Reap(ObjectId),
}

/// Send half of a mailbox, cheaply cloneable so many senders can address the
/// same object.
#[derive(Clone)]
pub struct MailboxSender {
    id: ObjectId,
    tx: flume::Sender<Command>,
}

impl MailboxSender {
    /// The object id this sender delivers to.
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// Enqueue a command. Returns `false` if the receiving object's mailbox
    /// has already been dropped (object gone / reaped).
    pub fn send(&self, cmd: Command) -> bool {
        self.tx.send(cmd).is_ok()
    }
}

/// Receive half of a mailbox. Not `Clone`: exactly one task drains a given
/// object's commands, matching the "single-consumer" contract every
/// reactor-owned object needs to process its own commands in order.
pub struct MailboxReceiver {
    id: ObjectId,
    rx: flume::Receiver<Command>,
}

impl MailboxReceiver {
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// Async wait for the next command, or `None` once every sender for
    /// this mailbox has been dropped.
    pub async fn recv(&self) -> Option<Command> {
        self.rx.recv_async().await.ok()
    }

    /// Non-blocking poll for the next queued command.
    pub fn try_recv(&self) -> Option<Command> {
        self.rx.try_recv().ok()
    }
}

/// Allocate a fresh, unaddressed mailbox pair. Most callers go through
/// [`CommandBus::register`] instead, which also publishes the sender into
/// the shared registry; this is exposed directly for objects that want a
/// private back-channel (e.g. a parent's own inbox for `TermAck`s) without
/// registering it for arbitrary senders to discover.
#[must_use]
pub fn mailbox(id: ObjectId) -> (MailboxSender, MailboxReceiver) {
    let (tx, rx) = flume::unbounded();
    (MailboxSender { id, tx }, MailboxReceiver { id, rx })
}

/// Shared registry of object mailboxes. Cheap to clone (wraps an `Arc`);
/// every thread participating in the reactor holds one of these to address
/// commands to any object by id.
#[derive(Clone, Default)]
pub struct CommandBus {
    inner: Arc<CommandBusInner>,
}

#[derive(Default)]
struct CommandBusInner {
    next_id: AtomicU64,
    senders: Mutex<HashMap<ObjectId, MailboxSender>>,
}

impl CommandBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new object id, create its mailbox, publish the sending
    /// half in the registry, and hand the receiving half to the caller to
    /// drive its own command loop.
    pub fn register(&self) -> (ObjectId, MailboxReceiver) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mailbox(id);
        self.inner.senders.lock().insert(id, tx);
        (id, rx)
    }

    /// Address a command to `target`. Returns `false` if `target` isn't (or
    /// is no longer) registered.
    pub fn send(&self, target: ObjectId, cmd: Command) -> bool {
        let sender = { self.inner.senders.lock().get(&target).cloned() };
        match sender {
            Some(s) => s.send(cmd),
            None => false,
        }
    }

    /// Broadcast a command to every currently registered object (used for
    /// whole-reactor `Stop` on shutdown).
    pub fn broadcast(&self, cmd: Command) {
        for sender in self.inner.senders.lock().values() {
            let _ = sender.send(cmd.clone());
        }
    }

    /// Free a terminated object's mailbox slot. Idempotent.
    pub fn reap(&self, target: ObjectId) {
        self.inner.senders.lock().remove(&target);
    }

    #[must_use]
    pub fn is_registered(&self, id: ObjectId) -> bool {
        self.inner.senders.lock().contains_key(&id)
    }

    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.inner.senders.lock().len()
    }
}

/// Drives the two-phase `TermReq` -> `TermAck` -> `Reap` shutdown handshake
/// for a parent waiting on a fixed set of children (§4.5/§8.7's termination
/// protocol), so hub-style objects don't each hand-roll the bookkeeping.
pub struct Terminator {
    bus: CommandBus,
    parent: ObjectId,
    pending: Mutex<std::collections::HashSet<ObjectId>>,
}

impl Terminator {
    #[must_use]
    pub fn new(bus: CommandBus, parent: ObjectId) -> Self {
        Self {
            bus,
            parent,
            pending: Mutex::new(std::collections::HashSet::new()),
        }
    }

    /// Ask every child in `children` to begin terminating. Each child is
    /// expected to eventually send `TermAck(child_id)` to `parent`'s
    /// mailbox once drained.
    pub fn begin(&self, children: impl IntoIterator<Item = ObjectId>) {
        let mut pending = self.pending.lock();
        for child in children {
            pending.insert(child);
            self.bus.send(child, Command::TermReq(self.parent));
        }
    }

    /// Record a `TermAck` observed on the parent's mailbox and reap that
    /// child. Returns `true` once every child started via [`Self::begin`]
    /// has acked (i.e. termination is complete).
    pub fn on_ack(&self, child: ObjectId) -> bool {
        let mut pending = self.pending.lock();
        pending.remove(&child);
        self.bus.reap(child);
        pending.is_empty()
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_allocates_distinct_ids() {
        let bus = CommandBus::new();
        let (a, _ra) = bus.register();
        let (b, _rb) = bus.register();
        assert_ne!(a, b);
        assert_eq!(bus.registered_count(), 2);
    }

    #[test]
    fn send_delivers_to_registered_object() {
        let bus = CommandBus::new();
        let (id, rx) = bus.register();
        assert!(bus.send(id, Command::ActivateWrite));
        assert_eq!(rx.try_recv(), Some(Command::ActivateWrite));
    }

    #[test]
    fn send_to_unknown_id_fails() {
        let bus = CommandBus::new();
        assert!(!bus.send(999, Command::Stop));
    }

    #[test]
    fn reap_removes_registration() {
        let bus = CommandBus::new();
        let (id, _rx) = bus.register();
        bus.reap(id);
        assert!(!bus.is_registered(id));
        assert!(!bus.send(id, Command::Stop));
    }

    #[test]
    fn broadcast_reaches_every_registered_object() {
        let bus = CommandBus::new();
        let (_a, ra) = bus.register();
        let (_b, rb) = bus.register();
        bus.broadcast(Command::Stop);
        assert_eq!(ra.try_recv(), Some(Command::Stop));
        assert_eq!(rb.try_recv(), Some(Command::Stop));
    }

    #[test]
    fn terminator_two_phase_handshake_completes_after_every_child_acks() {
        let bus = CommandBus::new();
        let (parent_id, parent_rx) = bus.register();
        let (child_a, child_a_rx) = bus.register();
        let (child_b, child_b_rx) = bus.register();

        let term = Terminator::new(bus.clone(), parent_id);
        term.begin([child_a, child_b]);

        // Both children observed a TermReq naming the parent.
        assert_eq!(child_a_rx.try_recv(), Some(Command::TermReq(parent_id)));
        assert_eq!(child_b_rx.try_recv(), Some(Command::TermReq(parent_id)));
        assert!(!term.is_done());

        // Children reply with TermAck addressed to the parent's mailbox.
        bus.send(parent_id, Command::TermAck(child_a));
        bus.send(parent_id, Command::TermAck(child_b));

        // Parent drains its own mailbox and feeds acks back to the terminator.
        let mut done = false;
        while let Some(cmd) = parent_rx.try_recv() {
            if let Command::TermAck(child) = cmd {
                done = term.on_ack(child);
            }
        }
        assert!(done);
        assert!(term.is_done());
        assert!(!bus.is_registered(child_a));
        assert!(!bus.is_registered(child_b));
    }

    #[test]
    fn terminator_not_done_until_every_child_acks() {
        let bus = CommandBus::new();
        let (parent_id, _parent_rx) = bus.register();
        let (child_a, _) = bus.register();
        let (child_b, _) = bus.register();

        let term = Terminator::new(bus, parent_id);
        term.begin([child_a, child_b]);

        assert!(!term.on_ack(child_a));
        assert!(term.on_ack(child_b));
    }
}
