//! ROUTER Hub
//!
//! Goals:
//! - Runtime-agnostic async loop (futures::select!, no tokio)
//! - Strict types: RouterCmd has envelope, peer payload is body-only
//! - Envelope normalization:
//!     inbound (actor->user) is normalized elsewhere to [ID, Empty, Body...]
//!     outbound (user->hub) accepts [ID, (Empty), Body...] in Standard mode
//! - Load balancer mode: round-robin dispatch when no explicit routing id is used
//! - "Ghost peer" self-heal: stale IDs removed from rr list when detected
//!
//! Peer lifecycle (registration, shutdown) runs on the [`crate::reactor`]
//! command bus instead of an ad hoc `Sender<PeerCmd>` per peer: each peer
//! actor registers itself with the shared [`CommandBus`] and hands the hub
//! its [`ObjectId`] in [`HubEvent::PeerUp`]. Peer *payload* travels over a
//! [`PipeWriter`] (the HWM/LWM credit pipe), one frame per `Message`, using
//! ZMTP's `MORE` flag to mark every frame but the last in a multipart send —
//! so a send that would have blocked on a slow peer reports `WouldBlock`
//! instead of silently buffering without limit.

use bytes::Bytes;
use flume::Receiver;
use hashbrown::HashMap;

use crate::pipe::{write_multipart, PipeWriter, WriteOutcome};
use crate::reactor::{Command, CommandBus, MailboxReceiver, ObjectId, Terminator};

/// Commands sent from application to Router Hub
#[derive(Debug)]
pub enum RouterCmd {
    /// Send a message (with routing envelope in Standard mode, or body-only in LB mode)
    SendMessage(Vec<Bytes>),
    /// Close all peers
    Close,
}

/// Lifecycle announcement from a peer connection actor to the hub.
#[derive(Debug)]
pub enum HubEvent {
    /// A peer actor has registered on the command bus under `peer_id` and is
    /// ready to receive payload over `pipe`.
    PeerUp {
        routing_id: Bytes,
        peer_id: ObjectId,
        pipe: PipeWriter,
    },
    /// A peer actor is gone; the hub reaps its bus registration.
    PeerDown { routing_id: Bytes, peer_id: ObjectId },
}

/// Router behavior modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterBehavior {
    /// Standard ROUTER: expects user outbound as [ID, (Empty), Body...]
    /// If ID is unknown, drop silently (libzmq behavior).
    Standard,

    /// Load balancer: expects user outbound as [Body...]
    /// Hub picks a peer using strict-ish RR.
    LoadBalancer,
}

struct Peer {
    id: ObjectId,
    pipe: PipeWriter,
}

/// The Router Supervisor.
///
/// This runs once per ROUTER socket (listener), and coordinates N peer actors.
pub struct RouterHub {
    // routing table
    peers: HashMap<Bytes, Peer>,

    // LB rotation list (routing IDs)
    lb_list: Vec<Bytes>,
    lb_cursor: usize,
    behavior: RouterBehavior,

    bus: CommandBus,
    hub_id: ObjectId,
    hub_mailbox: MailboxReceiver,

    // channels
    hub_rx: Receiver<HubEvent>,
    user_tx_rx: Receiver<RouterCmd>,
}

impl RouterHub {
    pub fn new(
        bus: CommandBus,
        hub_rx: Receiver<HubEvent>,
        user_tx_rx: Receiver<RouterCmd>,
        behavior: RouterBehavior,
    ) -> Self {
        let (hub_id, hub_mailbox) = bus.register();
        Self {
            peers: HashMap::new(),
            lb_list: Vec::new(),
            lb_cursor: 0,
            behavior,
            bus,
            hub_id,
            hub_mailbox,
            hub_rx,
            user_tx_rx,
        }
    }

    /// This hub's own object id on the command bus, for peers to address
    /// `TermAck` back to once they've drained.
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.hub_id
    }

    pub async fn run(mut self) {
        use futures::select;
        use futures::FutureExt;

        loop {
            // Use futures::select! for runtime-agnostic multiplexing
            select! {
                msg = self.hub_rx.recv_async().fuse() => {
                    match msg {
                        Ok(ev) => self.handle_peer_event(ev),
                        Err(_) => break, // channel closed
                    }
                }
                msg = self.user_tx_rx.recv_async().fuse() => {
                    match msg {
                        Ok(RouterCmd::Close) => {
                            self.handle_user_cmd(RouterCmd::Close);
                            break;
                        }
                        Ok(cmd) => self.handle_user_cmd(cmd),
                        Err(_) => break, // channel closed
                    }
                }
                cmd = self.hub_mailbox.recv().fuse() => {
                    match cmd {
                        Some(Command::TermAck(child)) => self.bus.reap(child),
                        Some(Command::Stop) | None => break,
                        Some(_) => {}
                    }
                }
            }
        }

        self.shutdown_peers();
    }

    /// Tells every live peer to terminate its pipe and walks the two-phase
    /// `TermReq`/`TermAck` handshake, then drops the routing table.
    fn shutdown_peers(&mut self) {
        let term = Terminator::new(self.bus.clone(), self.hub_id);
        let ids: Vec<ObjectId> = self.peers.values().map(|p| p.id).collect();
        for peer in self.peers.values() {
            peer.pipe.terminate();
        }
        term.begin(ids);

        // Best-effort drain: a peer that's already gone won't ack, and this
        // hub is shutting down regardless, so don't block waiting on it —
        // reap() is idempotent and an un-acked id just leaves a stale bus
        // entry rather than wedging shutdown.
        while let Some(Command::TermAck(child)) = self.hub_mailbox.try_recv() {
            term.on_ack(child);
        }

        self.peers.clear();
        self.lb_list.clear();
    }

    fn handle_peer_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::PeerUp {
                routing_id,
                peer_id,
                pipe,
            } => {
                // Strict dedup: if ID exists, remove it from lb_list first to prevent drift.
                if self.peers.contains_key(&routing_id) {
                    if let Some(pos) = self.lb_list.iter().position(|x| x == &routing_id) {
                        self.lb_list.remove(pos);
                        if self.lb_cursor >= self.lb_list.len() {
                            self.lb_cursor = 0;
                        }
                    }
                }

                self.lb_list.push(routing_id.clone());
                self.peers.insert(routing_id, Peer { id: peer_id, pipe });
            }

            HubEvent::PeerDown { routing_id, peer_id } => {
                self.peers.remove(&routing_id);
                self.bus.reap(peer_id);

                // Remove from LB list (O(N) but churn is not hot-path).
                if let Some(pos) = self.lb_list.iter().position(|x| x == &routing_id) {
                    self.lb_list.remove(pos);
                    if self.lb_cursor >= self.lb_list.len() {
                        self.lb_cursor = 0;
                    }
                }
            }
        }
    }

    fn handle_user_cmd(&mut self, cmd: RouterCmd) {
        match cmd {
            RouterCmd::SendMessage(parts) => self.route_outbound(parts),
            RouterCmd::Close => {
                for peer in self.peers.values() {
                    peer.pipe.terminate();
                }
            }
        }
    }

    /// Self-healing Round Robin peer selection.
    ///
    /// Returns a routing id that is present in `peers`, while repairing stale entries in `lb_list`.
    fn pick_rr_peer(&mut self) -> Option<Bytes> {
        let mut attempts = 0usize;
        let max_attempts = self.lb_list.len();

        while !self.lb_list.is_empty() && attempts <= max_attempts {
            if self.lb_cursor >= self.lb_list.len() {
                self.lb_cursor = 0;
            }

            let id = self.lb_list[self.lb_cursor].clone();
            // advance cursor for next pick
            self.lb_cursor = (self.lb_cursor + 1) % self.lb_list.len();

            if self.peers.contains_key(&id) {
                return Some(id);
            }

            // stale entry => repair
            if let Some(pos) = self.lb_list.iter().position(|x| x == &id) {
                self.lb_list.remove(pos);
                // cursor might now be out of bounds; loop header fixes it.
            }

            attempts += 1;
        }

        None
    }

    fn route_outbound(&mut self, mut parts: Vec<Bytes>) -> WriteOutcome {
        if parts.is_empty() {
            return WriteOutcome::Ok;
        }

        match self.behavior {
            RouterBehavior::Standard => {
                // Expect: [ID, (Empty), Body...]
                // NOTE: `remove(0)` is O(n), but this is hub-path, not IO hot loop.
                let target_id = parts.remove(0);

                // Normalize: drop optional empty delimiter frame
                if !parts.is_empty() && parts[0].is_empty() {
                    parts.remove(0);
                }

                if let Some(peer) = self.peers.get(&target_id) {
                    write_multipart(&peer.pipe, parts)
                } else {
                    // ZMQ behavior: silently drop if unknown id
                    WriteOutcome::Ok
                }
            }

            RouterBehavior::LoadBalancer => {
                // Expect: [Body...]
                if let Some(id) = self.pick_rr_peer() {
                    if let Some(peer) = self.peers.get(&id) {
                        return write_multipart(&peer.pipe, parts);
                    }
                }
                // No peers available: drop for now (backpressure elsewhere)
                WriteOutcome::Ok
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MsgFlags;
    use crate::pipe::{pipe_pair, PipeState};
    use flume::Sender;

    fn make_hub(behavior: RouterBehavior) -> (RouterHub, Sender<HubEvent>, Sender<RouterCmd>) {
        let bus = CommandBus::new();
        let (hub_tx, hub_rx) = flume::unbounded();
        let (user_tx, user_rx) = flume::unbounded();
        let hub = RouterHub::new(bus, hub_rx, user_rx, behavior);
        (hub, hub_tx, user_tx)
    }

    #[test]
    fn peer_up_registers_and_route_outbound_delivers() {
        let (mut hub, _hub_tx, _user_tx) = make_hub(RouterBehavior::Standard);
        let bus = hub.bus.clone();
        let (peer_id, _peer_mailbox) = bus.register();
        let (writer, reader) = pipe_pair(8, false);

        hub.handle_peer_event(HubEvent::PeerUp {
            routing_id: Bytes::from_static(b"peer-a"),
            peer_id,
            pipe: writer,
        });

        let outcome =
            hub.route_outbound(vec![Bytes::from_static(b"peer-a"), Bytes::from_static(b"hello")]);
        assert_eq!(outcome, WriteOutcome::Ok);

        let got = reader.try_read().unwrap();
        assert_eq!(got.data(), b"hello");
    }

    #[test]
    fn route_outbound_drops_unknown_peer_silently() {
        let (mut hub, _hub_tx, _user_tx) = make_hub(RouterBehavior::Standard);
        let outcome =
            hub.route_outbound(vec![Bytes::from_static(b"ghost"), Bytes::from_static(b"x")]);
        assert_eq!(outcome, WriteOutcome::Ok);
    }

    #[test]
    fn multipart_send_sets_more_flag_on_every_frame_but_last() {
        let (mut hub, _hub_tx, _user_tx) = make_hub(RouterBehavior::Standard);
        let bus = hub.bus.clone();
        let (peer_id, _mailbox) = bus.register();
        let (writer, reader) = pipe_pair(8, false);
        hub.handle_peer_event(HubEvent::PeerUp {
            routing_id: Bytes::from_static(b"peer-a"),
            peer_id,
            pipe: writer,
        });

        hub.route_outbound(vec![
            Bytes::from_static(b"peer-a"),
            Bytes::from_static(b"part1"),
            Bytes::from_static(b"part2"),
        ]);

        let first = reader.try_read().unwrap();
        assert!(first.flags().contains(MsgFlags::MORE));
        let second = reader.try_read().unwrap();
        assert!(!second.flags().contains(MsgFlags::MORE));
    }

    #[test]
    fn load_balancer_round_robins_across_peers() {
        let (mut hub, _hub_tx, _user_tx) = make_hub(RouterBehavior::LoadBalancer);
        let bus = hub.bus.clone();

        let (id_a, _ma) = bus.register();
        let (writer_a, reader_a) = pipe_pair(8, false);
        hub.handle_peer_event(HubEvent::PeerUp {
            routing_id: Bytes::from_static(b"a"),
            peer_id: id_a,
            pipe: writer_a,
        });

        let (id_b, _mb) = bus.register();
        let (writer_b, reader_b) = pipe_pair(8, false);
        hub.handle_peer_event(HubEvent::PeerUp {
            routing_id: Bytes::from_static(b"b"),
            peer_id: id_b,
            pipe: writer_b,
        });

        hub.route_outbound(vec![Bytes::from_static(b"first")]);
        hub.route_outbound(vec![Bytes::from_static(b"second")]);

        assert!(reader_a.try_read().is_some());
        assert!(reader_b.try_read().is_some());
    }

    #[test]
    fn peer_down_reaps_bus_registration() {
        let (mut hub, _hub_tx, _user_tx) = make_hub(RouterBehavior::Standard);
        let bus = hub.bus.clone();
        let (peer_id, _mailbox) = bus.register();
        let (writer, _reader) = pipe_pair(4, false);

        hub.handle_peer_event(HubEvent::PeerUp {
            routing_id: Bytes::from_static(b"peer-a"),
            peer_id,
            pipe: writer,
        });
        assert!(bus.is_registered(peer_id));

        hub.handle_peer_event(HubEvent::PeerDown {
            routing_id: Bytes::from_static(b"peer-a"),
            peer_id,
        });
        assert!(!bus.is_registered(peer_id));
    }

    #[test]
    fn shutdown_terminates_every_peer_pipe() {
        let (mut hub, _hub_tx, _user_tx) = make_hub(RouterBehavior::Standard);
        let bus = hub.bus.clone();
        let (peer_id, _mailbox) = bus.register();
        let (writer, reader) = pipe_pair(4, false);
        hub.handle_peer_event(HubEvent::PeerUp {
            routing_id: Bytes::from_static(b"peer-a"),
            peer_id,
            pipe: writer,
        });

        hub.shutdown_peers();

        assert_eq!(reader.state(), PipeState::Terminating);
        assert!(!bus.is_registered(peer_id));
    }
}
