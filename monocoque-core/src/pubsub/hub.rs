//! PUB/SUB Hub
//!
//! Responsibilities:
//! - Maintain a stable mapping from RoutingID -> PeerKey (compact u64).
//! - Track active peers with an Epoch to avoid ghost-peer races.
//! - Apply SUB / UNSUB commands to the SubscriptionIndex.
//! - Fan out published messages to matching peers (zero-copy via Bytes).
//!
//! Concurrency model:
//! - Single-threaded async task.
//! - Uses futures::select! for runtime-agnostic multiplexing.
//! - No locks on the hot publish path.
//!
//! Peer lifecycle is tracked through the [`crate::reactor`] command bus the
//! same way [`crate::router::RouterHub`] does: each peer registers an
//! [`ObjectId`] and hands it to the hub in [`PubSubEvent::PeerUp`], and
//! `PubSubHub::run`'s shutdown path drains peers with a [`Terminator`]
//! instead of broadcasting a bespoke close command. Payload fan-out writes
//! through each peer's [`PipeWriter`] via [`write_multipart`].

use crate::pipe::{write_multipart, PipeWriter, WriteOutcome};
use crate::reactor::{Command, CommandBus, MailboxReceiver, ObjectId, Terminator};
use crate::trie::{PeerKey, SubscriptionTrie};

use bytes::Bytes;
use flume::Receiver;
use hashbrown::HashMap;

/// Commands from application to PubSub Hub
#[derive(Debug)]
pub enum PubSubCmd {
    /// Publish a message (frame 0 is topic)
    Publish(Vec<Bytes>),
    /// Close all peers
    Close,
}

/// Events coming from peer actors (SUB sockets).
///
/// These are emitted by SocketActor when:
/// - handshake completes
/// - connection closes
/// - SUB / UNSUB commands are parsed
#[derive(Debug)]
pub enum PubSubEvent {
    PeerUp {
        routing_id: Bytes,
        epoch: u64,
        peer_id: ObjectId,
        pipe: PipeWriter,
    },
    PeerDown {
        routing_id: Bytes,
        epoch: u64,
    },
    Subscribe {
        routing_id: Bytes,
        prefix: Bytes,
    },
    Unsubscribe {
        routing_id: Bytes,
        prefix: Bytes,
    },
}

struct Peer {
    epoch: u64,
    id: ObjectId,
    pipe: PipeWriter,
}

/// Supervisor for PUB/SUB sockets.
///
/// This hub does *no* I/O itself.
/// It only routes already-decoded messages between actors.
pub struct PubSubHub {
    /// Subscription index (topic -> peers)
    index: SubscriptionTrie,

    /// Stable mapping: RoutingID -> PeerKey
    rid_to_key: HashMap<Bytes, PeerKey>,

    /// Reverse mapping for cleanup/debug
    key_to_rid: HashMap<PeerKey, Bytes>,

    /// Active peers: PeerKey -> Peer
    peers: HashMap<PeerKey, Peer>,

    /// Monotonic key generator
    next_key: PeerKey,

    bus: CommandBus,
    hub_id: ObjectId,
    hub_mailbox: MailboxReceiver,

    /// Events from actors
    hub_rx: Receiver<PubSubEvent>,

    /// Messages from user (publish path)
    user_tx_rx: Receiver<PubSubCmd>,
}

impl PubSubHub {
    pub fn new(bus: CommandBus, hub_rx: Receiver<PubSubEvent>, user_tx_rx: Receiver<PubSubCmd>) -> Self {
        let (hub_id, hub_mailbox) = bus.register();
        Self {
            index: SubscriptionTrie::new(),
            rid_to_key: HashMap::new(),
            key_to_rid: HashMap::new(),
            peers: HashMap::new(),
            next_key: 1, // reserve 0
            bus,
            hub_id,
            hub_mailbox,
            hub_rx,
            user_tx_rx,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.hub_id
    }

    /// Main event loop.
    pub async fn run(mut self) {
        use futures::select;
        use futures::FutureExt;

        loop {
            // Use futures::select! for runtime-agnostic multiplexing
            select! {
                msg = self.hub_rx.recv_async().fuse() => {
                    match msg {
                        Ok(ev) => self.on_hub_event(ev),
                        Err(_) => break, // shutdown
                    }
                }
                msg = self.user_tx_rx.recv_async().fuse() => {
                    match msg {
                        Ok(PubSubCmd::Close) => {
                            self.on_user_cmd(PubSubCmd::Close);
                            break;
                        }
                        Ok(cmd) => self.on_user_cmd(cmd),
                        Err(_) => break, // shutdown
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

    fn shutdown_peers(&mut self) {
        let term = Terminator::new(self.bus.clone(), self.hub_id);
        let ids: Vec<ObjectId> = self.peers.values().map(|p| p.id).collect();
        for peer in self.peers.values() {
            peer.pipe.terminate();
        }
        term.begin(ids);

        while let Some(Command::TermAck(child)) = self.hub_mailbox.try_recv() {
            term.on_ack(child);
        }

        self.peers.clear();
    }

    fn on_hub_event(&mut self, ev: PubSubEvent) {
        match ev {
            PubSubEvent::PeerUp {
                routing_id,
                epoch,
                peer_id,
                pipe,
            } => {
                // Resolve or allocate PeerKey
                let key = if let Some(&k) = self.rid_to_key.get(&routing_id) {
                    k
                } else {
                    let k = self.next_key;
                    self.next_key += 1;
                    self.rid_to_key.insert(routing_id.clone(), k);
                    self.key_to_rid.insert(k, routing_id.clone());
                    k
                };

                // Overwrite any previous epoch (reconnect case)
                self.peers.insert(
                    key,
                    Peer {
                        epoch,
                        id: peer_id,
                        pipe,
                    },
                );
            }

            PubSubEvent::PeerDown { routing_id, epoch } => {
                if let Some(&key) = self.rid_to_key.get(&routing_id) {
                    if let Some(peer) = self.peers.get(&key) {
                        // Epoch check prevents ghost-peer removal
                        if peer.epoch == epoch {
                            self.bus.reap(peer.id);
                            self.peers.remove(&key);
                            self.index.remove_peer_everywhere(key);
                        }
                    }
                }
            }

            PubSubEvent::Subscribe { routing_id, prefix } => {
                if let Some(&key) = self.rid_to_key.get(&routing_id) {
                    if self.peers.contains_key(&key) {
                        self.index.add(&prefix, key);
                    }
                }
            }

            PubSubEvent::Unsubscribe { routing_id, prefix } => {
                if let Some(&key) = self.rid_to_key.get(&routing_id) {
                    self.index.rm(&prefix, key);
                }
            }
        }
    }

    fn on_user_cmd(&mut self, cmd: PubSubCmd) {
        match cmd {
            PubSubCmd::Publish(parts) => {
                self.publish(parts);
            }
            PubSubCmd::Close => {
                for peer in self.peers.values() {
                    peer.pipe.terminate();
                }
            }
        }
    }

    /// Publish a multipart message.
    ///
    /// ZMQ convention:
    /// - Frame 0 is the topic
    fn publish(&mut self, parts: Vec<Bytes>) -> Vec<WriteOutcome> {
        if parts.is_empty() || self.index.is_empty() {
            return Vec::new();
        }

        let topic = &parts[0];
        let keys = self.index.match_topic(topic);

        if keys.is_empty() {
            return Vec::new();
        }

        // Zero-copy fanout: Vec<Bytes> is cloned per matching peer (cheap —
        // Bytes are refcounted), written frame-by-frame through that peer's
        // pipe.
        let mut outcomes = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(peer) = self.peers.get(&key) {
                outcomes.push(write_multipart(&peer.pipe, parts.clone()));
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::pipe_pair;

    fn make_hub() -> (PubSubHub, flume::Sender<PubSubEvent>, flume::Sender<PubSubCmd>) {
        let bus = CommandBus::new();
        let (hub_tx, hub_rx) = flume::unbounded();
        let (user_tx, user_rx) = flume::unbounded();
        let hub = PubSubHub::new(bus, hub_rx, user_rx);
        (hub, hub_tx, user_tx)
    }

    #[test]
    fn publish_fans_out_to_matching_subscriber() {
        let (mut hub, _hub_tx, _user_tx) = make_hub();
        let bus = hub.bus.clone();
        let (peer_id, _mailbox) = bus.register();
        let (writer, reader) = pipe_pair(8, false);

        hub.on_hub_event(PubSubEvent::PeerUp {
            routing_id: Bytes::from_static(b"sub-a"),
            epoch: 0,
            peer_id,
            pipe: writer,
        });
        hub.on_hub_event(PubSubEvent::Subscribe {
            routing_id: Bytes::from_static(b"sub-a"),
            prefix: Bytes::from_static(b"weather."),
        });

        let outcomes = hub.publish(vec![
            Bytes::from_static(b"weather.temp"),
            Bytes::from_static(b"72F"),
        ]);
        assert_eq!(outcomes, vec![WriteOutcome::Ok, WriteOutcome::Ok]);

        let topic = reader.try_read().unwrap();
        assert_eq!(topic.data(), b"weather.temp");
        let body = reader.try_read().unwrap();
        assert_eq!(body.data(), b"72F");
    }

    #[test]
    fn publish_skips_non_matching_topics() {
        let (mut hub, _hub_tx, _user_tx) = make_hub();
        let bus = hub.bus.clone();
        let (peer_id, _mailbox) = bus.register();
        let (writer, reader) = pipe_pair(8, false);

        hub.on_hub_event(PubSubEvent::PeerUp {
            routing_id: Bytes::from_static(b"sub-a"),
            epoch: 0,
            peer_id,
            pipe: writer,
        });
        hub.on_hub_event(PubSubEvent::Subscribe {
            routing_id: Bytes::from_static(b"sub-a"),
            prefix: Bytes::from_static(b"weather."),
        });

        let outcomes = hub.publish(vec![Bytes::from_static(b"sports.score")]);
        assert!(outcomes.is_empty());
        assert!(reader.try_read().is_none());
    }

    #[test]
    fn peer_down_with_stale_epoch_is_ignored() {
        let (mut hub, _hub_tx, _user_tx) = make_hub();
        let bus = hub.bus.clone();
        let (peer_id, _mailbox) = bus.register();
        let (writer, _reader) = pipe_pair(8, false);

        hub.on_hub_event(PubSubEvent::PeerUp {
            routing_id: Bytes::from_static(b"sub-a"),
            epoch: 5,
            peer_id,
            pipe: writer,
        });

        // Stale PeerDown from a superseded connection (old epoch).
        hub.on_hub_event(PubSubEvent::PeerDown {
            routing_id: Bytes::from_static(b"sub-a"),
            epoch: 1,
        });

        assert!(bus.is_registered(peer_id));
        assert!(hub.peers.contains_key(&hub.rid_to_key[&Bytes::from_static(b"sub-a")]));
    }

    #[test]
    fn peer_down_with_matching_epoch_reaps_and_unsubscribes() {
        let (mut hub, _hub_tx, _user_tx) = make_hub();
        let bus = hub.bus.clone();
        let (peer_id, _mailbox) = bus.register();
        let (writer, _reader) = pipe_pair(8, false);

        hub.on_hub_event(PubSubEvent::PeerUp {
            routing_id: Bytes::from_static(b"sub-a"),
            epoch: 5,
            peer_id,
            pipe: writer,
        });
        hub.on_hub_event(PubSubEvent::Subscribe {
            routing_id: Bytes::from_static(b"sub-a"),
            prefix: Bytes::from_static(b"weather."),
        });

        hub.on_hub_event(PubSubEvent::PeerDown {
            routing_id: Bytes::from_static(b"sub-a"),
            epoch: 5,
        });

        assert!(!bus.is_registered(peer_id));
        assert!(!hub.index.has_match(b"weather.temp"));
    }

    #[test]
    fn shutdown_terminates_every_peer_pipe() {
        let (mut hub, _hub_tx, _user_tx) = make_hub();
        let bus = hub.bus.clone();
        let (peer_id, _mailbox) = bus.register();
        let (writer, reader) = pipe_pair(8, false);

        hub.on_hub_event(PubSubEvent::PeerUp {
            routing_id: Bytes::from_static(b"sub-a"),
            epoch: 0,
            peer_id,
            pipe: writer,
        });

        hub.shutdown_peers();

        assert_eq!(reader.state(), crate::pipe::PipeState::Terminating);
        assert!(!bus.is_registered(peer_id));
    }
}
