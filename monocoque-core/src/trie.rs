//! Radix tree subscription index.
//!
//! The real libzmq keeps subscriptions in a byte-indexed trie
//! (`generic_mtrie_t`) rather than a sorted vector, so a single topic publish
//! walks one tree path instead of scanning every registered prefix. This
//! mirrors that shape: each node owns up to one child per possible next byte
//! plus the set of peers subscribed exactly at that node.
//!
//! Complexity: `add`/`rm` are `O(|topic|)`; `match_topic` is `O(|payload|)`
//! (it only ever walks as deep as the published topic is long).

use bytes::Bytes;
use hashbrown::HashMap;
use smallvec::SmallVec;

/// Compact integer ID for peers, kept dense rather than storing channel
/// handles directly in tree nodes.
pub type PeerKey = u64;

/// A subscribe/unsubscribe notification as carried on the wire between
/// XSUB and XPUB: a single leading byte (0x01 subscribe, 0x00 unsubscribe)
/// followed by the topic prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Subscribe(Bytes),
    Unsubscribe(Bytes),
}

impl SubscriptionEvent {
    /// Parse a subscription message: `[0x01|0x00][prefix...]`.
    #[must_use]
    pub fn from_message(msg: &[u8]) -> Option<Self> {
        let (&tag, prefix) = msg.split_first()?;
        let prefix = Bytes::copy_from_slice(prefix);
        match tag {
            0x01 => Some(Self::Subscribe(prefix)),
            0x00 => Some(Self::Unsubscribe(prefix)),
            _ => None,
        }
    }

    /// Encode this event as a subscription message.
    #[must_use]
    pub fn to_message(&self) -> Bytes {
        let (tag, prefix) = match self {
            Self::Subscribe(p) => (0x01u8, p),
            Self::Unsubscribe(p) => (0x00u8, p),
        };
        let mut out = Vec::with_capacity(1 + prefix.len());
        out.push(tag);
        out.extend_from_slice(prefix);
        Bytes::from(out)
    }

    #[must_use]
    pub const fn prefix(&self) -> &Bytes {
        match self {
            Self::Subscribe(p) | Self::Unsubscribe(p) => p,
        }
    }

    #[must_use]
    pub const fn is_subscribe(&self) -> bool {
        matches!(self, Self::Subscribe(_))
    }
}

#[derive(Default)]
struct Node {
    children: HashMap<u8, Box<Node>>,
    /// Peers subscribed at exactly this path (i.e. to this literal prefix).
    peers: SmallVec<[PeerKey; 4]>,
    /// Count of subscriptions at-or-below this node, kept so `rm` can prune
    /// dead branches in one pass without a second traversal.
    refcount: usize,
}

/// Literal radix tree mapping topic-prefix subscriptions to peers.
#[derive(Default)]
pub struct SubscriptionTrie {
    root: Node,
    len: usize,
}

impl SubscriptionTrie {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct (prefix, peer) subscriptions registered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Subscribe `peer` to `prefix`. Idempotent if already subscribed.
    pub fn add(&mut self, prefix: &[u8], peer: PeerKey) {
        let mut node = &mut self.root;
        node.refcount += 1;
        for &byte in prefix {
            node = node.children.entry(byte).or_insert_with(|| Box::new(Node::default()));
            node.refcount += 1;
        }
        if !node.peers.contains(&peer) {
            node.peers.push(peer);
            self.len += 1;
        } else {
            // Revert the refcount bump since no new subscription was added.
            let mut undo = &mut self.root;
            undo.refcount -= 1;
            for &byte in prefix {
                undo = undo.children.get_mut(&byte).expect("path just walked");
                undo.refcount -= 1;
            }
        }
    }

    /// Unsubscribe `peer` from `prefix`, pruning now-empty branches.
    pub fn rm(&mut self, prefix: &[u8], peer: PeerKey) {
        if Self::rm_at(&mut self.root, prefix, peer) {
            self.len -= 1;
        }
    }

    /// Returns true if a subscription was actually removed along this path.
    /// Decrements `node`'s own refcount on the way back up whenever the
    /// removal happened at or below it.
    fn rm_at(node: &mut Node, prefix: &[u8], peer: PeerKey) -> bool {
        let removed = if prefix.is_empty() {
            node.peers
                .iter()
                .position(|p| *p == peer)
                .map(|pos| {
                    node.peers.swap_remove(pos);
                })
                .is_some()
        } else {
            let byte = prefix[0];
            let Some(child) = node.children.get_mut(&byte) else {
                return false;
            };
            let removed = Self::rm_at(child, &prefix[1..], peer);
            if removed {
                child.refcount -= 1;
                if child.refcount == 0 {
                    node.children.remove(&byte);
                }
            }
            removed
        };
        removed
    }

    /// Remove every subscription belonging to `peer`, used on peer
    /// disconnect. Walks the whole tree once.
    pub fn remove_peer_everywhere(&mut self, peer: PeerKey) {
        let removed = Self::strip_peer(&mut self.root, peer);
        self.len -= removed;
    }

    fn strip_peer(node: &mut Node, peer: PeerKey) -> usize {
        let mut removed = 0;
        if let Some(pos) = node.peers.iter().position(|p| *p == peer) {
            node.peers.swap_remove(pos);
            removed += 1;
        }
        let mut dead = SmallVec::<[u8; 8]>::new();
        for (&byte, child) in &mut node.children {
            let child_removed = Self::strip_peer(child, peer);
            removed += child_removed;
            child.refcount = child.refcount.saturating_sub(child_removed);
            if child.refcount == 0 {
                dead.push(byte);
            }
        }
        for byte in dead {
            node.children.remove(&byte);
        }
        node.refcount = node.refcount.saturating_sub(removed.min(node.refcount));
        removed
    }

    /// Match `topic` against every registered prefix, returning the
    /// deduplicated set of peers whose subscription prefixes it.
    #[must_use]
    pub fn match_topic(&self, topic: &[u8]) -> SmallVec<[PeerKey; 16]> {
        let mut out = SmallVec::new();
        let mut node = &self.root;
        out.extend_from_slice(&node.peers);
        for &byte in topic {
            let Some(child) = node.children.get(&byte) else {
                break;
            };
            out.extend_from_slice(&child.peers);
            node = child;
        }
        if out.len() > 1 {
            out.sort_unstable();
            out.dedup();
        }
        out
    }

    /// Whether any subscription would match `topic` (cheaper than
    /// `match_topic` when only a boolean is needed, e.g. XPUB fan-out gating).
    #[must_use]
    pub fn has_match(&self, topic: &[u8]) -> bool {
        if !self.root.peers.is_empty() {
            return true;
        }
        let mut node = &self.root;
        for &byte in topic {
            let Some(child) = node.children.get(&byte) else {
                return false;
            };
            if !child.peers.is_empty() {
                return true;
            }
            node = child;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_match() {
        let mut trie = SubscriptionTrie::new();
        trie.add(b"A", 1);
        trie.add(b"AB", 2);
        trie.add(b"B", 3);

        let m = trie.match_topic(b"ABC");
        assert_eq!(m.as_slice(), &[1, 2]);

        let m = trie.match_topic(b"BANANA");
        assert_eq!(m.as_slice(), &[3]);
    }

    #[test]
    fn empty_prefix_matches_everything() {
        let mut trie = SubscriptionTrie::new();
        trie.add(b"", 9);
        assert!(trie.has_match(b"anything"));
        assert!(trie.has_match(b""));
    }

    #[test]
    fn rm_prunes_dead_branches() {
        let mut trie = SubscriptionTrie::new();
        trie.add(b"topic.", 1);
        assert!(trie.has_match(b"topic.foo"));
        trie.rm(b"topic.", 1);
        assert!(!trie.has_match(b"topic.foo"));
        assert!(trie.is_empty());
    }

    #[test]
    fn dedup_nested_prefixes() {
        let mut trie = SubscriptionTrie::new();
        trie.add(b"A", 7);
        trie.add(b"AB", 7);
        let m = trie.match_topic(b"ABCD");
        assert_eq!(m.as_slice(), &[7]);
    }

    #[test]
    fn remove_peer_everywhere_cleans_up() {
        let mut trie = SubscriptionTrie::new();
        trie.add(b"A", 1);
        trie.add(b"A", 2);
        trie.add(b"AB", 1);
        trie.remove_peer_everywhere(1);
        let m = trie.match_topic(b"ABCD");
        assert_eq!(m.as_slice(), &[2]);
    }

    #[test]
    fn double_subscribe_is_idempotent() {
        let mut trie = SubscriptionTrie::new();
        trie.add(b"x", 1);
        trie.add(b"x", 1);
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn subscription_event_roundtrips() {
        let ev = SubscriptionEvent::Subscribe(bytes::Bytes::from_static(b"topic"));
        let msg = ev.to_message();
        assert_eq!(msg[0], 0x01);
        assert_eq!(SubscriptionEvent::from_message(&msg), Some(ev));

        let ev = SubscriptionEvent::Unsubscribe(bytes::Bytes::from_static(b"topic"));
        let msg = ev.to_message();
        assert_eq!(msg[0], 0x00);
        assert_eq!(SubscriptionEvent::from_message(&msg), Some(ev));
    }
}
