//! The message value: a small tagged union over four payload representations.
//!
//! Mirrors the shape of a ZeroMQ `zmq_msg_t`: most messages are tiny control
//! frames or short command payloads and never need a heap allocation, a
//! minority carry an owned heap buffer, and messages decoded off the wire
//! without copying borrow a slice of a shared [`Arena`](crate::arena::Arena).
//! `Bytes` already gives inline small-vec storage internally, but that detail
//! is private to the `bytes` crate; the four representations below are kept
//! explicit so flag handling and arena refcounting stay exact and visible.

use bytes::Bytes;
use smallvec::SmallVec;

use crate::arena::ArenaSlice;

/// Inline payloads up to this many bytes are stored in the descriptor itself.
pub const INLINE_MAX: usize = 30;

/// Per-message flag bits, carried alongside the payload on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MsgFlags(u8);

impl MsgFlags {
    pub const NONE: Self = Self(0);
    pub const MORE: Self = Self(0b0000_0001);
    pub const COMMAND: Self = Self(0b0000_0010);
    pub const SUBSCRIBE: Self = Self(0b0000_0100);
    pub const CANCEL: Self = Self(0b0000_1000);
    pub const PING: Self = Self(0b0001_0000);
    pub const PONG: Self = Self(0b0010_0000);
    pub const CLOSE: Self = Self(0b0100_0000);
    pub const SHARED: Self = Self(0b1000_0000);

    #[must_use]
    pub const fn empty() -> Self {
        Self::NONE
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }
}

impl std::ops::BitOr for MsgFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::Sub for MsgFlags {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 & !rhs.0)
    }
}

/// The four payload representations a [`Message`] may hold.
#[derive(Debug, Clone)]
enum Repr {
    /// Small payload stored inline, no allocation.
    Inline(SmallVec<[u8; INLINE_MAX]>),
    /// Uniquely owned heap payload.
    Heap(Bytes),
    /// A slice of a shared reception arena; closing drops the underlying
    /// `Bytes` clone, which decrements the arena page's refcount.
    Shared(ArenaSlice),
    /// A slice into caller-provided static memory; never freed.
    Const(&'static [u8]),
}

/// A single message frame: payload plus flags.
///
/// `init*` constructors and `close` are total: every representation has a
/// well-defined, idempotent teardown. Closing an already-empty message is a
/// no-op.
#[derive(Debug, Clone)]
pub struct Message {
    repr: Repr,
    flags: MsgFlags,
}

impl Message {
    /// Create an empty inline message (zero bytes).
    #[must_use]
    pub fn init() -> Self {
        Self {
            repr: Repr::Inline(SmallVec::new()),
            flags: MsgFlags::empty(),
        }
    }

    /// Create a message of `n` zero-initialized bytes. Inline if `n <=
    /// INLINE_MAX`, otherwise a single heap allocation of exactly `n` bytes.
    #[must_use]
    pub fn init_size(n: usize) -> Self {
        if n <= INLINE_MAX {
            let mut buf = SmallVec::new();
            buf.resize(n, 0);
            Self {
                repr: Repr::Inline(buf),
                flags: MsgFlags::empty(),
            }
        } else {
            Self {
                repr: Repr::Heap(Bytes::from(vec![0u8; n])),
                flags: MsgFlags::empty(),
            }
        }
    }

    /// Build a message from owned bytes, choosing inline vs heap by size.
    #[must_use]
    pub fn from_bytes(data: Bytes) -> Self {
        if data.len() <= INLINE_MAX {
            Self {
                repr: Repr::Inline(SmallVec::from_slice(&data)),
                flags: MsgFlags::empty(),
            }
        } else {
            Self {
                repr: Repr::Heap(data),
                flags: MsgFlags::empty(),
            }
        }
    }

    /// Wrap a slice of a reception arena, without copying. The arena's
    /// backing page stays alive as long as this message (or any clone of it)
    /// does.
    #[must_use]
    pub fn init_shared(slice: ArenaSlice) -> Self {
        Self {
            repr: Repr::Shared(slice),
            flags: MsgFlags::SHARED,
        }
    }

    /// Borrow static memory; never incurs a refcount or a free.
    #[must_use]
    pub const fn init_const(data: &'static [u8]) -> Self {
        Self {
            repr: Repr::Const(data),
            flags: MsgFlags::empty(),
        }
    }

    /// Produce a second reference to the same logical payload.
    ///
    /// On the shared path this clones the arena slice's `Bytes`, which is a
    /// refcount increment, not a copy. On the heap path the payload is
    /// already a refcounted `Bytes`, so this is cheap too.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self {
            repr: self.repr.clone(),
            flags: self.flags,
        }
    }

    /// Transfer ownership out of `self`, leaving `self` as an empty inline
    /// message.
    pub fn take(&mut self) -> Self {
        let taken = Self {
            repr: self.repr.clone(),
            flags: self.flags,
        };
        *self = Self::init();
        taken
    }

    /// Release this message's reference. Idempotent.
    pub fn close(&mut self) {
        *self = Self::init();
    }

    /// Borrow the payload bytes regardless of representation.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        match &self.repr {
            Repr::Inline(b) => b.as_slice(),
            Repr::Heap(b) => b.as_ref(),
            Repr::Shared(s) => s.as_ref(),
            Repr::Const(s) => s,
        }
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    /// Produce an owned, refcounted `Bytes` view of the payload (cheap for
    /// Heap/Shared, copies for Inline/Const).
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        match &self.repr {
            Repr::Inline(b) => Bytes::copy_from_slice(b),
            Repr::Heap(b) => b.clone(),
            Repr::Shared(s) => s.to_bytes(),
            Repr::Const(s) => Bytes::from_static(s),
        }
    }

    #[must_use]
    pub const fn flags(&self) -> MsgFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: MsgFlags) {
        self.flags = flags;
    }

    pub fn add_flag(&mut self, flag: MsgFlags) {
        self.flags.insert(flag);
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.flags.contains(MsgFlags::MORE)
    }

    #[must_use]
    pub const fn is_command(&self) -> bool {
        self.flags.contains(MsgFlags::COMMAND)
    }

    #[must_use]
    pub const fn is_subscribe(&self) -> bool {
        self.flags.contains(MsgFlags::SUBSCRIBE)
    }

    #[must_use]
    pub const fn is_cancel(&self) -> bool {
        self.flags.contains(MsgFlags::CANCEL)
    }

    /// Whether this message is logically a shared-arena reference.
    #[must_use]
    pub const fn is_shared(&self) -> bool {
        matches!(self.repr, Repr::Shared(_))
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::init()
    }
}

impl From<&'static [u8]> for Message {
    fn from(data: &'static [u8]) -> Self {
        Self::init_const(data)
    }
}

impl From<Bytes> for Message {
    fn from(data: Bytes) -> Self {
        Self::from_bytes(data)
    }
}

/// A multi-part message: an ordered vec of frames with MORE set on every
/// part but the last. Pushing maintains that invariant automatically.
#[derive(Debug, Clone, Default)]
pub struct MultipartMessage {
    parts: Vec<Message>,
}

impl MultipartMessage {
    #[must_use]
    pub fn new() -> Self {
        Self { parts: Vec::new() }
    }

    pub fn push(&mut self, mut msg: Message) {
        msg.set_flags(msg.flags() - MsgFlags::MORE);
        if let Some(last) = self.parts.last_mut() {
            last.add_flag(MsgFlags::MORE);
        }
        self.parts.push(msg);
    }

    #[must_use]
    pub fn parts(&self) -> &[Message] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<Message> {
        self.parts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Build from already-framed `Bytes` parts (e.g. off the application API).
    #[must_use]
    pub fn from_frames(frames: Vec<Bytes>) -> Self {
        let mut mp = Self::new();
        for frame in frames {
            mp.push(Message::from_bytes(frame));
        }
        mp
    }

    #[must_use]
    pub fn to_frames(&self) -> Vec<Bytes> {
        self.parts.iter().map(Message::to_bytes).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_small_payload() {
        let msg = Message::from_bytes(Bytes::from_static(b"hi"));
        assert_eq!(msg.data(), b"hi");
        assert!(matches!(msg.repr, Repr::Inline(_)));
    }

    #[test]
    fn heap_large_payload() {
        let big = vec![7u8; INLINE_MAX + 1];
        let msg = Message::from_bytes(Bytes::from(big.clone()));
        assert_eq!(msg.data(), big.as_slice());
        assert!(matches!(msg.repr, Repr::Heap(_)));
    }

    #[test]
    fn const_payload_survives_close() {
        static DATA: &[u8] = b"static-data";
        let mut msg = Message::init_const(DATA);
        assert_eq!(msg.data(), DATA);
        msg.close();
        assert!(msg.is_empty());
    }

    #[test]
    fn close_is_idempotent() {
        let mut msg = Message::from_bytes(Bytes::from_static(b"x"));
        msg.close();
        msg.close();
        assert!(msg.is_empty());
    }

    #[test]
    fn take_leaves_source_empty() {
        let mut msg = Message::from_bytes(Bytes::from_static(b"abc"));
        let taken = msg.take();
        assert_eq!(taken.data(), b"abc");
        assert!(msg.is_empty());
    }

    #[test]
    fn multipart_sets_more_on_all_but_last() {
        let mp = MultipartMessage::from_frames(vec![
            Bytes::from_static(b"a"),
            Bytes::from_static(b"b"),
            Bytes::from_static(b"c"),
        ]);
        let parts = mp.parts();
        assert!(parts[0].has_more());
        assert!(parts[1].has_more());
        assert!(!parts[2].has_more());
    }

    #[test]
    fn flags_roundtrip() {
        let mut msg = Message::init();
        msg.set_flags(MsgFlags::SUBSCRIBE);
        assert!(msg.is_subscribe());
        assert!(!msg.is_cancel());
    }
}
