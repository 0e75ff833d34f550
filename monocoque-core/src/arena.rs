//! Reception arena: slab-backed, refcounted slices handed to [`Message`](crate::message::Message).
//!
//! Wraps [`alloc::IoArena`](crate::alloc::IoArena) with a safe-only surface:
//! callers never see the raw `SlabMut`/`Page` types, only an [`Arena`] to
//! allocate into and an [`ArenaSlice`] to read out of. The refcount the
//! specification asks for ("closing drops a reference; the page is freed
//! when the last reference is closed") is realized as `Bytes`'s own
//! `Arc`-backed refcounting over the slab page — `alloc.rs`'s `freeze()`
//! already produces that `Bytes` via `Bytes::from_owner`, so `ArenaSlice` is
//! a thin, cheaply-cloneable wrapper around it rather than a hand-rolled
//! counter.

use bytes::Bytes;

use crate::alloc::{IoArena, SlabMut};

/// A read-only slice of a reception arena page.
///
/// Clones share the same backing page; the page's memory is reclaimed once
/// every `ArenaSlice` (and every `Bytes` derived from one) has been dropped.
#[derive(Debug, Clone)]
pub struct ArenaSlice(Bytes);

impl ArenaSlice {
    #[must_use]
    pub const fn from_bytes(bytes: Bytes) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for ArenaSlice {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl From<Bytes> for ArenaSlice {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

/// Per-connection reception arena.
///
/// Not thread-safe by design: one arena belongs to exactly one engine/reader
/// task, matching `IoArena`'s own "one arena per socket actor" contract.
#[derive(Default)]
pub struct Arena {
    io: IoArena,
}

impl Arena {
    #[must_use]
    pub fn new() -> Self {
        Self { io: IoArena::new() }
    }

    /// Allocate `size` bytes in the arena, write into it via `fill`, then
    /// freeze it into a refcounted, zero-copy [`ArenaSlice`].
    ///
    /// `fill` receives a mutable view directly into the slab page (not a
    /// scratch copy) and must return how many bytes it actually initialized
    /// (`<= size`). The frozen `ArenaSlice` shares that page's `Arc`, so no
    /// allocation or copy happens beyond the single slab reservation.
    pub fn alloc_with(&mut self, size: usize, fill: impl FnOnce(&mut [u8]) -> usize) -> ArenaSlice {
        let mut slab = self.io.alloc_mut(size);
        let written = fill(slab.as_mut_slice()).min(size);
        slab.set_len(written);
        ArenaSlice::from_bytes(slab.freeze())
    }

    /// Reserve `size` bytes in the arena for an out-of-line fill, e.g. a
    /// socket read that takes ownership of the buffer and hands it back on
    /// completion (compio's I/O traits work this way, so they can't go
    /// through `alloc_with`'s synchronous closure). Freeze the returned
    /// `SlabMut` and wrap it with `ArenaSlice::from_bytes` once filled.
    pub fn alloc_mut(&mut self, size: usize) -> SlabMut {
        self.io.alloc_mut(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_with_writes_and_freezes() {
        let mut arena = Arena::new();
        let slice = arena.alloc_with(5, |buf| {
            buf.copy_from_slice(b"hello");
            5
        });
        assert_eq!(slice.as_ref(), b"hello");
    }

    #[test]
    fn clone_shares_backing_bytes() {
        let mut arena = Arena::new();
        let slice = arena.alloc_with(3, |buf| {
            buf.copy_from_slice(b"abc");
            3
        });
        let clone = slice.clone();
        assert_eq!(clone.as_ref(), slice.as_ref());
    }
}
