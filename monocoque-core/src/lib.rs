//! Monocoque Core
//!
//! Transport-agnostic building blocks shared by every socket pattern:
//! - The message value and multipart framing (`message`)
//! - The reception arena backing zero-copy shared messages (`arena`)
//! - Pinned / io_uring-safe allocation underneath the arena (`alloc`)
//! - The SPSC pipe with HWM/LWM credit flow control (`pipe`)
//! - Segmented read buffer for arena-backed frame reassembly (`buffer`)
//! - Split-pump socket actor (`actor`)
//! - Object-id-addressed command bus and two-phase termination (`reactor`)
//! - ROUTER hub + peer map (`router`)
//! - PUB/SUB core: subscription radix tree + fan-out hub (`trie`, `pubsub`)
//! - Byte-based backpressure (`backpressure`)
//! - Socket configuration, buffer sizing, and the endpoint/routing-id/option
//!   surface (`options`, `config`, `endpoint`, `socket_type`)
//! - Reconnection backoff, timeouts, and cancellation-safe write guards
//!   (`reconnect`, `timeout`, `poison`)
//! - Transport glue for TCP/IPC/inproc (`tcp`, `ipc`, `inproc`)
//! - Connection lifecycle events (`monitor`)
//! - Error types (`error`)

#![deny(unsafe_code)]
// Allow some pedantic lints that are intentional in this crate
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::needless_pass_by_ref_mut)]
#![allow(clippy::match_same_arms)]

pub mod actor;
pub mod alloc;
pub mod arena;
pub mod backpressure;
pub mod buffer;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod inproc;
pub mod ipc;
pub mod message;
pub mod monitor;
pub mod options;
pub mod pipe;
pub mod poison;
pub mod reactor;
pub mod reconnect;
pub mod router;
pub mod socket_type;
pub mod tcp;
pub mod timeout;
pub mod trie;

pub mod pubsub {
    pub mod hub;
}

// Small prelude to make downstream crates ergonomic. Kept minimal to avoid
// API lock-in.
pub mod prelude {
    pub use crate::actor::{SocketActor, SocketEvent, UserCmd};
    pub use crate::alloc::{IoArena, SlabMut};
    pub use crate::arena::{Arena, ArenaSlice};
    pub use crate::backpressure::{BytePermits, NoOpPermits, Permit};
    pub use crate::buffer::SegmentedBuffer;
    pub use crate::config::BufferConfig;
    pub use crate::endpoint::Endpoint;
    pub use crate::error::{ErrorCategory, MonocoqueError, Result};
    pub use crate::message::{Message, MsgFlags, MultipartMessage};
    pub use crate::options::SocketOptions;
    pub use crate::pipe::{pipe_pair, PipeReader, PipeState, PipeWriter, WriteOutcome};
    pub use crate::pubsub::hub::{PubSubCmd, PubSubEvent, PubSubHub};
    pub use crate::reactor::{Command, CommandBus, MailboxReceiver, MailboxSender, ObjectId, Terminator};
    pub use crate::router::{HubEvent, RouterBehavior, RouterCmd, RouterHub};
    pub use crate::socket_type::SocketType;
    pub use crate::trie::{PeerKey, SubscriptionEvent, SubscriptionTrie};
}
