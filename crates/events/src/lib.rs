//! Notification plumbing: immediate signals, a queued delivery loop, and
//! relays that connect the two.

pub mod event_loop;
pub mod relay;
pub mod signal;

pub use event_loop::{EventLoop, LoopHandle};
pub use relay::{Delivery, forward, relay};
pub use signal::{Signal, SlotId};
