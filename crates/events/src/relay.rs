//! Re-broadcasting one signal through another.
//!
//! A relay connects a *source* signal (typically owned by a backend) to a
//! *target* signal owned by a façade, with one of two delivery disciplines:
//!
//! - [`Delivery::Direct`]: the target emits inside the source's `emit`, in
//!   the same call stack. Listeners observe the event in the same turn it was
//!   produced, in the producer's order.
//! - [`Delivery::Queued`]: the payload is cloned and posted to an
//!   [`EventLoop`](crate::EventLoop); the target emits when that loop next
//!   processes events. Listeners are never re-entered while the producer is
//!   still inside its own emission.
//!
//! The relay holds the target only weakly. Dropping the target's owner turns
//! pending queued deliveries into no-ops.

use std::sync::{Arc, Weak};

use crate::event_loop::LoopHandle;
use crate::signal::{Signal, SlotId};

/// How a relayed emission reaches the target.
#[derive(Debug, Clone)]
pub enum Delivery {
    Direct,
    Queued(LoopHandle),
}

/// Forward `source` to the signal selected from `owner` by `select`.
///
/// `owner` is usually a struct holding a family of signals, kept behind an
/// `Arc` by the façade that exposes them.
pub fn relay<S, T>(
    source: &Signal<T>,
    owner: &Arc<S>,
    select: fn(&S) -> &Signal<T>,
    delivery: Delivery,
) -> SlotId
where
    S: Send + Sync + 'static,
    T: Clone + Send + 'static,
{
    let target: Weak<S> = Arc::downgrade(owner);
    let name = source.name();

    match delivery {
        Delivery::Direct => source.connect(move |value: &T| {
            if let Some(owner) = target.upgrade() {
                select(&owner).emit(value);
            }
        }),
        Delivery::Queued(handle) => source.connect(move |value: &T| {
            let target = target.clone();
            let value = value.clone();
            tracing::debug!(signal = name, "queueing relayed event");
            handle.post(move || match target.upgrade() {
                Some(owner) => select(&owner).emit(&value),
                None => tracing::debug!(signal = name, "relay target gone; event dropped"),
            });
        }),
    }
}

/// Forward `source` straight to a standalone `target` signal.
pub fn forward<T>(source: &Signal<T>, target: &Arc<Signal<T>>, delivery: Delivery) -> SlotId
where
    T: Clone + Send + 'static,
{
    fn itself<U>(signal: &Signal<U>) -> &Signal<U> {
        signal
    }
    relay(source, target, itself::<T>, delivery)
}
