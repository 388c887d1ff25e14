//! Immediate-dispatch callback lists.
//!
//! A [`Signal`] is the synchronous half of the notification model: `emit`
//! calls every connected slot, in connection order, before it returns. The
//! queued half lives in [`crate::event_loop`].
//!
//! ## Re-entrancy
//!
//! The slot list is snapshotted before any slot runs and the lock is released
//! during delivery, so a slot may connect or disconnect slots (including
//! itself) or emit other signals. Changes made during an emission take
//! effect from the next emission.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle returned by [`Signal::connect`], used to disconnect a slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SlotId(u64);

type Slot<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A named list of callbacks invoked synchronously on `emit`.
pub struct Signal<T> {
    name: &'static str,
    next_id: AtomicU64,
    slots: Mutex<Vec<(SlotId, Slot<T>)>>,
}

impl<T> Signal<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_id: AtomicU64::new(1),
            slots: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Connect a slot. Slots run in connection order.
    pub fn connect<F>(&self, slot: F) -> SlotId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SlotId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(slot)));
        id
    }

    /// Disconnect a slot. Returns `false` if it was not connected.
    pub fn disconnect(&self, id: SlotId) -> bool {
        let mut slots = self.lock();
        let before = slots.len();
        slots.retain(|(sid, _)| *sid != id);
        slots.len() != before
    }

    pub fn disconnect_all(&self) {
        self.lock().clear();
    }

    pub fn slot_count(&self) -> usize {
        self.lock().len()
    }

    /// Invoke every connected slot with `value`, in the caller's stack.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Slot<T>> = self.lock().iter().map(|(_, s)| s.clone()).collect();
        tracing::trace!(signal = self.name, slots = snapshot.len(), "emit");
        for slot in snapshot {
            slot(value);
        }
    }

    // Slots never run under the lock, so poisoning can only come from a
    // panic inside Vec bookkeeping; the list is still consistent then.
    fn lock(&self) -> MutexGuard<'_, Vec<(SlotId, Slot<T>)>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> core::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("slots", &self.slot_count())
            .finish()
    }
}
