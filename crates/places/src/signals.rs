//! The notification set shared by engines and the manager.
//!
//! An engine owns one [`ManagerSignals`] and emits on it; the manager owns
//! another and re-emits what the engine produced (see `manager`).

use std::sync::Arc;

use geoplaces_core::{CategoryId, PlaceId};
use geoplaces_events::Signal;

use crate::auth::AuthChallenge;
use crate::place::Category;
use crate::reply::{ReplyError, ReplyHandle};

/// Payload of the `error` signal.
#[derive(Debug, Clone)]
pub struct ReplyErrorEvent {
    pub reply: ReplyHandle,
    pub error: ReplyError,
    pub message: String,
}

/// A category was added or updated under `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryChange {
    pub category: Category,
    pub parent_id: CategoryId,
}

/// A category was removed from under `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRemoval {
    pub category_id: CategoryId,
    pub parent_id: CategoryId,
}

#[derive(Debug)]
pub struct ManagerSignals {
    /// A reply finished (successfully or not).
    pub finished: Signal<ReplyHandle>,
    /// A reply failed; `finished` follows.
    pub error: Signal<ReplyErrorEvent>,
    /// The engine needs credentials; answer on the challenge.
    pub authentication_required: Signal<Arc<AuthChallenge>>,
    pub place_added: Signal<PlaceId>,
    pub place_updated: Signal<PlaceId>,
    pub place_removed: Signal<PlaceId>,
    pub category_added: Signal<CategoryChange>,
    pub category_updated: Signal<CategoryChange>,
    pub category_removed: Signal<CategoryRemoval>,
}

impl ManagerSignals {
    pub fn new() -> Self {
        Self {
            finished: Signal::new("finished"),
            error: Signal::new("error"),
            authentication_required: Signal::new("authentication_required"),
            place_added: Signal::new("place_added"),
            place_updated: Signal::new("place_updated"),
            place_removed: Signal::new("place_removed"),
            category_added: Signal::new("category_added"),
            category_updated: Signal::new("category_updated"),
            category_removed: Signal::new("category_removed"),
        }
    }

    /// Finish `reply` and announce it. No-op for an already finished reply.
    pub fn finish(&self, reply: &ReplyHandle) {
        if reply.set_finished() {
            self.finished.emit(reply);
        }
    }

    /// Record `error` on `reply`, announce it, then finish the reply.
    pub fn fail(&self, reply: &ReplyHandle, error: ReplyError, message: impl Into<String>) {
        let message = message.into();
        if reply.set_error(error, message.clone()) {
            self.error.emit(&ReplyErrorEvent {
                reply: reply.clone(),
                error,
                message,
            });
        }
        self.finish(reply);
    }
}

impl Default for ManagerSignals {
    fn default() -> Self {
        Self::new()
    }
}
