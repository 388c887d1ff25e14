//! Reply handles for in-flight engine operations.
//!
//! Every asynchronous manager operation returns a [`ReplyHandle`]. The engine
//! that created it fills in the outcome (payload, optional error) and marks it
//! finished; callers poll the handle or connect to its signals, or listen to
//! the manager-wide `finished`/`error` signals, which fire at the same time.
//!
//! ## Releasing replies
//!
//! A reply is an `Arc`, released when the last holder drops it. Never let the
//! last reference go inside one of the reply's own callbacks; hand it to
//! [`LoopHandle::delete_later`](geoplaces_events::LoopHandle::delete_later)
//! instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use geoplaces_events::Signal;

use crate::place::Place;
use crate::request::{PlaceContent, SearchResult};

pub type ReplyHandle = Arc<Reply>;

static NEXT_REPLY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique reply identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplyId(u64);

impl core::fmt::Display for ReplyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "reply-{}", self.0)
    }
}

/// The operation a reply belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    PlaceDetails,
    Content,
    Search,
    Recommendations,
    TextPredictions,
    SavePlace,
    RemovePlace,
    SaveCategory,
    RemoveCategory,
    InitializeCategories,
}

/// Failure reported on a reply. Absence of an error means success.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyError {
    #[error("place does not exist")]
    PlaceDoesNotExist,
    #[error("category does not exist")]
    CategoryDoesNotExist,
    #[error("communication with the provider failed")]
    Communication,
    #[error("provider response could not be parsed")]
    Parse,
    #[error("permission denied")]
    Permissions,
    #[error("operation not supported")]
    Unsupported,
    #[error("bad argument")]
    BadArgument,
    #[error("operation canceled")]
    Cancel,
    #[error("unknown error")]
    Unknown,
}

/// Operation-specific result carried by a finished reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReplyPayload {
    #[default]
    Empty,
    Place(Place),
    Content {
        items: Vec<PlaceContent>,
        total: usize,
    },
    Results(Vec<SearchResult>),
    Predictions(Vec<String>),
    /// Id of the saved or removed place/category.
    Id(String),
}

#[derive(Debug, Default)]
struct ReplyState {
    finished_at: Option<DateTime<Utc>>,
    error: Option<(ReplyError, String)>,
    payload: ReplyPayload,
}

/// An in-flight (or completed) engine operation.
#[derive(Debug)]
pub struct Reply {
    id: ReplyId,
    kind: ReplyKind,
    started_at: DateTime<Utc>,
    state: Mutex<ReplyState>,
    finished: Signal<ReplyId>,
    error: Signal<(ReplyError, String)>,
}

impl Reply {
    pub fn new(kind: ReplyKind) -> ReplyHandle {
        Arc::new(Self {
            id: ReplyId(NEXT_REPLY_ID.fetch_add(1, Ordering::Relaxed)),
            kind,
            started_at: Utc::now(),
            state: Mutex::new(ReplyState::default()),
            finished: Signal::new("reply.finished"),
            error: Signal::new("reply.error"),
        })
    }

    pub fn id(&self) -> ReplyId {
        self.id
    }

    pub fn kind(&self) -> ReplyKind {
        self.kind
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.lock().finished_at
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished_at.is_some()
    }

    pub fn error(&self) -> Option<ReplyError> {
        self.lock().error.as_ref().map(|(e, _)| *e)
    }

    /// Developer-facing description of the error; empty on success.
    pub fn error_string(&self) -> String {
        self.lock()
            .error
            .as_ref()
            .map(|(_, msg)| msg.clone())
            .unwrap_or_default()
    }

    pub fn payload(&self) -> ReplyPayload {
        self.lock().payload.clone()
    }

    pub fn place(&self) -> Option<Place> {
        match &self.lock().payload {
            ReplyPayload::Place(p) => Some(p.clone()),
            _ => None,
        }
    }

    pub fn results(&self) -> Vec<SearchResult> {
        match &self.lock().payload {
            ReplyPayload::Results(r) => r.clone(),
            _ => Vec::new(),
        }
    }

    pub fn content(&self) -> Vec<PlaceContent> {
        match &self.lock().payload {
            ReplyPayload::Content { items, .. } => items.clone(),
            _ => Vec::new(),
        }
    }

    /// Total number of content items available, beyond the returned page.
    pub fn content_total(&self) -> usize {
        match &self.lock().payload {
            ReplyPayload::Content { total, .. } => *total,
            _ => 0,
        }
    }

    pub fn predictions(&self) -> Vec<String> {
        match &self.lock().payload {
            ReplyPayload::Predictions(p) => p.clone(),
            _ => Vec::new(),
        }
    }

    pub fn affected_id(&self) -> Option<String> {
        match &self.lock().payload {
            ReplyPayload::Id(id) => Some(id.clone()),
            _ => None,
        }
    }

    /// Emitted once when the reply finishes.
    pub fn finished_signal(&self) -> &Signal<ReplyId> {
        &self.finished
    }

    /// Emitted when an error is recorded, before `finished`.
    pub fn error_signal(&self) -> &Signal<(ReplyError, String)> {
        &self.error
    }

    /// Store the operation result. Ignored once finished.
    pub fn set_payload(&self, payload: ReplyPayload) {
        let mut state = self.lock();
        if state.finished_at.is_none() {
            state.payload = payload;
        }
    }

    /// Record an error and emit the reply's `error` signal. Ignored once
    /// finished. Returns whether the error was recorded.
    pub fn set_error(&self, error: ReplyError, message: impl Into<String>) -> bool {
        let message = message.into();
        {
            let mut state = self.lock();
            if state.finished_at.is_some() {
                return false;
            }
            state.error = Some((error, message.clone()));
        }
        self.error.emit(&(error, message));
        true
    }

    /// Mark the reply finished and emit its `finished` signal. Returns
    /// `false` if it had already finished.
    pub fn set_finished(&self) -> bool {
        {
            let mut state = self.lock();
            if state.finished_at.is_some() {
                return false;
            }
            state.finished_at = Some(Utc::now());
        }
        self.finished.emit(&self.id);
        true
    }

    /// Cancel an unfinished reply: records [`ReplyError::Cancel`] and
    /// finishes it. Only the reply's own signals fire; the caller that
    /// aborts already knows.
    pub fn abort(&self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.set_error(ReplyError::Cancel, "operation canceled");
        self.set_finished()
    }

    fn lock(&self) -> MutexGuard<'_, ReplyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn reply_ids_are_unique() {
        let a = Reply::new(ReplyKind::Search);
        let b = Reply::new(ReplyKind::Search);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn error_then_finished_in_order() {
        let reply = Reply::new(ReplyKind::PlaceDetails);
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = log.clone();
        reply.error_signal().connect(move |(e, _)| l.lock().unwrap().push(format!("error:{e}")));
        let l = log.clone();
        reply.finished_signal().connect(move |_| l.lock().unwrap().push("finished".to_string()));

        assert!(reply.set_error(ReplyError::PlaceDoesNotExist, "no such place: x"));
        assert!(reply.set_finished());

        assert_eq!(
            *log.lock().unwrap(),
            vec!["error:place does not exist".to_string(), "finished".to_string()]
        );
        assert_eq!(reply.error(), Some(ReplyError::PlaceDoesNotExist));
        assert_eq!(reply.error_string(), "no such place: x");
        assert!(reply.finished_at().is_some());
    }

    #[test]
    fn finished_reply_is_frozen() {
        let reply = Reply::new(ReplyKind::SavePlace);
        reply.set_payload(ReplyPayload::Id("p-1".into()));
        assert!(reply.set_finished());

        assert!(!reply.set_finished());
        assert!(!reply.set_error(ReplyError::Unknown, "late"));
        reply.set_payload(ReplyPayload::Id("p-2".into()));

        assert_eq!(reply.error(), None);
        assert_eq!(reply.affected_id().as_deref(), Some("p-1"));
    }

    #[test]
    fn abort_cancels_only_unfinished_replies() {
        let reply = Reply::new(ReplyKind::Search);
        assert!(reply.abort());
        assert_eq!(reply.error(), Some(ReplyError::Cancel));
        assert!(reply.is_finished());
        assert!(!reply.abort());
    }

    #[test]
    fn typed_accessors_fall_back_to_empty() {
        let reply = Reply::new(ReplyKind::Search);
        assert!(reply.results().is_empty());
        assert!(reply.place().is_none());
        assert_eq!(reply.content_total(), 0);
    }
}
