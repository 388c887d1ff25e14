//! `geoplaces-places`: places, categories, and the manager façade.
//!
//! Applications talk to a [`PlaceManager`]; the manager owns one
//! [`PlaceManagerEngine`] that does the work and relays its notifications.
//! Asynchronous operations return a [`ReplyHandle`].

pub mod auth;
pub mod engine;
pub mod feature;
pub mod manager;
pub mod place;
pub mod reply;
pub mod request;
pub mod signals;

pub use auth::{AuthChallenge, Credentials};
pub use engine::PlaceManagerEngine;
pub use feature::ManagerFeatures;
pub use manager::PlaceManager;
pub use place::{Category, Place, Visibility};
pub use reply::{Reply, ReplyError, ReplyHandle, ReplyId, ReplyKind, ReplyPayload};
pub use request::{ContentRequest, ContentType, PlaceContent, SearchRequest, SearchResult};
pub use signals::{CategoryChange, CategoryRemoval, ManagerSignals, ReplyErrorEvent};
