//! Command-line front end: a manager session over the configured provider.

pub mod session;

pub use session::{CategoryTree, Notification, Session, SessionError, demo_places};
