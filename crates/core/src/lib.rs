//! `geoplaces-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the location and
//! places crates (no engines, no signal plumbing).

pub mod entity;
pub mod error;
pub mod id;
pub mod locale;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CategoryId, PlaceId};
pub use locale::Locale;
pub use value_object::ValueObject;
