//! Geographic location values and their bindable representation.
//!
//! - [`geo`]: plain value types (address, coordinate, rectangle, location).
//! - [`element`]: identity-bearing holders the binding layer refers to.
//! - [`location`]: [`LocationValue`], which owns or borrows one element per
//!   field and raises field-level change events.

pub mod element;
pub mod geo;
pub mod location;

pub use element::{AddressElement, CoordinateElement, GeoElement, Ownership, RectangleElement};
pub use geo::{Address, Coordinate, GeoLocation, GeoRectangle};
pub use location::{LocationSignals, LocationValue};
