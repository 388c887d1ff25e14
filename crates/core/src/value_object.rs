//! Value object trait: equality by value, not identity.
//!
//! Geographic values (addresses, coordinates, rectangles) are value objects:
//! two coordinates with the same latitude and longitude are the same
//! coordinate. Contrast with the *elements* that hold them in a location,
//! which are compared by identity.

/// Marker trait for value objects.
///
/// Requires cheap copying, comparison by attributes, and `Debug` for logs and
/// test failures.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// An optional value (e.g. "no coordinate") is itself a value.
impl<T: ValueObject> ValueObject for Option<T> {}
