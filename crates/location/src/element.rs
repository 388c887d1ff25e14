//! Shared, identity-bearing holders for geographic values.
//!
//! A binding layer refers to the address/coordinate/bounding box of a
//! location as *elements*: objects with identity whose contents can be
//! overwritten without the reference changing. Elements are shared through
//! `Arc`; a location records per slot whether it created the element
//! ([`Ownership::Owned`]) or adopted one from outside ([`Ownership::Borrowed`]).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use geoplaces_core::ValueObject;

use crate::geo::{Address, Coordinate, GeoRectangle};

/// A mutable cell holding one geographic value.
#[derive(Debug, Default)]
pub struct GeoElement<T> {
    value: Mutex<T>,
}

pub type AddressElement = GeoElement<Address>;
pub type CoordinateElement = GeoElement<Option<Coordinate>>;
pub type RectangleElement = GeoElement<Option<GeoRectangle>>;

impl<T: ValueObject> GeoElement<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value),
        }
    }

    /// Convenience for building a shareable element.
    pub fn shared(value: T) -> Arc<Self> {
        Arc::new(Self::new(value))
    }

    pub fn get(&self) -> T {
        self.lock().clone()
    }

    /// Overwrite the contents; identity is unchanged.
    pub fn set(&self, value: T) {
        *self.lock() = value;
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Who is responsible for an element held in a slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Ownership {
    /// Created by the holder; released when the holder replaces it.
    Owned,
    /// Adopted from outside; the holder never alters or releases it.
    Borrowed,
}

/// A reference slot tagged with ownership.
#[derive(Debug)]
pub(crate) enum Slot<T> {
    Empty,
    Owned(Arc<GeoElement<T>>),
    Borrowed(Arc<GeoElement<T>>),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Empty
    }
}

impl<T: ValueObject + Default> Slot<T> {
    pub(crate) fn element(&self) -> Option<&Arc<GeoElement<T>>> {
        match self {
            Slot::Empty => None,
            Slot::Owned(e) | Slot::Borrowed(e) => Some(e),
        }
    }

    pub(crate) fn ownership(&self) -> Option<Ownership> {
        match self {
            Slot::Empty => None,
            Slot::Owned(_) => Some(Ownership::Owned),
            Slot::Borrowed(_) => Some(Ownership::Borrowed),
        }
    }

    /// Current value, or the empty default when the slot is empty.
    pub(crate) fn value(&self) -> T {
        self.element().map(|e| e.get()).unwrap_or_default()
    }

    /// Reconcile with `value`: overwrite an owned element in place, or
    /// replace anything else with a freshly owned element.
    ///
    /// Returns `true` when the slot's identity changed.
    pub(crate) fn reconcile(&mut self, value: T) -> bool {
        match self {
            Slot::Owned(e) => {
                e.set(value);
                false
            }
            Slot::Empty | Slot::Borrowed(_) => {
                *self = Slot::Owned(GeoElement::shared(value));
                true
            }
        }
    }

    /// Adopt `element` as borrowed (or clear the slot with `None`).
    ///
    /// The previous element is released if it was owned; a borrowed one is
    /// simply let go. Returns `false` (and does nothing) when `element` is
    /// the element already held.
    pub(crate) fn adopt(&mut self, element: Option<Arc<GeoElement<T>>>) -> bool {
        let same = match (self.element(), element.as_ref()) {
            (Some(current), Some(new)) => Arc::ptr_eq(current, new),
            (None, None) => true,
            _ => false,
        };
        if same {
            return false;
        }
        *self = match element {
            Some(e) => Slot::Borrowed(e),
            None => Slot::Empty,
        };
        true
    }
}
