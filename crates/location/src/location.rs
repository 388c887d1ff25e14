//! Bindable location: three independently settable elements with
//! field-level change notification.

use std::sync::Arc;

use geoplaces_events::Signal;

use crate::element::{AddressElement, CoordinateElement, Ownership, RectangleElement, Slot};
use crate::geo::{Address, Coordinate, GeoLocation, GeoRectangle};

/// Change notifications raised by a [`LocationValue`].
///
/// Each fires once per effective change of *which element* a field refers
/// to. Overwriting the contents of an owned element raises nothing; only
/// [`LocationValue::to_value`] reflects it. There is no event for the
/// location as a whole.
#[derive(Debug)]
pub struct LocationSignals {
    pub address_changed: Signal<()>,
    pub coordinate_changed: Signal<()>,
    pub bounding_box_changed: Signal<()>,
}

impl Default for LocationSignals {
    fn default() -> Self {
        Self {
            address_changed: Signal::new("location.address_changed"),
            coordinate_changed: Signal::new("location.coordinate_changed"),
            bounding_box_changed: Signal::new("location.bounding_box_changed"),
        }
    }
}

/// A geographic location as seen by a declarative binding layer.
///
/// Not internally synchronized for compound updates: mutate it from one
/// context (setters take `&mut self`).
#[derive(Debug)]
pub struct LocationValue {
    address: Slot<Address>,
    coordinate: Slot<Option<Coordinate>>,
    bounding_box: Slot<Option<GeoRectangle>>,
    signals: LocationSignals,
}

impl LocationValue {
    /// A location whose three elements are owned and hold empty values.
    pub fn new() -> Self {
        Self::from_value(&GeoLocation::default())
    }

    pub fn from_value(src: &GeoLocation) -> Self {
        let mut location = Self {
            address: Slot::Empty,
            coordinate: Slot::Empty,
            bounding_box: Slot::Empty,
            signals: LocationSignals::default(),
        };
        location.set_from_value(src);
        location
    }

    pub fn signals(&self) -> &LocationSignals {
        &self.signals
    }

    /// Apply a plain value, reconciling each field independently.
    ///
    /// Owned elements are overwritten in place (no event). Empty or borrowed
    /// fields get a new owned element and raise their changed event.
    pub fn set_from_value(&mut self, src: &GeoLocation) {
        tracing::trace!(
            address = ?self.address.ownership(),
            coordinate = ?self.coordinate.ownership(),
            bounding_box = ?self.bounding_box.ownership(),
            "reconciling location"
        );
        if self.address.reconcile(src.address.clone()) {
            self.signals.address_changed.emit(&());
        }
        if self.coordinate.reconcile(src.coordinate) {
            self.signals.coordinate_changed.emit(&());
        }
        if self.bounding_box.reconcile(src.bounding_box) {
            self.signals.bounding_box_changed.emit(&());
        }
    }

    /// Recompose the current contents. Empty fields yield defaults.
    pub fn to_value(&self) -> GeoLocation {
        GeoLocation {
            address: self.address.value(),
            coordinate: self.coordinate.value(),
            bounding_box: self.bounding_box.value(),
        }
    }

    pub fn address(&self) -> Option<Arc<AddressElement>> {
        self.address.element().cloned()
    }

    pub fn coordinate(&self) -> Option<Arc<CoordinateElement>> {
        self.coordinate.element().cloned()
    }

    pub fn bounding_box(&self) -> Option<Arc<RectangleElement>> {
        self.bounding_box.element().cloned()
    }

    pub fn address_ownership(&self) -> Option<Ownership> {
        self.address.ownership()
    }

    pub fn coordinate_ownership(&self) -> Option<Ownership> {
        self.coordinate.ownership()
    }

    pub fn bounding_box_ownership(&self) -> Option<Ownership> {
        self.bounding_box.ownership()
    }

    pub fn set_address(&mut self, element: Option<Arc<AddressElement>>) {
        if self.address.adopt(element) {
            self.signals.address_changed.emit(&());
        }
    }

    pub fn set_coordinate(&mut self, element: Option<Arc<CoordinateElement>>) {
        if self.coordinate.adopt(element) {
            self.signals.coordinate_changed.emit(&());
        }
    }

    pub fn set_bounding_box(&mut self, element: Option<Arc<RectangleElement>>) {
        if self.bounding_box.adopt(element) {
            self.signals.bounding_box_changed.emit(&());
        }
    }
}

impl Default for LocationValue {
    fn default() -> Self {
        Self::new()
    }
}
