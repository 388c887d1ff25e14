//! Places and categories.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use geoplaces_core::{CategoryId, Entity, PlaceId};
use geoplaces_location::GeoLocation;

/// Who may see a place or category.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Unspecified,
    /// Stored on this device only.
    Device,
    /// Stored remotely, visible to the owning user.
    Private,
    Public,
}

/// A category in an engine's category tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub category_id: CategoryId,
    pub name: String,
    pub visibility: Visibility,
}

impl Category {
    /// An unsaved category.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<CategoryId>) -> Self {
        self.category_id = id.into();
        self
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &CategoryId {
        &self.category_id
    }

    fn is_persisted(&self) -> bool {
        !self.category_id.is_empty()
    }
}

/// A point of interest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Place {
    pub place_id: PlaceId,
    pub name: String,
    pub location: GeoLocation,
    pub categories: Vec<Category>,
    /// Average rating, when the provider has one.
    pub rating: Option<f64>,
    /// Provider-specific extended attributes (opening hours, phone, ...).
    pub attributes: BTreeMap<String, String>,
    pub visibility: Visibility,
    /// Last time the storing engine changed this place.
    pub modified_at: Option<DateTime<Utc>>,
}

impl Place {
    /// An unsaved place.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<PlaceId>) -> Self {
        self.place_id = id.into();
        self
    }

    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = location;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.categories.push(category);
        self
    }

    pub fn in_category(&self, id: &CategoryId) -> bool {
        self.categories.iter().any(|c| &c.category_id == id)
    }
}

impl Entity for Place {
    type Id = PlaceId;

    fn id(&self) -> &PlaceId {
        &self.place_id
    }

    fn is_persisted(&self) -> bool {
        !self.place_id.is_empty()
    }
}
