//! Request and result types for search and content retrieval.

use serde::{Deserialize, Serialize};

use geoplaces_location::GeoRectangle;

use crate::place::{Category, Place};

/// Parameters of a place search, recommendation, or text prediction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub search_term: String,
    /// Restrict results to places in any of these categories.
    pub categories: Vec<Category>,
    /// Restrict results to this area.
    pub search_area: Option<GeoRectangle>,
    pub offset: usize,
    /// Maximum number of results; `None` leaves it to the engine.
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn term(term: impl Into<String>) -> Self {
        Self {
            search_term: term.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.categories.push(category);
        self
    }

    pub fn within(mut self, area: GeoRectangle) -> Self {
        self.search_area = Some(area);
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    /// True when the request places no constraint at all.
    pub fn is_unconstrained(&self) -> bool {
        self.search_term.trim().is_empty() && self.categories.is_empty() && self.search_area.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub place: Place,
    /// Distance from the search area's center, when both are known.
    pub distance_m: Option<f64>,
}

/// Kind of rich content attached to a place.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Image,
    Review,
    Editorial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRequest {
    pub content_type: ContentType,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ContentRequest {
    pub fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            offset: 0,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceContent {
    pub content_type: ContentType,
    pub title: String,
    pub text: String,
    pub url: Option<String>,
}

impl PlaceContent {
    pub fn new(content_type: ContentType, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            content_type,
            title: title.into(),
            text: text.into(),
            url: None,
        }
    }
}
