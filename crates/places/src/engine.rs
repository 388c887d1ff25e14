//! Backend boundary for place managers.
//!
//! A [`PlaceManagerEngine`] does the actual work behind a
//! [`PlaceManager`](crate::PlaceManager): talking to a provider, keeping a
//! category cache, storing places. The manager forwards every call here and
//! re-broadcasts the engine's signals.

use std::sync::Arc;

use geoplaces_core::{CategoryId, Locale, PlaceId};

use crate::feature::ManagerFeatures;
use crate::place::{Category, Place};
use crate::reply::ReplyHandle;
use crate::request::{ContentRequest, SearchRequest};
use crate::signals::ManagerSignals;

/// Pluggable place/category backend.
///
/// ## Reply contract
///
/// Operations returning a [`ReplyHandle`] must eventually finish that reply
/// and emit `finished` on [`signals()`](Self::signals) (via
/// [`ManagerSignals::finish`]). On failure, `error` is emitted first
/// ([`ManagerSignals::fail`] does both). Completion may happen inside the
/// call or later, from any thread.
///
/// ## Store notifications
///
/// Engines that advertise [`ManagerFeatures::NOTIFICATIONS`] emit
/// `place_*`/`category_*` signals for every change to their store, including
/// from inside the mutating call. The manager delivers those to its own
/// listeners only on a later loop turn.
///
/// ## Input validation
///
/// The manager passes arguments through untouched; rejecting bad input
/// (with [`ReplyError::BadArgument`](crate::ReplyError::BadArgument) and
/// friends) is the engine's job.
///
/// ## Thread safety
///
/// Methods take `&self`; implementations use interior mutability and must be
/// `Send + Sync`.
pub trait PlaceManagerEngine: Send + Sync {
    fn manager_name(&self) -> String;

    fn manager_version(&self) -> u32;

    fn signals(&self) -> &ManagerSignals;

    fn supported_features(&self) -> ManagerFeatures;

    fn locale(&self) -> Locale;

    fn set_locale(&self, locale: Locale);

    fn get_place_details(&self, place_id: &PlaceId) -> ReplyHandle;

    fn get_content(&self, place: &Place, request: &ContentRequest) -> ReplyHandle;

    fn search(&self, request: &SearchRequest) -> ReplyHandle;

    fn recommendations(&self, place: &Place, request: &SearchRequest) -> ReplyHandle;

    fn text_predictions(&self, request: &SearchRequest) -> ReplyHandle;

    fn save_place(&self, place: &Place) -> ReplyHandle;

    fn remove_place(&self, place_id: &PlaceId) -> ReplyHandle;

    fn save_category(&self, category: &Category, parent_id: &CategoryId) -> ReplyHandle;

    fn remove_category(&self, category_id: &CategoryId) -> ReplyHandle;

    fn initialize_categories(&self) -> ReplyHandle;

    /// Parent of a cached category; the empty id for top-level or unknown ones.
    fn parent_category_id(&self, category_id: &CategoryId) -> CategoryId;

    /// Children of a cached category; the empty id lists the top level.
    fn children_category_ids(&self, category_id: &CategoryId) -> Vec<CategoryId>;

    fn category(&self, category_id: &CategoryId) -> Option<Category>;

    /// Child categories of `parent_id`; the empty id lists the top level.
    fn child_categories(&self, parent_id: &CategoryId) -> Vec<Category>;
}

/// A shared engine, so the owner of a manager can keep a handle to its
/// backend (for seeding or inspection).
impl<E: PlaceManagerEngine + ?Sized> PlaceManagerEngine for Arc<E> {
    fn manager_name(&self) -> String {
        (**self).manager_name()
    }

    fn manager_version(&self) -> u32 {
        (**self).manager_version()
    }

    fn signals(&self) -> &ManagerSignals {
        (**self).signals()
    }

    fn supported_features(&self) -> ManagerFeatures {
        (**self).supported_features()
    }

    fn locale(&self) -> Locale {
        (**self).locale()
    }

    fn set_locale(&self, locale: Locale) {
        (**self).set_locale(locale)
    }

    fn get_place_details(&self, place_id: &PlaceId) -> ReplyHandle {
        (**self).get_place_details(place_id)
    }

    fn get_content(&self, place: &Place, request: &ContentRequest) -> ReplyHandle {
        (**self).get_content(place, request)
    }

    fn search(&self, request: &SearchRequest) -> ReplyHandle {
        (**self).search(request)
    }

    fn recommendations(&self, place: &Place, request: &SearchRequest) -> ReplyHandle {
        (**self).recommendations(place, request)
    }

    fn text_predictions(&self, request: &SearchRequest) -> ReplyHandle {
        (**self).text_predictions(request)
    }

    fn save_place(&self, place: &Place) -> ReplyHandle {
        (**self).save_place(place)
    }

    fn remove_place(&self, place_id: &PlaceId) -> ReplyHandle {
        (**self).remove_place(place_id)
    }

    fn save_category(&self, category: &Category, parent_id: &CategoryId) -> ReplyHandle {
        (**self).save_category(category, parent_id)
    }

    fn remove_category(&self, category_id: &CategoryId) -> ReplyHandle {
        (**self).remove_category(category_id)
    }

    fn initialize_categories(&self) -> ReplyHandle {
        (**self).initialize_categories()
    }

    fn parent_category_id(&self, category_id: &CategoryId) -> CategoryId {
        (**self).parent_category_id(category_id)
    }

    fn children_category_ids(&self, category_id: &CategoryId) -> Vec<CategoryId> {
        (**self).children_category_ids(category_id)
    }

    fn category(&self, category_id: &CategoryId) -> Option<Category> {
        (**self).category(category_id)
    }

    fn child_categories(&self, parent_id: &CategoryId) -> Vec<Category> {
        (**self).child_categories(parent_id)
    }
}
