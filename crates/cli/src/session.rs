//! A place manager plus the loop that delivers its notifications.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use thiserror::Error;

use geoplaces_core::{CategoryId, DomainError, PlaceId};
use geoplaces_events::EventLoop;
use geoplaces_infra::{EngineRegistry, PlacesConfig, ProviderError};
use geoplaces_location::{Address, Coordinate, GeoLocation};
use geoplaces_places::{
    Category, Place, PlaceManager, ReplyError, ReplyHandle, ReplyKind, SearchRequest, SearchResult,
};

/// Upper bound on loop turns per drain; notifications never schedule more.
const MAX_TURNS: usize = 16;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{operation:?} failed ({error}): {message}")]
    Reply {
        operation: ReplyKind,
        error: ReplyError,
        message: String,
    },
}

/// A store change observed through the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    PlaceAdded { place_id: PlaceId },
    PlaceUpdated { place_id: PlaceId },
    PlaceRemoved { place_id: PlaceId },
    CategoryAdded { category_id: CategoryId, parent_id: CategoryId },
    CategoryUpdated { category_id: CategoryId, parent_id: CategoryId },
    CategoryRemoved { category_id: CategoryId, parent_id: CategoryId },
}

/// One level of the category tree, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTree {
    pub category_id: CategoryId,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CategoryTree>,
}

pub struct Session {
    manager: PlaceManager,
    event_loop: EventLoop,
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl Session {
    /// Build the configured provider's manager and start recording its
    /// store-change notifications.
    pub fn open(config: &PlacesConfig, registry: &EngineRegistry) -> Result<Self, SessionError> {
        let event_loop = EventLoop::new();
        let manager = registry.place_manager(
            &config.provider,
            &config.provider_parameters(),
            &event_loop.handle(),
        )?;
        manager.set_locale(config.locale.clone());

        if let Some(credentials) = config.credentials.clone() {
            manager.signals().authentication_required.connect(move |challenge| {
                if challenge.is_retry() {
                    tracing::warn!(realm = challenge.realm(), "configured credentials were rejected");
                    return;
                }
                challenge.provide(credentials.clone());
            });
        }

        let notifications = Arc::new(Mutex::new(Vec::new()));
        record_notifications(&manager, &notifications);

        tracing::info!(provider = %config.provider, locale = %config.locale, "session opened");
        Ok(Self {
            manager,
            event_loop,
            notifications,
        })
    }

    pub fn manager(&self) -> &PlaceManager {
        &self.manager
    }

    /// Deliver pending notifications and hand back everything recorded so
    /// far.
    pub fn drain_notifications(&self) -> Vec<Notification> {
        self.event_loop.run_until_idle(MAX_TURNS);
        std::mem::take(&mut *self.notifications.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn initialize_categories(&self) -> Result<(), SessionError> {
        check(self.manager.initialize_categories()).map(|_| ())
    }

    /// Save the demo places. Returns their ids in insertion order.
    pub fn seed_demo_places(&self) -> Result<Vec<PlaceId>, SessionError> {
        demo_places()?
            .iter()
            .map(|place| -> Result<PlaceId, SessionError> {
                let reply = check(self.manager.save_place(place))?;
                Ok(PlaceId::from(reply.affected_id().unwrap_or_default()))
            })
            .collect()
    }

    pub fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, SessionError> {
        Ok(check(self.manager.search(request))?.results())
    }

    pub fn recommendations(&self, place: &Place) -> Result<Vec<SearchResult>, SessionError> {
        Ok(check(self.manager.recommendations(place, &SearchRequest::default()))?.results())
    }

    pub fn text_predictions(&self, prefix: &str) -> Result<Vec<String>, SessionError> {
        Ok(check(self.manager.text_predictions(&SearchRequest::term(prefix)))?.predictions())
    }

    pub fn place(&self, place_id: &PlaceId) -> Result<Option<Place>, SessionError> {
        Ok(check(self.manager.get_place_details(place_id))?.place())
    }

    /// The cached category tree below `parent_id`.
    pub fn category_tree(&self, parent_id: &CategoryId) -> Vec<CategoryTree> {
        self.manager
            .child_categories(parent_id)
            .into_iter()
            .map(|c| CategoryTree {
                children: self.category_tree(&c.category_id),
                category_id: c.category_id,
                name: c.name,
            })
            .collect()
    }
}

fn check(reply: ReplyHandle) -> Result<ReplyHandle, SessionError> {
    match reply.error() {
        None => Ok(reply),
        Some(error) => Err(SessionError::Reply {
            operation: reply.kind(),
            error,
            message: reply.error_string(),
        }),
    }
}

fn record_notifications(manager: &PlaceManager, sink: &Arc<Mutex<Vec<Notification>>>) {
    fn push(sink: &Mutex<Vec<Notification>>, n: Notification) {
        sink.lock().unwrap_or_else(PoisonError::into_inner).push(n);
    }

    let signals = manager.signals();

    let s = sink.clone();
    signals.place_added.connect(move |id| push(&s, Notification::PlaceAdded { place_id: id.clone() }));
    let s = sink.clone();
    signals.place_updated.connect(move |id| push(&s, Notification::PlaceUpdated { place_id: id.clone() }));
    let s = sink.clone();
    signals.place_removed.connect(move |id| push(&s, Notification::PlaceRemoved { place_id: id.clone() }));
    let s = sink.clone();
    signals.category_added.connect(move |c| {
        push(
            &s,
            Notification::CategoryAdded {
                category_id: c.category.category_id.clone(),
                parent_id: c.parent_id.clone(),
            },
        )
    });
    let s = sink.clone();
    signals.category_updated.connect(move |c| {
        push(
            &s,
            Notification::CategoryUpdated {
                category_id: c.category.category_id.clone(),
                parent_id: c.parent_id.clone(),
            },
        )
    });
    let s = sink.clone();
    signals.category_removed.connect(move |c| {
        push(
            &s,
            Notification::CategoryRemoved {
                category_id: c.category_id.clone(),
                parent_id: c.parent_id.clone(),
            },
        )
    });
}

/// A handful of Helsinki places used by `demo` and `search`.
pub fn demo_places() -> Result<Vec<Place>, DomainError> {
    let sauna = Category::new("Sauna").with_id("leisure.sauna");
    let cafe = Category::new("Café").with_id("eat-drink.cafe");
    let museum = Category::new("Museum").with_id("leisure.museum");

    let rows = [
        ("Löyly", "Hernesaarenranta 4", 60.1520, 24.9362, &sauna),
        ("Allas Sea Pool", "Katajanokanlaituri 2a", 60.1672, 24.9551, &sauna),
        ("Kotiharjun Sauna", "Harjutorinkatu 1", 60.1829, 24.9617, &sauna),
        ("Café Regatta", "Merikannontie 8", 60.1779, 24.9104, &cafe),
        ("Ateneum", "Kaivokatu 2", 60.1700, 24.9441, &museum),
    ];

    rows.into_iter()
        .map(|(name, street, lat, lon, category)| -> Result<Place, DomainError> {
            let location = GeoLocation {
                address: Address {
                    street: street.to_string(),
                    city: "Helsinki".to_string(),
                    country: "Finland".to_string(),
                    country_code: "FI".to_string(),
                    ..Address::default()
                },
                coordinate: Some(Coordinate::new(lat, lon)?),
                bounding_box: None,
            };
            Ok(Place::new(name).with_location(location).with_category(category.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use geoplaces_location::GeoRectangle;

    use super::*;

    fn open() -> Session {
        Session::open(&PlacesConfig::default(), &EngineRegistry::with_defaults()).unwrap()
    }

    #[test]
    fn seeded_places_are_reported_after_the_drain() {
        let session = open();
        let ids = session.seed_demo_places().unwrap();
        assert_eq!(ids.len(), 5);

        let events = session.drain_notifications();
        let added: Vec<_> = events
            .iter()
            .filter_map(|n| match n {
                Notification::PlaceAdded { place_id } => Some(place_id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(added, ids);
        assert!(session.drain_notifications().is_empty());
    }

    #[test]
    fn nearby_search_orders_by_distance() {
        let session = open();
        session.seed_demo_places().unwrap();

        let area = GeoRectangle::around(Coordinate::new(60.152, 24.936).unwrap(), 0.1, 0.1).unwrap();
        let results = session
            .search(&SearchRequest::default().with_category(Category::new("Sauna").with_id("leisure.sauna")).within(area))
            .unwrap();
        assert_eq!(results[0].place.name, "Löyly");
    }

    #[test]
    fn failed_reply_becomes_a_session_error() {
        let session = open();
        let err = session.search(&SearchRequest::default()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Reply {
                operation: ReplyKind::Search,
                error: ReplyError::BadArgument,
                ..
            }
        ));
    }

    #[test]
    fn category_tree_nests_children() {
        let session = open();
        session.initialize_categories().unwrap();
        let tree = session.category_tree(&CategoryId::top_level());
        let leisure = tree.iter().find(|t| t.category_id.as_str() == "leisure").unwrap();
        assert!(leisure.children.iter().any(|c| c.name == "Sauna"));

        let json = serde_json::to_value(&tree).unwrap();
        assert!(json[0].get("children").is_some());
    }

    #[test]
    fn unknown_provider_fails_to_open() {
        let config = PlacesConfig {
            provider: "nope".to_string(),
            ..PlacesConfig::default()
        };
        assert!(matches!(
            Session::open(&config, &EngineRegistry::with_defaults()),
            Err(SessionError::Provider(ProviderError::NotFound(_)))
        ));
    }
}
