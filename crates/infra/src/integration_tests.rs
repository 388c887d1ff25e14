//! Integration tests for the full manager pipeline.
//!
//! Tests: Config → EngineRegistry → PlaceManager → EventLoop → listeners
//!
//! Verifies:
//! - Reply completion reaches listeners in the engine's call stack
//! - Store-change notifications arrive only on a later loop turn
//! - Credentials are cached across operations and re-asked after rejection
//! - A dropped manager leaves nothing connected to a shared engine
//! - Place locations bind into `LocationValue`s

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use geoplaces_core::{CategoryId, PlaceId};
    use geoplaces_events::EventLoop;
    use geoplaces_location::{
        Address, Coordinate, CoordinateElement, GeoLocation, LocationValue, Ownership,
    };
    use geoplaces_places::{
        Category, Credentials, ManagerFeatures, Place, PlaceManager, PlaceManagerEngine,
        ReplyError, SearchRequest,
    };

    use crate::config::PlacesConfig;
    use crate::engine::InMemoryPlaceManagerEngine;
    use crate::provider::{EngineRegistry, ProviderParameters};

    type Log = Arc<Mutex<Vec<String>>>;

    fn setup() -> (PlaceManager, EventLoop) {
        let event_loop = EventLoop::new();
        let manager = EngineRegistry::with_defaults()
            .place_manager("memory", &ProviderParameters::new(), &event_loop.handle())
            .unwrap();
        (manager, event_loop)
    }

    fn record_everything(manager: &PlaceManager) -> Log {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let signals = manager.signals();

        let l = log.clone();
        signals.finished.connect(move |reply| {
            l.lock().unwrap().push(format!("finished:{:?}", reply.error()))
        });
        let l = log.clone();
        signals.error.connect(move |ev| l.lock().unwrap().push(format!("error:{:?}", ev.error)));
        let l = log.clone();
        signals.place_added.connect(move |id| l.lock().unwrap().push(format!("place_added:{id}")));
        let l = log.clone();
        signals.place_updated.connect(move |id| l.lock().unwrap().push(format!("place_updated:{id}")));
        let l = log.clone();
        signals.place_removed.connect(move |id| l.lock().unwrap().push(format!("place_removed:{id}")));
        let l = log.clone();
        signals.category_added.connect(move |c| {
            l.lock().unwrap().push(format!("category_added:{}", c.category.category_id))
        });
        let l = log.clone();
        signals.category_removed.connect(move |c| {
            l.lock().unwrap().push(format!("category_removed:{}", c.category_id))
        });
        log
    }

    fn helsinki() -> GeoLocation {
        GeoLocation {
            address: Address {
                street: "Hernesaarenranta 4".to_string(),
                city: "Helsinki".to_string(),
                country_code: "FI".to_string(),
                ..Address::default()
            },
            coordinate: Some(Coordinate::new(60.152, 24.936).unwrap()),
            bounding_box: None,
        }
    }

    #[test]
    fn saved_place_finishes_now_and_is_announced_next_turn() {
        let (manager, event_loop) = setup();
        assert!(manager.supported_features().contains(ManagerFeatures::CREATE_PLACE));
        let log = record_everything(&manager);

        let reply = manager.save_place(&Place::new("Löyly"));
        let id = reply.affected_id().unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["finished:None".to_string()]);

        assert_eq!(event_loop.process_events(), 1);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["finished:None".to_string(), format!("place_added:{id}")]
        );
        assert_eq!(event_loop.process_events(), 0);
    }

    #[test]
    fn failed_reply_reports_error_then_finished_before_returning() {
        let (manager, event_loop) = setup();
        let log = record_everything(&manager);

        let reply = manager.search(&SearchRequest::default());

        assert_eq!(
            *log.lock().unwrap(),
            vec!["error:BadArgument".to_string(), "finished:Some(BadArgument)".to_string()]
        );
        assert_eq!(reply.error(), Some(ReplyError::BadArgument));
        assert_eq!(event_loop.pending(), 0);
    }

    #[test]
    fn store_changes_keep_engine_order_across_turns() {
        let (manager, event_loop) = setup();
        let log = record_everything(&manager);

        let id = PlaceId::from(manager.save_place(&Place::new("Löyly")).affected_id().unwrap());
        manager.save_place(&Place::new("Löyly Helsinki").with_id(id.clone()));
        manager.remove_place(&id);
        log.lock().unwrap().clear();

        event_loop.process_events();
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                format!("place_added:{id}"),
                format!("place_updated:{id}"),
                format!("place_removed:{id}"),
            ]
        );
    }

    #[test]
    fn category_tree_round_trip_through_the_manager() {
        let (manager, event_loop) = setup();
        let log = record_everything(&manager);
        let top = CategoryId::top_level();

        assert_eq!(manager.initialize_categories().error(), None);
        assert!(manager.children_category_ids(&top).contains(&CategoryId::from("leisure")));
        assert_eq!(
            manager.parent_category_id(&CategoryId::from("leisure.sauna")),
            CategoryId::from("leisure")
        );

        let reply = manager.save_category(&Category::new("Smoke sauna"), &CategoryId::from("leisure.sauna"));
        let smoke = CategoryId::from(reply.affected_id().unwrap());
        assert_eq!(manager.category(&smoke).unwrap().name, "Smoke sauna");

        manager.remove_category(&CategoryId::from("leisure"));
        assert!(manager.child_categories(&top).iter().all(|c| c.name != "Leisure"));

        log.lock().unwrap().clear();
        event_loop.process_events();
        let log = log.lock().unwrap();
        let pos = |entry: String| log.iter().position(|e| *e == entry).unwrap();
        assert!(pos(format!("category_added:{smoke}")) < pos(format!("category_removed:{smoke}")));
        assert!(pos(format!("category_removed:{smoke}")) < pos("category_removed:leisure.sauna".to_string()));
        assert_eq!(log.last().unwrap(), "category_removed:leisure");
    }

    #[test]
    fn dropping_the_manager_discards_undelivered_notifications() {
        let (manager, event_loop) = setup();
        let log = record_everything(&manager);

        manager.save_place(&Place::new("Löyly"));
        drop(manager);

        assert_eq!(event_loop.process_events(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["finished:None".to_string()]);
    }

    #[test]
    fn reply_can_be_released_from_a_finished_listener() {
        let (manager, event_loop) = setup();
        let handle = event_loop.handle();
        let released = Arc::new(Mutex::new(None));

        let r = released.clone();
        manager.signals().finished.connect(move |reply| {
            *r.lock().unwrap() = Some(Arc::downgrade(reply));
            handle.delete_later(reply.clone());
        });

        drop(manager.save_place(&Place::new("Löyly")));
        let weak = released.lock().unwrap().clone().unwrap();
        assert!(weak.upgrade().is_some());

        event_loop.process_events();
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn configured_credentials_are_asked_once_then_cached() {
        let config = PlacesConfig::from_lookup(|key| match key {
            "GEOPLACES_USER" => Some("ann".to_string()),
            "GEOPLACES_PASSWORD" => Some("sesame".to_string()),
            _ => None,
        })
        .unwrap();
        let event_loop = EventLoop::new();
        let manager = EngineRegistry::with_defaults()
            .place_manager(&config.provider, &config.provider_parameters(), &event_loop.handle())
            .unwrap();

        let prompts = Arc::new(Mutex::new(Vec::new()));
        let answers = Arc::new(Mutex::new(vec!["sesame", "guess"]));
        let (p, a) = (prompts.clone(), answers.clone());
        manager.signals().authentication_required.connect(move |challenge| {
            p.lock().unwrap().push(challenge.is_retry());
            let password = a.lock().unwrap().pop().unwrap_or("sesame");
            challenge.provide(Credentials::new("ann", password));
        });

        let denied = manager.save_place(&Place::new("one"));
        assert_eq!(denied.error(), Some(ReplyError::Permissions));

        for name in ["two", "three", "four"] {
            assert_eq!(manager.save_place(&Place::new(name)).error(), None);
        }
        assert_eq!(*prompts.lock().unwrap(), vec![false, true]);
    }

    #[test]
    fn fetched_place_location_binds_and_reconciles() {
        let (manager, _event_loop) = setup();
        let id = PlaceId::from(
            manager
                .save_place(&Place::new("Löyly").with_location(helsinki()))
                .affected_id()
                .unwrap(),
        );
        let place = manager.get_place_details(&id).place().unwrap();

        let mut location = LocationValue::from_value(&place.location);
        assert_eq!(location.to_value(), helsinki());
        assert_eq!(location.coordinate_ownership(), Some(Ownership::Owned));

        let coordinate_events = Arc::new(Mutex::new(0));
        let c = coordinate_events.clone();
        location.signals().coordinate_changed.connect(move |_| *c.lock().unwrap() += 1);

        // A map marker element shared with the binding layer.
        let marker = CoordinateElement::shared(Some(Coordinate::new(60.17, 24.95).unwrap()));
        location.set_coordinate(Some(marker.clone()));
        assert_eq!(location.coordinate_ownership(), Some(Ownership::Borrowed));

        // Re-applying the fetched value takes the slot back as owned and
        // leaves the marker alone.
        location.set_from_value(&place.location);
        assert_eq!(location.coordinate_ownership(), Some(Ownership::Owned));
        assert_eq!(marker.get(), Some(Coordinate::new(60.17, 24.95).unwrap()));
        assert_eq!(*coordinate_events.lock().unwrap(), 2);

        let nearby = manager.search(&SearchRequest::term("löyly").within(
            geoplaces_location::GeoRectangle::around(location.to_value().coordinate.unwrap(), 0.1, 0.1).unwrap(),
        ));
        assert_eq!(nearby.results()[0].distance_m.map(|d| d < 1.0), Some(true));
    }

    #[test]
    fn shared_engine_handle_sees_manager_writes() {
        let engine = Arc::new(InMemoryPlaceManagerEngine::new());
        let event_loop = EventLoop::new();
        let manager = PlaceManager::new(Box::new(engine.clone()), &event_loop.handle());

        manager.save_place(&Place::new("Löyly"));
        assert_eq!(engine.place_count(), 1);
    }

    #[test]
    fn dropped_manager_releases_shared_engine() {
        let engine = Arc::new(
            InMemoryPlaceManagerEngine::new().with_credentials(Credentials::new("ann", "sesame")),
        );
        let event_loop = EventLoop::new();

        let first = PlaceManager::new(Box::new(engine.clone()), &event_loop.handle());
        first.signals().authentication_required.connect(|challenge| {
            challenge.provide(Credentials::new("ann", "sesame"));
        });
        assert_eq!(first.save_place(&Place::new("one")).error(), None);
        drop(first);

        let source = engine.signals();
        assert_eq!(source.authentication_required.slot_count(), 0);
        assert_eq!(source.place_added.slot_count(), 0);
        assert_eq!(source.finished.slot_count(), 0);

        // Nobody answers for the second manager; the first one's cached
        // credentials must not either.
        let second = PlaceManager::new(Box::new(engine.clone()), &event_loop.handle());
        let log = record_everything(&second);
        let denied = second.save_place(&Place::new("two"));
        assert_eq!(denied.error(), Some(ReplyError::Permissions));
        assert_eq!(engine.place_count(), 1);

        assert_eq!(source.authentication_required.slot_count(), 1);
        event_loop.run_until_idle(4);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["error:Permissions".to_string(), "finished:Some(Permissions)".to_string()]
        );
    }
}
