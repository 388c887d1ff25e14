//! The place manager façade.
//!
//! [`PlaceManager`] is the stable entry point applications hold on to. It
//! owns exactly one engine for its whole life, forwards every operation to
//! it, and re-emits the engine's notifications on its own [`ManagerSignals`].
//!
//! ## Two delivery disciplines
//!
//! ```text
//! engine.finished / error / authentication_required ──Direct──▶ manager (same call stack)
//! engine.place_* / category_*                       ──Queued──▶ EventLoop ──▶ manager (later turn)
//! ```
//!
//! Reply lifecycle events are relayed directly so a caller waiting on a reply
//! observes its completion in the turn the engine produced it, in the
//! engine's order. Store-change events are fan-out notifications: they are
//! queued so listeners are never re-entered while the engine is still inside
//! the mutating call.
//!
//! Dropping the manager disconnects its relays from the engine's signals, so
//! an engine shared with other managers stops talking to this one.

use std::sync::Arc;

use geoplaces_core::{CategoryId, Locale, PlaceId};
use geoplaces_events::{Delivery, LoopHandle, SlotId, relay};

use crate::auth::{AuthChallenge, CredentialCache};
use crate::engine::PlaceManagerEngine;
use crate::feature::ManagerFeatures;
use crate::place::{Category, Place};
use crate::reply::ReplyHandle;
use crate::request::{ContentRequest, SearchRequest};
use crate::signals::ManagerSignals;

pub struct PlaceManager {
    engine: Box<dyn PlaceManagerEngine>,
    signals: Arc<ManagerSignals>,
    connections: Connections,
}

/// Slots this manager holds on the engine's signals.
struct Connections {
    finished: SlotId,
    error: SlotId,
    place_added: SlotId,
    place_updated: SlotId,
    place_removed: SlotId,
    category_added: SlotId,
    category_updated: SlotId,
    category_removed: SlotId,
    authentication_required: SlotId,
}

impl Connections {
    fn disconnect(&self, source: &ManagerSignals) {
        source.finished.disconnect(self.finished);
        source.error.disconnect(self.error);
        source.place_added.disconnect(self.place_added);
        source.place_updated.disconnect(self.place_updated);
        source.place_removed.disconnect(self.place_removed);
        source.category_added.disconnect(self.category_added);
        source.category_updated.disconnect(self.category_updated);
        source.category_removed.disconnect(self.category_removed);
        source.authentication_required.disconnect(self.authentication_required);
    }
}

impl PlaceManager {
    /// Take ownership of `engine` and start relaying its signals.
    ///
    /// Store-change notifications are delivered when `event_loop`'s owner
    /// processes events.
    pub fn new(engine: Box<dyn PlaceManagerEngine>, event_loop: &LoopHandle) -> Self {
        let signals = Arc::new(ManagerSignals::new());
        let source = engine.signals();

        let queued = Delivery::Queued(event_loop.clone());
        let connections = Connections {
            finished: relay(&source.finished, &signals, |s| &s.finished, Delivery::Direct),
            error: relay(&source.error, &signals, |s| &s.error, Delivery::Direct),
            place_added: relay(
                &source.place_added,
                &signals,
                |s| &s.place_added,
                queued.clone(),
            ),
            place_updated: relay(
                &source.place_updated,
                &signals,
                |s| &s.place_updated,
                queued.clone(),
            ),
            place_removed: relay(
                &source.place_removed,
                &signals,
                |s| &s.place_removed,
                queued.clone(),
            ),
            category_added: relay(
                &source.category_added,
                &signals,
                |s| &s.category_added,
                queued.clone(),
            ),
            category_updated: relay(
                &source.category_updated,
                &signals,
                |s| &s.category_updated,
                queued.clone(),
            ),
            category_removed: relay(
                &source.category_removed,
                &signals,
                |s| &s.category_removed,
                queued,
            ),
            authentication_required: relay_authentication(source, &signals),
        };

        tracing::info!(
            manager = %engine.manager_name(),
            version = engine.manager_version(),
            features = ?engine.supported_features().names(),
            "place manager ready"
        );

        Self {
            engine,
            signals,
            connections,
        }
    }

    /// Signals re-emitted from the engine.
    pub fn signals(&self) -> &ManagerSignals {
        &self.signals
    }

    pub fn manager_name(&self) -> String {
        self.engine.manager_name()
    }

    pub fn manager_version(&self) -> u32 {
        self.engine.manager_version()
    }

    pub fn supported_features(&self) -> ManagerFeatures {
        self.engine.supported_features()
    }

    /// Language hint for returned place details.
    pub fn locale(&self) -> Locale {
        self.engine.locale()
    }

    pub fn set_locale(&self, locale: Locale) {
        self.engine.set_locale(locale);
    }

    pub fn get_place_details(&self, place_id: &PlaceId) -> ReplyHandle {
        self.engine.get_place_details(place_id)
    }

    pub fn get_content(&self, place: &Place, request: &ContentRequest) -> ReplyHandle {
        self.engine.get_content(place, request)
    }

    pub fn search(&self, request: &SearchRequest) -> ReplyHandle {
        self.engine.search(request)
    }

    pub fn recommendations(&self, place: &Place, request: &SearchRequest) -> ReplyHandle {
        self.engine.recommendations(place, request)
    }

    pub fn text_predictions(&self, request: &SearchRequest) -> ReplyHandle {
        self.engine.text_predictions(request)
    }

    pub fn save_place(&self, place: &Place) -> ReplyHandle {
        tracing::debug!(place_id = %place.place_id, "save place");
        self.engine.save_place(place)
    }

    pub fn remove_place(&self, place_id: &PlaceId) -> ReplyHandle {
        tracing::debug!(%place_id, "remove place");
        self.engine.remove_place(place_id)
    }

    pub fn save_category(&self, category: &Category, parent_id: &CategoryId) -> ReplyHandle {
        tracing::debug!(category_id = %category.category_id, %parent_id, "save category");
        self.engine.save_category(category, parent_id)
    }

    pub fn remove_category(&self, category_id: &CategoryId) -> ReplyHandle {
        tracing::debug!(%category_id, "remove category");
        self.engine.remove_category(category_id)
    }

    pub fn initialize_categories(&self) -> ReplyHandle {
        self.engine.initialize_categories()
    }

    pub fn parent_category_id(&self, category_id: &CategoryId) -> CategoryId {
        self.engine.parent_category_id(category_id)
    }

    /// Children of `category_id`; pass the empty id for the top level.
    pub fn children_category_ids(&self, category_id: &CategoryId) -> Vec<CategoryId> {
        self.engine.children_category_ids(category_id)
    }

    pub fn category(&self, category_id: &CategoryId) -> Option<Category> {
        self.engine.category(category_id)
    }

    /// Child categories of `parent_id`; pass the empty id for the top level.
    pub fn child_categories(&self, parent_id: &CategoryId) -> Vec<Category> {
        self.engine.child_categories(parent_id)
    }
}

impl core::fmt::Debug for PlaceManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PlaceManager")
            .field("engine", &self.engine.manager_name())
            .field("version", &self.engine.manager_version())
            .finish()
    }
}

impl Drop for PlaceManager {
    fn drop(&mut self) {
        self.connections.disconnect(self.engine.signals());
        tracing::debug!(manager = %self.engine.manager_name(), "place manager dropped");
    }
}

/// Directly relay credential challenges, answering first attempts from the
/// cache of previously given credentials.
fn relay_authentication(source: &ManagerSignals, target: &Arc<ManagerSignals>) -> SlotId {
    let target = Arc::downgrade(target);
    let cache = CredentialCache::default();

    source
        .authentication_required
        .connect(move |challenge: &Arc<AuthChallenge>| {
            let Some(signals) = target.upgrade() else {
                return;
            };
            if challenge.is_retry() {
                tracing::warn!(realm = challenge.realm(), "credentials rejected; asking again");
                cache.clear();
            } else if let Some(credentials) = cache.get() {
                tracing::debug!(realm = challenge.realm(), "answering challenge from cache");
                challenge.provide(credentials);
                return;
            }

            signals.authentication_required.emit(challenge);
            if let Some(credentials) = challenge.credentials() {
                cache.store(credentials);
            }
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use geoplaces_events::EventLoop;

    use super::*;
    use crate::auth::Credentials;
    use crate::reply::{Reply, ReplyError, ReplyKind, ReplyPayload};

    type Log = Arc<Mutex<Vec<String>>>;

    /// Engine double that completes everything synchronously and records
    /// whether it is inside a mutation when listeners run.
    struct ScriptedEngine {
        signals: ManagerSignals,
        locale: Mutex<Locale>,
        mutating: Arc<AtomicBool>,
        fail_search: bool,
        password: Option<&'static str>,
        rejected_last: AtomicBool,
        log: Log,
    }

    impl ScriptedEngine {
        fn new(log: Log) -> Self {
            Self {
                signals: ManagerSignals::new(),
                locale: Mutex::new(Locale::c()),
                mutating: Arc::new(AtomicBool::new(false)),
                fail_search: false,
                password: None,
                rejected_last: AtomicBool::new(false),
                log,
            }
        }

        fn done(&self, kind: ReplyKind, payload: ReplyPayload) -> ReplyHandle {
            let reply = Reply::new(kind);
            reply.set_payload(payload);
            self.signals.finish(&reply);
            reply
        }

        fn authorize(&self) -> bool {
            let Some(expected) = self.password else {
                return true;
            };
            let challenge = if self.rejected_last.load(Ordering::SeqCst) {
                AuthChallenge::retry("scripted")
            } else {
                AuthChallenge::new("scripted")
            };
            self.signals.authentication_required.emit(&challenge);
            let ok = challenge
                .credentials()
                .is_some_and(|c| c.password() == expected);
            self.rejected_last.store(!ok, Ordering::SeqCst);
            ok
        }
    }

    impl PlaceManagerEngine for ScriptedEngine {
        fn manager_name(&self) -> String {
            "scripted".to_string()
        }

        fn manager_version(&self) -> u32 {
            3
        }

        fn signals(&self) -> &ManagerSignals {
            &self.signals
        }

        fn supported_features(&self) -> ManagerFeatures {
            ManagerFeatures::CREATE_PLACE
        }

        fn locale(&self) -> Locale {
            self.locale.lock().unwrap().clone()
        }

        fn set_locale(&self, locale: Locale) {
            *self.locale.lock().unwrap() = locale;
        }

        fn get_place_details(&self, place_id: &PlaceId) -> ReplyHandle {
            self.done(
                ReplyKind::PlaceDetails,
                ReplyPayload::Place(Place::new("Scripted").with_id(place_id.clone())),
            )
        }

        fn get_content(&self, _place: &Place, _request: &ContentRequest) -> ReplyHandle {
            self.done(ReplyKind::Content, ReplyPayload::Empty)
        }

        fn search(&self, _request: &SearchRequest) -> ReplyHandle {
            let reply = Reply::new(ReplyKind::Search);
            if self.fail_search {
                self.log.lock().unwrap().push("engine:fail".into());
                self.signals.fail(&reply, ReplyError::Communication, "provider unreachable");
                self.log.lock().unwrap().push("engine:returned".into());
            } else {
                self.signals.finish(&reply);
            }
            reply
        }

        fn recommendations(&self, _place: &Place, _request: &SearchRequest) -> ReplyHandle {
            self.done(ReplyKind::Recommendations, ReplyPayload::Results(Vec::new()))
        }

        fn text_predictions(&self, _request: &SearchRequest) -> ReplyHandle {
            self.done(
                ReplyKind::TextPredictions,
                ReplyPayload::Predictions(vec!["sauna".into()]),
            )
        }

        fn save_place(&self, _place: &Place) -> ReplyHandle {
            let reply = Reply::new(ReplyKind::SavePlace);
            if !self.authorize() {
                self.signals.fail(&reply, ReplyError::Permissions, "bad credentials");
                return reply;
            }
            self.mutating.store(true, Ordering::SeqCst);
            let id = PlaceId::from("new-place");
            self.signals.place_added.emit(&id);
            reply.set_payload(ReplyPayload::Id(id.to_string()));
            self.signals.finish(&reply);
            self.mutating.store(false, Ordering::SeqCst);
            reply
        }

        fn remove_place(&self, place_id: &PlaceId) -> ReplyHandle {
            self.signals.place_removed.emit(place_id);
            self.done(ReplyKind::RemovePlace, ReplyPayload::Id(place_id.to_string()))
        }

        fn save_category(&self, category: &Category, parent_id: &CategoryId) -> ReplyHandle {
            self.signals.category_added.emit(&crate::CategoryChange {
                category: category.clone(),
                parent_id: parent_id.clone(),
            });
            self.done(ReplyKind::SaveCategory, ReplyPayload::Empty)
        }

        fn remove_category(&self, category_id: &CategoryId) -> ReplyHandle {
            self.done(ReplyKind::RemoveCategory, ReplyPayload::Id(category_id.to_string()))
        }

        fn initialize_categories(&self) -> ReplyHandle {
            self.done(ReplyKind::InitializeCategories, ReplyPayload::Empty)
        }

        fn parent_category_id(&self, _category_id: &CategoryId) -> CategoryId {
            CategoryId::from("root-child")
        }

        fn children_category_ids(&self, category_id: &CategoryId) -> Vec<CategoryId> {
            if category_id.is_empty() {
                vec![CategoryId::from("a"), CategoryId::from("b")]
            } else {
                Vec::new()
            }
        }

        fn category(&self, category_id: &CategoryId) -> Option<Category> {
            (category_id.as_str() == "a").then(|| Category::new("A").with_id("a"))
        }

        fn child_categories(&self, parent_id: &CategoryId) -> Vec<Category> {
            self.children_category_ids(parent_id)
                .into_iter()
                .map(|id| Category::new(id.as_str()).with_id(id))
                .collect()
        }
    }

    fn setup(configure: impl FnOnce(&mut ScriptedEngine)) -> (PlaceManager, EventLoop, Log, Arc<AtomicBool>) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut engine = ScriptedEngine::new(log.clone());
        configure(&mut engine);
        let mutating = engine.mutating.clone();
        let event_loop = EventLoop::new();
        let manager = PlaceManager::new(Box::new(engine), &event_loop.handle());
        (manager, event_loop, log, mutating)
    }

    #[test]
    fn passthrough_accessors_reach_engine() {
        let (manager, _loop, _log, _) = setup(|_| {});

        assert_eq!(manager.manager_name(), "scripted");
        assert_eq!(manager.manager_version(), 3);
        assert_eq!(manager.supported_features(), ManagerFeatures::CREATE_PLACE);

        let fi: Locale = "fi_FI".parse().unwrap();
        manager.set_locale(fi.clone());
        assert_eq!(manager.locale(), fi);
    }

    #[test]
    fn synchronous_category_reads_are_delegated() {
        let (manager, _loop, _log, _) = setup(|_| {});
        let top = CategoryId::top_level();

        assert_eq!(manager.children_category_ids(&top).len(), 2);
        assert_eq!(manager.child_categories(&top)[1].category_id, CategoryId::from("b"));
        assert_eq!(manager.category(&CategoryId::from("a")).unwrap().name, "A");
        assert!(manager.category(&CategoryId::from("zzz")).is_none());
        assert_eq!(manager.parent_category_id(&CategoryId::from("a")), CategoryId::from("root-child"));
    }

    #[test]
    fn failed_search_relays_error_then_finished_in_engine_stack() {
        let (manager, event_loop, log, _) = setup(|e| e.fail_search = true);

        let l = log.clone();
        manager.signals().error.connect(move |ev| {
            l.lock().unwrap().push(format!("listener:error:{:?}:{}", ev.error, ev.message))
        });
        let l = log.clone();
        manager.signals().finished.connect(move |reply| {
            l.lock().unwrap().push(format!("listener:finished:{:?}", reply.error()))
        });

        let reply = manager.search(&SearchRequest::term("sauna"));

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "engine:fail".to_string(),
                "listener:error:Communication:provider unreachable".to_string(),
                "listener:finished:Some(Communication)".to_string(),
                "engine:returned".to_string(),
            ]
        );
        assert!(reply.is_finished());
        assert_eq!(reply.error_string(), "provider unreachable");
        assert_eq!(event_loop.pending(), 0);
    }

    #[test]
    fn store_change_is_delivered_after_the_mutating_call() {
        let (manager, event_loop, _log, mutating) = setup(|_| {});
        let finished = Arc::new(AtomicUsize::new(0));
        let added: Arc<Mutex<Vec<PlaceId>>> = Arc::new(Mutex::new(Vec::new()));
        let reentered = Arc::new(AtomicBool::new(false));

        let f = finished.clone();
        manager.signals().finished.connect(move |reply| {
            assert_eq!(reply.error(), None);
            f.fetch_add(1, Ordering::SeqCst);
        });
        let (a, m, r) = (added.clone(), mutating.clone(), reentered.clone());
        manager.signals().place_added.connect(move |id| {
            if m.load(Ordering::SeqCst) {
                r.store(true, Ordering::SeqCst);
            }
            a.lock().unwrap().push(id.clone());
        });

        let reply = manager.save_place(&Place::new("Löyly"));

        // Finished arrived in-call; the add waits for the loop.
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(added.lock().unwrap().is_empty());
        assert_eq!(reply.affected_id().as_deref(), Some("new-place"));

        assert_eq!(event_loop.process_events(), 1);
        assert_eq!(*added.lock().unwrap(), vec![PlaceId::from("new-place")]);
        assert!(!reentered.load(Ordering::SeqCst));
    }

    #[test]
    fn every_store_signal_is_queued() {
        let (manager, event_loop, _log, _) = setup(|_| {});
        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        manager.signals().place_removed.connect(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });
        let s = seen.clone();
        manager.signals().category_added.connect(move |change| {
            assert_eq!(change.parent_id, CategoryId::top_level());
            s.fetch_add(1, Ordering::SeqCst);
        });

        manager.remove_place(&PlaceId::from("p"));
        manager.save_category(&Category::new("Bars"), &CategoryId::top_level());
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        event_loop.process_events();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn queued_events_vanish_with_the_manager() {
        let (manager, event_loop, _log, _) = setup(|_| {});
        manager.remove_place(&PlaceId::from("p"));
        drop(manager);

        assert_eq!(event_loop.process_events(), 1);
    }

    #[test]
    fn reply_released_later_from_its_own_callback() {
        let (manager, event_loop, _log, _) = setup(|_| {});
        let handle = event_loop.handle();
        let reply = manager.get_place_details(&PlaceId::from("p-9"));
        let weak = Arc::downgrade(&reply);

        // Already finished; the caller hands its handle to the loop.
        assert_eq!(reply.place().unwrap().place_id, PlaceId::from("p-9"));
        handle.delete_later(reply);
        assert!(weak.upgrade().is_some());

        event_loop.process_events();
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn accepted_credentials_are_reused_until_rejected() {
        let (manager, _loop, _log, _) = setup(|e| e.password = Some("sesame"));
        let asked = Arc::new(AtomicUsize::new(0));
        let answer = Arc::new(Mutex::new("sesame"));

        let (n, a) = (asked.clone(), answer.clone());
        manager.signals().authentication_required.connect(move |challenge| {
            n.fetch_add(1, Ordering::SeqCst);
            challenge.provide(Credentials::new("ann", *a.lock().unwrap()));
        });

        assert_eq!(manager.save_place(&Place::new("one")).error(), None);
        assert_eq!(manager.save_place(&Place::new("two")).error(), None);
        assert_eq!(asked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rejected_credentials_trigger_a_fresh_prompt() {
        let (manager, _loop, _log, _) = setup(|e| e.password = Some("sesame"));
        let prompts: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
        let answers = Arc::new(Mutex::new(vec!["sesame", "wrong"]));

        let (p, a) = (prompts.clone(), answers.clone());
        manager.signals().authentication_required.connect(move |challenge| {
            p.lock().unwrap().push(challenge.is_retry());
            let pw = a.lock().unwrap().pop().unwrap_or("sesame");
            challenge.provide(Credentials::new("ann", pw));
        });

        let first = manager.save_place(&Place::new("one"));
        assert_eq!(first.error(), Some(ReplyError::Permissions));

        let second = manager.save_place(&Place::new("two"));
        assert_eq!(second.error(), None);

        // First attempt asked the user; the retry asked again instead of
        // replaying the rejected password.
        assert_eq!(*prompts.lock().unwrap(), vec![false, true]);
    }
}
