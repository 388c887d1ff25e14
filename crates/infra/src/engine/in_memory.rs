use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use geoplaces_core::{CategoryId, Locale, PlaceId};
use geoplaces_places::{
    AuthChallenge, Category, CategoryChange, CategoryRemoval, ContentRequest, Credentials,
    ManagerFeatures, ManagerSignals, Place, PlaceContent, PlaceManagerEngine, Reply, ReplyError,
    ReplyHandle, ReplyKind, ReplyPayload, SearchRequest, SearchResult,
};

use super::default_categories;

const MANAGER_NAME: &str = "memory";
const MANAGER_VERSION: u32 = 1;
const AUTH_REALM: &str = "geoplaces-memory";

#[derive(Debug, Clone)]
struct CategoryNode {
    category: Category,
    parent_id: CategoryId,
    children: Vec<CategoryId>,
}

#[derive(Debug, Default)]
struct Store {
    places: BTreeMap<PlaceId, Place>,
    categories: HashMap<CategoryId, CategoryNode>,
    top_level: Vec<CategoryId>,
    content: HashMap<PlaceId, Vec<PlaceContent>>,
    seeded: bool,
}

impl Store {
    fn children_mut(&mut self, parent_id: &CategoryId) -> Option<&mut Vec<CategoryId>> {
        if parent_id.is_empty() {
            Some(&mut self.top_level)
        } else {
            self.categories.get_mut(parent_id).map(|n| &mut n.children)
        }
    }

    fn children(&self, parent_id: &CategoryId) -> Vec<CategoryId> {
        if parent_id.is_empty() {
            self.top_level.clone()
        } else {
            self.categories
                .get(parent_id)
                .map(|n| n.children.clone())
                .unwrap_or_default()
        }
    }

    /// Whether `candidate` is `ancestor` or lies below it.
    fn is_within(&self, candidate: &CategoryId, ancestor: &CategoryId) -> bool {
        let mut current = candidate.clone();
        while !current.is_empty() {
            if &current == ancestor {
                return true;
            }
            current = match self.categories.get(&current) {
                Some(node) => node.parent_id.clone(),
                None => return false,
            };
        }
        false
    }

    /// Insert or move a category. Returns whether it was new.
    fn put_category(&mut self, category: Category, parent_id: CategoryId) -> bool {
        let id = category.category_id.clone();
        let previous_parent = self.categories.get(&id).map(|n| n.parent_id.clone());

        match &previous_parent {
            Some(old) if *old != parent_id => {
                if let Some(siblings) = self.children_mut(old) {
                    siblings.retain(|c| c != &id);
                }
            }
            _ => {}
        }
        if previous_parent.as_ref() != Some(&parent_id) {
            if let Some(siblings) = self.children_mut(&parent_id) {
                siblings.push(id.clone());
            }
        }

        let children = self
            .categories
            .remove(&id)
            .map(|n| n.children)
            .unwrap_or_default();
        self.categories.insert(
            id,
            CategoryNode {
                category,
                parent_id,
                children,
            },
        );
        previous_parent.is_none()
    }

    /// Remove a category subtree, returning removals children first.
    fn take_subtree(&mut self, id: &CategoryId) -> Vec<CategoryRemoval> {
        let Some(node) = self.categories.remove(id) else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        for child in &node.children {
            removed.extend(self.take_subtree(child));
        }
        if let Some(siblings) = self.children_mut(&node.parent_id) {
            siblings.retain(|c| c != id);
        }
        removed.push(CategoryRemoval {
            category_id: id.clone(),
            parent_id: node.parent_id,
        });
        removed
    }

    fn seed_defaults(&mut self) -> Vec<CategoryChange> {
        if self.seeded {
            return Vec::new();
        }
        self.seeded = true;

        let mut added = Vec::new();
        for (group, children) in default_categories() {
            let group_id = group.category_id.clone();
            for (category, parent_id) in std::iter::once((group, CategoryId::top_level()))
                .chain(children.into_iter().map(|c| (c, group_id.clone())))
            {
                if self.categories.contains_key(&category.category_id) {
                    continue;
                }
                self.put_category(category.clone(), parent_id.clone());
                added.push(CategoryChange {
                    category,
                    parent_id,
                });
            }
        }
        added
    }
}

/// Engine keeping places and categories in process memory.
///
/// Intended for tests/dev and as the default provider. Every operation
/// completes before it returns; store-change signals are emitted from inside
/// the mutating call.
#[derive(Debug)]
pub struct InMemoryPlaceManagerEngine {
    signals: ManagerSignals,
    locale: RwLock<Locale>,
    store: RwLock<Store>,
    credentials: Option<Credentials>,
    rejected_last: AtomicBool,
}

impl Default for InMemoryPlaceManagerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPlaceManagerEngine {
    pub fn new() -> Self {
        Self {
            signals: ManagerSignals::new(),
            locale: RwLock::new(Locale::default()),
            store: RwLock::new(Store::default()),
            credentials: None,
            rejected_last: AtomicBool::new(false),
        }
    }

    /// Require `credentials` for every mutating operation.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_locale(self, locale: Locale) -> Self {
        *self.write_locale() = locale;
        self
    }

    /// Seed the default category tree without emitting notifications.
    pub fn with_default_categories(self) -> Self {
        self.write().seed_defaults();
        self
    }

    /// Attach rich content to a stored place. Returns `false` for unknown
    /// places.
    pub fn add_content(&self, place_id: &PlaceId, content: PlaceContent) -> bool {
        let mut store = self.write();
        if !store.places.contains_key(place_id) {
            return false;
        }
        store.content.entry(place_id.clone()).or_default().push(content);
        true
    }

    pub fn place_count(&self) -> usize {
        self.read().places.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_locale(&self) -> RwLockWriteGuard<'_, Locale> {
        self.locale.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn succeed(&self, reply: ReplyHandle, payload: ReplyPayload) -> ReplyHandle {
        reply.set_payload(payload);
        self.signals.finish(&reply);
        reply
    }

    fn failed(&self, reply: ReplyHandle, error: ReplyError, message: String) -> ReplyHandle {
        tracing::debug!(reply = %reply.id(), ?error, %message, "reply failed");
        self.signals.fail(&reply, error, message);
        reply
    }

    /// Ask for credentials when configured. Fails `reply` on a missing or
    /// wrong answer and returns `false`.
    fn authorize(&self, reply: &ReplyHandle) -> bool {
        let Some(expected) = &self.credentials else {
            return true;
        };

        let challenge = if self.rejected_last.load(Ordering::SeqCst) {
            AuthChallenge::retry(AUTH_REALM)
        } else {
            AuthChallenge::new(AUTH_REALM)
        };
        self.signals.authentication_required.emit(&challenge);

        match challenge.credentials() {
            Some(given) if &given == expected => {
                self.rejected_last.store(false, Ordering::SeqCst);
                true
            }
            Some(given) => {
                self.rejected_last.store(true, Ordering::SeqCst);
                tracing::warn!(user = given.user(), "credentials rejected");
                self.signals
                    .fail(reply, ReplyError::Permissions, "credentials rejected");
                false
            }
            None => {
                self.signals
                    .fail(reply, ReplyError::Permissions, "authentication required");
                false
            }
        }
    }
}

fn page<T>(items: Vec<T>, offset: usize, limit: Option<usize>) -> Vec<T> {
    let iter = items.into_iter().skip(offset);
    match limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}

fn by_distance_then_name(a: &SearchResult, b: &SearchResult) -> CmpOrdering {
    match (a.distance_m, b.distance_m) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    }
    .then_with(|| a.place.name.cmp(&b.place.name))
}

impl PlaceManagerEngine for InMemoryPlaceManagerEngine {
    fn manager_name(&self) -> String {
        MANAGER_NAME.to_string()
    }

    fn manager_version(&self) -> u32 {
        MANAGER_VERSION
    }

    fn signals(&self) -> &ManagerSignals {
        &self.signals
    }

    fn supported_features(&self) -> ManagerFeatures {
        let mut features =
            ManagerFeatures::CREATE_PLACE | ManagerFeatures::UPDATE_PLACE | ManagerFeatures::NOTIFICATIONS;
        if self.credentials.is_some() {
            features |= ManagerFeatures::AUTHENTICATION;
        }
        features
    }

    fn locale(&self) -> Locale {
        self.locale
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_locale(&self, locale: Locale) {
        tracing::debug!(%locale, "locale changed");
        *self.write_locale() = locale;
    }

    fn get_place_details(&self, place_id: &PlaceId) -> ReplyHandle {
        let reply = Reply::new(ReplyKind::PlaceDetails);
        let found = self.read().places.get(place_id).cloned();
        match found {
            Some(place) => self.succeed(reply, ReplyPayload::Place(place)),
            None => self.failed(
                reply,
                ReplyError::PlaceDoesNotExist,
                format!("no place with id {place_id:?}"),
            ),
        }
    }

    fn get_content(&self, place: &Place, request: &ContentRequest) -> ReplyHandle {
        let reply = Reply::new(ReplyKind::Content);
        let matching: Option<Vec<PlaceContent>> = {
            let store = self.read();
            store.places.contains_key(&place.place_id).then(|| {
                store
                    .content
                    .get(&place.place_id)
                    .into_iter()
                    .flatten()
                    .filter(|c| c.content_type == request.content_type)
                    .cloned()
                    .collect()
            })
        };

        match matching {
            Some(items) => {
                let total = items.len();
                let items = page(items, request.offset, request.limit);
                self.succeed(reply, ReplyPayload::Content { items, total })
            }
            None => self.failed(
                reply,
                ReplyError::PlaceDoesNotExist,
                format!("no place with id {:?}", place.place_id),
            ),
        }
    }

    fn search(&self, request: &SearchRequest) -> ReplyHandle {
        let reply = Reply::new(ReplyKind::Search);
        if request.is_unconstrained() {
            return self.failed(
                reply,
                ReplyError::BadArgument,
                "search needs a term, a category, or an area".to_string(),
            );
        }

        let term = request.search_term.trim().to_lowercase();
        let center = request.search_area.map(|area| area.center());

        let mut results: Vec<SearchResult> = self
            .read()
            .places
            .values()
            .filter(|p| term.is_empty() || p.name.to_lowercase().contains(&term))
            .filter(|p| {
                request.categories.is_empty()
                    || request.categories.iter().any(|c| p.in_category(&c.category_id))
            })
            .filter(|p| match (&request.search_area, &p.location.coordinate) {
                (None, _) => true,
                (Some(area), Some(c)) => area.contains(c),
                (Some(_), None) => false,
            })
            .map(|p| SearchResult {
                place: p.clone(),
                distance_m: center
                    .zip(p.location.coordinate)
                    .map(|(from, to)| from.distance_to(&to)),
            })
            .collect();
        results.sort_by(by_distance_then_name);

        tracing::debug!(term = %request.search_term, matches = results.len(), "search");
        let results = page(results, request.offset, request.limit);
        self.succeed(reply, ReplyPayload::Results(results))
    }

    fn recommendations(&self, place: &Place, request: &SearchRequest) -> ReplyHandle {
        let reply = Reply::new(ReplyKind::Recommendations);
        let mut results = {
            let store = self.read();
            let Some(stored) = store.places.get(&place.place_id) else {
                drop(store);
                return self.failed(
                    reply,
                    ReplyError::PlaceDoesNotExist,
                    format!("no place with id {:?}", place.place_id),
                );
            };
            let origin = stored.location.coordinate;

            store
                .places
                .values()
                .filter(|p| p.place_id != stored.place_id)
                .filter(|p| stored.categories.iter().any(|c| p.in_category(&c.category_id)))
                .map(|p| SearchResult {
                    place: p.clone(),
                    distance_m: origin
                        .zip(p.location.coordinate)
                        .map(|(from, to)| from.distance_to(&to)),
                })
                .collect::<Vec<_>>()
        };
        results.sort_by(by_distance_then_name);

        let results = page(results, request.offset, request.limit);
        self.succeed(reply, ReplyPayload::Results(results))
    }

    fn text_predictions(&self, request: &SearchRequest) -> ReplyHandle {
        let reply = Reply::new(ReplyKind::TextPredictions);
        let prefix = request.search_term.trim().to_lowercase();
        if prefix.is_empty() {
            return self.failed(
                reply,
                ReplyError::BadArgument,
                "text prediction needs a search term".to_string(),
            );
        }

        let predictions: BTreeSet<String> = {
            let store = self.read();
            let place_names = store.places.values().map(|p| p.name.clone());
            let category_names = store.categories.values().map(|n| n.category.name.clone());
            place_names
                .chain(category_names)
                .filter(|name| name.to_lowercase().starts_with(&prefix))
                .collect()
        };

        let predictions = page(predictions.into_iter().collect::<Vec<_>>(), request.offset, request.limit);
        self.succeed(reply, ReplyPayload::Predictions(predictions))
    }

    fn save_place(&self, place: &Place) -> ReplyHandle {
        let reply = Reply::new(ReplyKind::SavePlace);
        if !self.authorize(&reply) {
            return reply;
        }

        let mut saved = place.clone();
        saved.modified_at = Some(Utc::now());
        let created = saved.place_id.is_empty();

        {
            let mut store = self.write();
            if created {
                saved.place_id = PlaceId::generate();
            } else if !store.places.contains_key(&saved.place_id) {
                drop(store);
                return self.failed(
                    reply,
                    ReplyError::PlaceDoesNotExist,
                    format!("cannot update unknown place {:?}", place.place_id),
                );
            }
            store.places.insert(saved.place_id.clone(), saved.clone());
        }

        let id = saved.place_id;
        tracing::info!(place_id = %id, created, "place saved");
        if created {
            self.signals.place_added.emit(&id);
        } else {
            self.signals.place_updated.emit(&id);
        }
        self.succeed(reply, ReplyPayload::Id(id.to_string()))
    }

    fn remove_place(&self, place_id: &PlaceId) -> ReplyHandle {
        let reply = Reply::new(ReplyKind::RemovePlace);
        if !self.authorize(&reply) {
            return reply;
        }

        let removed = {
            let mut store = self.write();
            store.content.remove(place_id);
            store.places.remove(place_id).is_some()
        };
        if !removed {
            return self.failed(
                reply,
                ReplyError::PlaceDoesNotExist,
                format!("cannot remove unknown place {place_id:?}"),
            );
        }

        tracing::info!(%place_id, "place removed");
        self.signals.place_removed.emit(place_id);
        self.succeed(reply, ReplyPayload::Id(place_id.to_string()))
    }

    fn save_category(&self, category: &Category, parent_id: &CategoryId) -> ReplyHandle {
        let reply = Reply::new(ReplyKind::SaveCategory);
        if !self.authorize(&reply) {
            return reply;
        }

        let mut saved = category.clone();
        if saved.category_id.is_empty() {
            saved.category_id = CategoryId::generate();
        }

        let outcome = {
            let mut store = self.write();
            if !parent_id.is_empty() && !store.categories.contains_key(parent_id) {
                Err((
                    ReplyError::CategoryDoesNotExist,
                    format!("unknown parent category {parent_id:?}"),
                ))
            } else if store.is_within(parent_id, &saved.category_id) {
                Err((
                    ReplyError::BadArgument,
                    format!("category {:?} cannot move below itself", saved.category_id),
                ))
            } else {
                Ok(store.put_category(saved.clone(), parent_id.clone()))
            }
        };

        let created = match outcome {
            Ok(created) => created,
            Err((error, message)) => return self.failed(reply, error, message),
        };

        tracing::info!(category_id = %saved.category_id, %parent_id, created, "category saved");
        let id = saved.category_id.to_string();
        let change = CategoryChange {
            category: saved,
            parent_id: parent_id.clone(),
        };
        if created {
            self.signals.category_added.emit(&change);
        } else {
            self.signals.category_updated.emit(&change);
        }
        self.succeed(reply, ReplyPayload::Id(id))
    }

    fn remove_category(&self, category_id: &CategoryId) -> ReplyHandle {
        let reply = Reply::new(ReplyKind::RemoveCategory);
        if !self.authorize(&reply) {
            return reply;
        }

        let removed = self.write().take_subtree(category_id);
        if removed.is_empty() {
            return self.failed(
                reply,
                ReplyError::CategoryDoesNotExist,
                format!("cannot remove unknown category {category_id:?}"),
            );
        }

        tracing::info!(%category_id, removed = removed.len(), "category removed");
        for removal in &removed {
            self.signals.category_removed.emit(removal);
        }
        self.succeed(reply, ReplyPayload::Id(category_id.to_string()))
    }

    fn initialize_categories(&self) -> ReplyHandle {
        let reply = Reply::new(ReplyKind::InitializeCategories);
        let added = self.write().seed_defaults();
        if !added.is_empty() {
            tracing::info!(count = added.len(), "default categories seeded");
        }
        for change in &added {
            self.signals.category_added.emit(change);
        }
        self.succeed(reply, ReplyPayload::Empty)
    }

    fn parent_category_id(&self, category_id: &CategoryId) -> CategoryId {
        self.read()
            .categories
            .get(category_id)
            .map(|n| n.parent_id.clone())
            .unwrap_or_default()
    }

    fn children_category_ids(&self, category_id: &CategoryId) -> Vec<CategoryId> {
        self.read().children(category_id)
    }

    fn category(&self, category_id: &CategoryId) -> Option<Category> {
        self.read()
            .categories
            .get(category_id)
            .map(|n| n.category.clone())
    }

    fn child_categories(&self, parent_id: &CategoryId) -> Vec<Category> {
        let store = self.read();
        store
            .children(parent_id)
            .iter()
            .filter_map(|id| store.categories.get(id))
            .map(|n| n.category.clone())
            .collect()
    }
}
