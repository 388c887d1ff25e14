//! Engine provider registry.
//!
//! Engines are looked up by provider name and built from string parameters,
//! so applications can pick a backend from configuration. The registry only
//! builds engines; each [`PlaceManager`] it hands out owns its engine.

use std::collections::BTreeMap;

use thiserror::Error;

use geoplaces_core::Locale;
use geoplaces_events::LoopHandle;
use geoplaces_places::{Credentials, PlaceManager, PlaceManagerEngine};

use crate::engine::InMemoryPlaceManagerEngine;

pub const MEMORY_PROVIDER: &str = "memory";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("no place provider named {0:?}")]
    NotFound(String),

    #[error("invalid provider parameter {key}: {reason}")]
    InvalidParameter { key: String, reason: String },
}

impl ProviderError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// String key/value parameters handed to an engine factory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderParameters {
    values: BTreeMap<String, String>,
}

impl ProviderParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Boolean parameter; absent means `default`.
    pub fn flag(&self, key: &str, default: bool) -> Result<bool, ProviderError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<bool>()
                .map_err(|_| ProviderError::invalid(key, format!("expected true or false, got {raw:?}"))),
        }
    }
}

pub type EngineFactory =
    Box<dyn Fn(&ProviderParameters) -> Result<Box<dyn PlaceManagerEngine>, ProviderError> + Send + Sync>;

/// Named engine factories.
#[derive(Default)]
pub struct EngineRegistry {
    factories: BTreeMap<String, EngineFactory>,
}

impl EngineRegistry {
    /// A registry with nothing registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `memory` provider.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MEMORY_PROVIDER, |params| {
            Ok(Box::new(build_memory_engine(params)?) as Box<dyn PlaceManagerEngine>)
        });
        registry
    }

    /// Register (or replace) the factory for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ProviderParameters) -> Result<Box<dyn PlaceManagerEngine>, ProviderError> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Box::new(factory)).is_some() {
            tracing::warn!(provider = %name, "replacing registered place provider");
        }
    }

    pub fn available_providers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Build the named provider's engine.
    pub fn engine(
        &self,
        name: &str,
        params: &ProviderParameters,
    ) -> Result<Box<dyn PlaceManagerEngine>, ProviderError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))?;
        factory(params)
    }

    /// Build the named provider's engine and wrap it in a manager whose
    /// store-change notifications are delivered through `event_loop`.
    pub fn place_manager(
        &self,
        name: &str,
        params: &ProviderParameters,
        event_loop: &LoopHandle,
    ) -> Result<PlaceManager, ProviderError> {
        let engine = self.engine(name, params)?;
        Ok(PlaceManager::new(engine, event_loop))
    }
}

impl core::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("providers", &self.available_providers())
            .finish()
    }
}

/// Parameters understood by the `memory` provider: `locale`, `user` and
/// `password` (both or neither), `seed_categories`.
fn build_memory_engine(params: &ProviderParameters) -> Result<InMemoryPlaceManagerEngine, ProviderError> {
    let mut engine = InMemoryPlaceManagerEngine::new();

    if let Some(raw) = params.get("locale") {
        let locale: Locale = raw
            .parse()
            .map_err(|e| ProviderError::invalid("locale", format!("{e}")))?;
        engine = engine.with_locale(locale);
    }

    match (params.get("user"), params.get("password")) {
        (Some(user), Some(password)) => {
            engine = engine.with_credentials(Credentials::new(user, password));
        }
        (None, None) => {}
        (Some(_), None) => return Err(ProviderError::invalid("password", "required when user is set")),
        (None, Some(_)) => return Err(ProviderError::invalid("user", "required when password is set")),
    }

    if params.flag("seed_categories", false)? {
        engine = engine.with_default_categories();
    }
    Ok(engine)
}
