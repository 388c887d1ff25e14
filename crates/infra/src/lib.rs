//! Infrastructure layer: engines, provider registry, config.

pub mod config;
pub mod engine;
pub mod provider;

mod integration_tests;

pub use config::{ConfigError, PlacesConfig};
pub use engine::InMemoryPlaceManagerEngine;
pub use provider::{EngineFactory, EngineRegistry, ProviderError, ProviderParameters};
