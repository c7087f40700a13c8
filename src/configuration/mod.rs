//! Metrics configuration write paths

pub mod upsert;

pub use upsert::{
    composite_cache_key, configuration_cache_keys, ConfigUpsertResolver, ConfigurationUpdate,
    UpsertOutcome,
};
