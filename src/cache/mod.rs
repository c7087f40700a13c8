//! # Cache Module
//!
//! Cache-aside caching for eval runs, artifacts, configurations and datasets.
//!
//! ## Architecture
//!
//! - `CacheService` trait: backend operations (get/set/delete/exists)
//! - `CacheProvider`: enum dispatch over memory, Redis and NoOp backends
//! - `CacheAsideEngine`: get-or-populate with negative caching and invalidation
//! - `CacheKey`: positive `prefix:{id}` and negative `prefix:NotFound:{id}` keys
//!
//! ## Graceful Degradation
//!
//! The cache is never required for correctness. A backend that cannot be
//! constructed becomes NoOp, and runtime backend errors are logged and
//! treated as misses.

pub mod aside;
pub mod errors;
pub mod keys;
pub mod provider;
pub mod providers;
pub mod traits;

pub use aside::{CacheAsideEngine, CacheMetricsSnapshot};
pub use errors::{CacheError, CacheResult};
pub use keys::{CacheKey, CacheTtl};
pub use provider::CacheProvider;
pub use traits::CacheService;
