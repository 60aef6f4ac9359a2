//! Cache-aside data access on top of an expiring key-value store
//!
//! - [`CacheAside`] resolves a key from the store, falling back to a caller-supplied
//!   producer on a miss and writing the produced value back with a TTL
//! - [`Invalidator`] removes entries made stale by writes to the source of truth
//! - [`CacheAdmin`] lists and clears cached keys for operators
//!
//! The store being down never fails a read: the producer is used instead and
//! the result is tagged [`Provenance::Source`].
//!
//! # Example
//!
//! ```rust,ignore
//! use common_cache::{CacheAside, KeyNamespace, Provenance, DEFAULT_PRODUCER_TIMEOUT};
//!
//! const USERS: KeyNamespace = KeyNamespace::new("user", "users");
//!
//! let cache = CacheAside::new(redis_client, DEFAULT_PRODUCER_TIMEOUT);
//! let result = cache
//!     .resolve(&USERS.key(1), 300, || async { load_user(1).await })
//!     .await?;
//!
//! if result.provenance() == Provenance::Cache {
//!     println!("served from cache");
//! }
//! ```

pub mod admin;
pub mod invalidation;
pub mod metrics;
pub mod resolver;
pub mod types;

pub use admin::{CacheAdmin, CacheStats};
pub use invalidation::{ClearOutcome, InvalidationOutcome, Invalidator};
pub use resolver::{CacheAside, ResolveError, DEFAULT_PRODUCER_TIMEOUT};
pub use types::{CacheKey, CacheResult, CacheSource, KeyNamespace, Provenance};
