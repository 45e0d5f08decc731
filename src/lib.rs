//! TTL Cache - a concurrent in-process key-value cache
//!
//! Every entry carries its own monotonic expiry deadline. Reads never return
//! an expired value and remove it on the spot; an optional background
//! [`Reaper`] reclaims expired entries nobody reads again.
//!
//! ```ignore
//! let cache: CacheStore<String, u32> = CacheStore::new();
//! cache.put("a".to_string(), 1, Duration::from_millis(100))?;
//! assert_eq!(cache.get("a"), Some(1));
//!
//! let mut reaper = cache.start_reaper(Duration::from_secs(1))?;
//! reaper.stop().await?;
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheStats, CacheStore};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::Reaper;
