//! Cache Module
//!
//! Provides a concurrent in-memory cache with per-entry TTL expiration.

mod entry;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

use std::time::Duration;

use crate::error::{CacheError, Result};

// Re-export public types
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub(crate) use store::WeakStore;
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed key length in bytes at the HTTP boundary
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes at the HTTP boundary
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

/// Converts a signed millisecond TTL into a `Duration`.
///
/// Zero is valid and means "already expired". Negative values are rejected.
pub fn ttl_from_millis(ttl_ms: i64) -> Result<Duration> {
    u64::try_from(ttl_ms)
        .map(Duration::from_millis)
        .map_err(|_| {
            CacheError::InvalidArgument(format!("ttl must not be negative, got {}ms", ttl_ms))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_from_millis() {
        assert_eq!(ttl_from_millis(0).unwrap(), Duration::ZERO);
        assert_eq!(ttl_from_millis(1500).unwrap(), Duration::from_millis(1500));
        assert!(matches!(
            ttl_from_millis(-1),
            Err(CacheError::InvalidArgument(_))
        ));
    }
}
