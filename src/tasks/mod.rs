//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - Reaper: removes expired cache entries at a configured interval

mod reaper;

pub use reaper::Reaper;
pub(crate) use reaper::ReaperShared;
