//! Cache tiers and existence filters
//!
//! - `local`: process-local TTL map (L1)
//! - `distributed`: shared key/value cache adapters (L2)
//! - `existence_filter`: bloom filters gating the whole read path

pub mod distributed;
pub mod existence_filter;
pub mod keys;
pub mod local;
pub mod traits;

pub use distributed::create_distributed_cache;
pub use existence_filter::BloomFilter;
pub use local::LocalCache;
pub use traits::{DistributedCache, ExistenceFilter};
