//! Fixed-size bloom filter
//!
//! `bloomfilter::Bloom` behind a `parking_lot::RwLock`; concurrent
//! `might_contain` calls share the read lock, `add` takes the write lock.
//! Size and hash count are fixed at construction.

use bloomfilter::Bloom;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::cache::ExistenceFilter;
use crate::errors::{LinkgateError, Result};

pub struct BloomFilter {
    inner: RwLock<Bloom<str>>,
    inserted: AtomicUsize,
}

impl BloomFilter {
    /// Sized for `expected_items` at `fp_rate`. Zero items is bumped to one.
    pub fn new(expected_items: usize, fp_rate: f64) -> Result<Self> {
        let bloom = Bloom::new_for_fp_rate(expected_items.max(1), fp_rate).map_err(|e| {
            LinkgateError::configuration(format!("Failed to create bloom filter: {e}"))
        })?;
        debug!(
            "Bloom filter sized for {} items at fp_rate {}",
            expected_items, fp_rate
        );
        Ok(Self {
            inner: RwLock::new(bloom),
            inserted: AtomicUsize::new(0),
        })
    }

    /// Number of `add` calls, duplicates included.
    pub fn inserted(&self) -> usize {
        self.inserted.load(Ordering::Relaxed)
    }
}

impl ExistenceFilter for BloomFilter {
    fn add(&self, item: &str) {
        self.inner.write().set(item);
        self.inserted.fetch_add(1, Ordering::Relaxed);
    }

    fn might_contain(&self, item: &str) -> bool {
        self.inner.read().check(item)
    }

    fn bulk_add(&self, items: &[String]) {
        let mut bloom = self.inner.write();
        for item in items {
            bloom.set(item.as_str());
        }
        self.inserted.fetch_add(items.len(), Ordering::Relaxed);
        debug!("Bulk inserted {} keys into bloom filter", items.len());
    }
}
