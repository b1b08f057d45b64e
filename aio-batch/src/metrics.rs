//! Process-wide counters, readable via [`global`].

use std::sync::atomic::{AtomicU64, Ordering};

#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct Metrics {
    pub contexts_created: u64,
    pub contexts_destroyed: u64,
    pub requests_submitted: u64,
    pub requests_completed: u64,
}

pub(crate) struct MetricsStorage {
    pub(crate) contexts_created: AtomicU64,
    pub(crate) contexts_destroyed: AtomicU64,
    pub(crate) requests_submitted: AtomicU64,
    pub(crate) requests_completed: AtomicU64,
}

impl MetricsStorage {
    pub(crate) const fn new_const() -> Self {
        MetricsStorage {
            contexts_created: AtomicU64::new(0),
            contexts_destroyed: AtomicU64::new(0),
            requests_submitted: AtomicU64::new(0),
            requests_completed: AtomicU64::new(0),
        }
    }
}

impl MetricsStorage {
    pub(crate) fn make_pub(&self) -> Metrics {
        Metrics {
            contexts_created: self.contexts_created.load(Ordering::Relaxed),
            contexts_destroyed: self.contexts_destroyed.load(Ordering::Relaxed),
            requests_submitted: self.requests_submitted.load(Ordering::Relaxed),
            requests_completed: self.requests_completed.load(Ordering::Relaxed),
        }
    }
}

pub(crate) static GLOBAL_STORAGE: MetricsStorage = MetricsStorage::new_const();

pub fn global() -> Metrics {
    GLOBAL_STORAGE.make_pub()
}
