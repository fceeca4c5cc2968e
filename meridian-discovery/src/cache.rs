//! TTL cache of discovered instances

use crate::service::ServiceInstance;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default time a discovery result stays valid
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct CacheEntry {
    instances: Vec<ServiceInstance>,
    updated_at: Instant,
}

/// Service name to instance list, each entry valid for `ttl` after it was
/// stored.
///
/// The lock is only held for map access and never across an await.
#[derive(Debug)]
pub struct ServiceCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ServiceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether an entry exists and is younger than the TTL
    pub fn is_valid(&self, service_name: &str) -> bool {
        self.entries
            .read()
            .get(service_name)
            .is_some_and(|entry| entry.updated_at.elapsed() < self.ttl)
    }

    /// Cached instances, valid or not; empty if absent
    pub fn get(&self, service_name: &str) -> Vec<ServiceInstance> {
        self.entries
            .read()
            .get(service_name)
            .map(|entry| entry.instances.clone())
            .unwrap_or_default()
    }

    /// Cached instances if the entry is still valid, checked under one lock
    pub fn get_valid(&self, service_name: &str) -> Option<Vec<ServiceInstance>> {
        self.entries
            .read()
            .get(service_name)
            .filter(|entry| entry.updated_at.elapsed() < self.ttl)
            .map(|entry| entry.instances.clone())
    }

    /// Replace the entry and stamp it with the current time
    pub fn put(&self, service_name: impl Into<String>, instances: Vec<ServiceInstance>) {
        self.entries.write().insert(
            service_name.into(),
            CacheEntry {
                instances,
                updated_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Drop one entry. Returns whether it was present.
    pub fn invalidate(&self, service_name: &str) -> bool {
        self.entries.write().remove(service_name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Record a probe result on a cached instance without refreshing the
    /// entry's timestamp. Returns `false` if the instance is not cached.
    pub fn mark_health(&self, service_name: &str, service_id: &str, healthy: bool) -> bool {
        let mut entries = self.entries.write();
        let Some(instance) = entries
            .get_mut(service_name)
            .and_then(|entry| entry.instances.iter_mut().find(|i| i.service_id == service_id))
        else {
            return false;
        };

        instance.healthy = healthy;
        instance.last_check_time = Some(Utc::now());
        true
    }
}

impl Default for ServiceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
