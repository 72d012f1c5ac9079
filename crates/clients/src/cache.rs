use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use wayfind_core::{normalize_text, Coordinate};

/// Geocoding results keyed by normalized query text, expiring after `ttl`.
#[derive(Debug, Clone)]
pub struct GeocodeCache {
    inner: Arc<Mutex<HashMap<String, (Instant, Coordinate)>>>,
    ttl: Duration,
    max_entries: usize,
}

impl GeocodeCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            max_entries,
        }
    }

    pub fn get(&self, query: &str) -> Option<Coordinate> {
        let key = cache_key(query);
        let mut guard = self.inner.lock();
        let entry = guard
            .get(&key)
            .map(|(stored_at, coordinate)| (stored_at.elapsed() <= self.ttl, *coordinate));
        match entry {
            Some((true, coordinate)) => Some(coordinate),
            Some((false, _)) => {
                guard.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, query: &str, coordinate: Coordinate) {
        let now = Instant::now();
        let mut guard = self.inner.lock();

        if guard.len() >= self.max_entries {
            guard.retain(|_, (stored_at, _)| now.duration_since(*stored_at) <= self.ttl);
        }
        if guard.len() >= self.max_entries {
            if let Some(oldest) = guard
                .iter()
                .min_by_key(|(_, (stored_at, _))| *stored_at)
                .map(|(key, _)| key.clone())
            {
                guard.remove(&oldest);
            }
        }

        guard.insert(cache_key(query), (now, coordinate));
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cache_key(query: &str) -> String {
    normalize_text(query).to_lowercase()
}
