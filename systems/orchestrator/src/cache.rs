use std::{collections::HashMap, sync::Arc, time::Duration};

use pulse_runner_core::{SongMap, TrackId};

/// Map stored for a track together with the instant it was stored.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    map: Arc<SongMap>,
    generated_at: Duration,
}

impl CacheEntry {
    /// Stored map.
    #[must_use]
    pub fn map(&self) -> &Arc<SongMap> {
        &self.map
    }

    /// Clock reading at insertion.
    #[must_use]
    pub const fn generated_at(&self) -> Duration {
        self.generated_at
    }
}

/// Bounded map cache keyed by track with time-based expiry.
///
/// When full, inserting a new track evicts the entry with the oldest
/// insertion instant. Replacing the entry of a cached track never evicts.
#[derive(Debug)]
pub struct MapCache {
    entries: HashMap<TrackId, CacheEntry>,
    capacity: usize,
    ttl: Duration,
}

impl MapCache {
    /// Creates an empty cache. A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            capacity,
            ttl,
        }
    }

    /// Entry stored for the track, if any.
    #[must_use]
    pub fn get(&self, track_id: &TrackId) -> Option<&CacheEntry> {
        self.entries.get(track_id)
    }

    /// Stores a map and returns the track evicted to make room, if any.
    pub fn insert(
        &mut self,
        track_id: TrackId,
        map: Arc<SongMap>,
        now: Duration,
    ) -> Option<TrackId> {
        let evicted = if !self.entries.contains_key(&track_id) && self.entries.len() >= self.capacity
        {
            self.oldest()
        } else {
            None
        };
        if let Some(oldest) = &evicted {
            let _ = self.entries.remove(oldest);
        }

        let _ = self.entries.insert(
            track_id,
            CacheEntry {
                map,
                generated_at: now,
            },
        );
        evicted
    }

    /// Removes the entry of a track.
    pub fn remove(&mut self, track_id: &TrackId) -> Option<CacheEntry> {
        self.entries.remove(track_id)
    }

    /// Drops every entry older than the time to live and returns their tracks.
    pub fn sweep_expired(&mut self, now: Duration) -> Vec<TrackId> {
        let ttl = self.ttl;
        let mut expired: Vec<TrackId> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.saturating_sub(entry.generated_at) > ttl)
            .map(|(track_id, _)| track_id.clone())
            .collect();
        expired.sort();
        for track_id in &expired {
            let _ = self.entries.remove(track_id);
        }
        expired
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the cache holds no entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most entries the cache holds at once.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn oldest(&self) -> Option<TrackId> {
        self.entries
            .iter()
            .min_by(|(a_id, a), (b_id, b)| {
                a.generated_at
                    .cmp(&b.generated_at)
                    .then_with(|| a_id.cmp(b_id))
            })
            .map(|(track_id, _)| track_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_runner_core::{MapTheme, MapVersion, Rgb};

    fn map(track: &str) -> Arc<SongMap> {
        let white = Rgb::from_rgb(0xff, 0xff, 0xff);
        Arc::new(SongMap {
            track_id: TrackId::new(track),
            patterns: Vec::new(),
            difficulty_curve: Vec::new(),
            visual_theme: MapTheme {
                name: "plain".to_owned(),
                obstacle_color: white,
                obstacle_glow: white,
                background_color: white,
                particle_color: white,
                special_effects: Vec::new(),
            },
            total_duration_ms: 1_000,
            version: MapVersion::Template,
        })
    }

    fn secs(value: u64) -> Duration {
        Duration::from_secs(value)
    }

    #[test]
    fn evicts_oldest_entry_when_full() {
        let mut cache = MapCache::new(2, secs(600));
        assert_eq!(cache.insert(TrackId::new("a"), map("a"), secs(1)), None);
        assert_eq!(cache.insert(TrackId::new("b"), map("b"), secs(2)), None);
        assert_eq!(
            cache.insert(TrackId::new("c"), map("c"), secs(3)),
            Some(TrackId::new("a"))
        );
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&TrackId::new("a")).is_none());
    }

    #[test]
    fn replacing_an_entry_refreshes_it_without_eviction() {
        let mut cache = MapCache::new(2, secs(600));
        let _ = cache.insert(TrackId::new("a"), map("a"), secs(1));
        let _ = cache.insert(TrackId::new("b"), map("b"), secs(2));
        assert_eq!(cache.insert(TrackId::new("a"), map("a"), secs(3)), None);
        assert_eq!(
            cache.insert(TrackId::new("c"), map("c"), secs(4)),
            Some(TrackId::new("b"))
        );
        let refreshed = cache.get(&TrackId::new("a")).expect("a is cached");
        assert_eq!(refreshed.generated_at(), secs(3));
    }

    #[test]
    fn sweep_drops_only_expired_entries() {
        let mut cache = MapCache::new(10, secs(600));
        let _ = cache.insert(TrackId::new("old"), map("old"), secs(0));
        let _ = cache.insert(TrackId::new("new"), map("new"), secs(300));

        assert!(cache.sweep_expired(secs(600)).is_empty());
        assert_eq!(cache.sweep_expired(secs(601)), vec![TrackId::new("old")]);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&TrackId::new("new")).is_some());
    }

    #[test]
    fn zero_capacity_holds_one_entry() {
        let mut cache = MapCache::new(0, secs(600));
        assert_eq!(cache.capacity(), 1);
        let _ = cache.insert(TrackId::new("a"), map("a"), secs(0));
        assert_eq!(
            cache.insert(TrackId::new("b"), map("b"), secs(0)),
            Some(TrackId::new("a"))
        );
        cache.clear();
        assert!(cache.is_empty());
    }
}
