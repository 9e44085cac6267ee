use std::sync::Arc;

use dashmap::DashMap;

use crate::media::MediaType;

/// Bounded memo of parsed header strings
///
/// Keys are raw header values, values are the result of
/// [`MediaType::parse_list`]. Once `capacity` entries exist new header values
/// are parsed on every call without being stored, so a flood of distinct
/// headers cannot grow the map.
#[derive(Debug)]
pub struct HeaderCache {
    entries: DashMap<String, Arc<[MediaType]>>,
    capacity: usize,
}

impl HeaderCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn get_or_parse(&self, raw: &str) -> Arc<[MediaType]> {
        if let Some(hit) = self.entries.get(raw) {
            return Arc::clone(hit.value());
        }
        let parsed: Arc<[MediaType]> = Arc::from(MediaType::parse_list(raw));
        if self.entries.len() < self.capacity {
            self.entries
                .entry(raw.to_string())
                .or_insert_with(|| Arc::clone(&parsed));
        }
        parsed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
