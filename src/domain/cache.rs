//! Price Cache - Single Source of Truth for Last Prices
//!
//! Maps lookup keys to the last known price. Both the streaming channel and
//! the REST fallback write into it; the row renderer only reads from it.
//!
//! Merges are last-write-wins with no timestamp arbitration: the feed does
//! not carry sequence numbers, so a late stale update can overwrite a
//! fresher one. Entries are never evicted.

use std::collections::{HashMap, HashSet};

use super::keys::LookupKey;

/// Key → last price mapping, as produced by the feed or the REST fallback.
pub type PriceMap = HashMap<LookupKey, f64>;

/// Last known price per lookup key.
#[derive(Debug, Clone, Default)]
pub struct PriceCache {
    entries: HashMap<LookupKey, f64>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known price for `key`.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached prices for the keys that are present, skipping the rest.
    pub fn resident<'a, I>(&self, keys: I) -> PriceMap
    where
        I: IntoIterator<Item = &'a LookupKey>,
    {
        keys.into_iter()
            .filter_map(|key| self.get(key.as_str()).map(|price| (key.clone(), price)))
            .collect()
    }

    /// Apply every update, overwriting existing entries.
    ///
    /// All entries are applied before the caller sees the returned key set,
    /// so a re-render driven by it never observes a partial batch.
    pub fn merge_all<I>(&mut self, updates: I) -> HashSet<LookupKey>
    where
        I: IntoIterator<Item = (LookupKey, f64)>,
    {
        let mut touched = HashSet::new();
        for (key, price) in updates {
            self.entries.insert(key.clone(), price);
            touched.insert(key);
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> LookupKey {
        LookupKey::from(k)
    }

    #[test]
    fn test_last_write_wins() {
        let mut cache = PriceCache::new();
        cache.merge_all([(key("A"), 10.0), (key("B"), 20.0)]);
        let touched = cache.merge_all([(key("A"), 15.0)]);

        assert_eq!(cache.get("A"), Some(15.0));
        assert_eq!(cache.get("B"), Some(20.0));
        assert_eq!(touched, HashSet::from([key("A")]));
    }

    #[test]
    fn test_stale_value_can_regress() {
        let mut cache = PriceCache::new();
        cache.merge_all([(key("NSE:INFY"), 1501.0)]);
        cache.merge_all([(key("NSE:INFY"), 1499.5)]);
        assert_eq!(cache.get("NSE:INFY"), Some(1499.5));
    }

    #[test]
    fn test_resident_skips_missing_keys() {
        let mut cache = PriceCache::new();
        cache.merge_all([(key("NSE:TCS"), 3900.0)]);
        let wanted = [key("NSE:TCS"), key("BSE:TCS")];

        let resident = cache.resident(&wanted);
        assert_eq!(resident.len(), 1);
        assert_eq!(resident.get("NSE:TCS"), Some(&3900.0));
    }

    #[test]
    fn test_empty_merge_touches_nothing() {
        let mut cache = PriceCache::new();
        assert!(cache.merge_all(PriceMap::new()).is_empty());
        assert!(cache.is_empty());
    }
}
