use std::num::NonZeroUsize;

use lru::LruCache;

use super::CacheId;

/// Snapshot of the registry for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub item_count: usize,
    pub max_items: usize,
    /// Least-recently-used first.
    pub access_order: Vec<CacheId>,
}

/// Capacity-bounded map with least-recently-used eviction.
///
/// Invariants, after every mutating call:
/// - the access order holds exactly the stored keys, without duplicates
/// - `len() <= max_entries()`
///
/// Evicted and removed values are handed back to the caller, who owns their
/// destruction (GPU resources cannot be released here).
pub struct CacheRegistry<T> {
    entries: LruCache<CacheId, T>,
}

impl<T> CacheRegistry<T> {
    /// `max_entries` is clamped to at least one.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: LruCache::new(clamp_capacity(max_entries)),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn max_entries(&self) -> usize {
        self.entries.cap().get()
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains(id)
    }

    /// Looks up an entry without counting as an access.
    #[inline]
    pub fn peek(&self, id: &str) -> Option<&T> {
        self.entries.peek(id)
    }

    /// Looks up an entry and moves it to the most-recently-used end.
    pub fn touch(&mut self, id: &str) -> Option<&T> {
        self.entries.get(id)
    }

    /// Inserts `value` as the most-recently-used entry, evicting from the
    /// least-recently-used end if over capacity.
    ///
    /// A value previously stored under `id` is returned with the evictions.
    pub fn insert(&mut self, id: CacheId, value: T) -> Vec<(CacheId, T)> {
        let mut evicted = Vec::new();
        if let Some(old) = self.entries.pop(id.as_str()) {
            evicted.push((id.clone(), old));
        }
        evicted.extend(self.entries.push(id, value));
        evicted
    }

    /// Removes an entry; `None` if absent.
    pub fn remove(&mut self, id: &str) -> Option<T> {
        self.entries.pop(id)
    }

    /// Removes every entry, least-recently-used first.
    pub fn drain(&mut self) -> Vec<(CacheId, T)> {
        std::iter::from_fn(|| self.entries.pop_lru()).collect()
    }

    /// Updates the bound (clamped to at least one) and evicts any overflow,
    /// oldest first.
    pub fn set_max_entries(&mut self, max_entries: usize) -> Vec<(CacheId, T)> {
        let cap = clamp_capacity(max_entries);
        let mut evicted = Vec::new();
        while self.entries.len() > cap.get() {
            let Some(entry) = self.entries.pop_lru() else { break };
            evicted.push(entry);
        }
        self.entries.resize(cap);
        evicted
    }

    /// Identifiers, least-recently-used first.
    pub fn access_order(&self) -> impl Iterator<Item = &CacheId> {
        self.entries.iter().rev().map(|(id, _)| id)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            item_count: self.len(),
            max_items: self.max_entries(),
            access_order: self.access_order().cloned().collect(),
        }
    }
}

impl<T> std::fmt::Debug for CacheRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("max_entries", &self.max_entries())
            .field("access_order", &self.access_order().collect::<Vec<_>>())
            .finish()
    }
}

fn clamp_capacity(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap_or_else(|| {
        log::warn!("cache capacity 0 requested; clamping to 1");
        NonZeroUsize::MIN
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(reg: &CacheRegistry<u32>) -> Vec<&str> {
        reg.access_order().map(CacheId::as_str).collect()
    }

    fn assert_consistent(reg: &CacheRegistry<u32>) {
        assert_eq!(reg.access_order().count(), reg.len());
        for id in reg.access_order() {
            assert!(reg.contains(id.as_str()));
        }
        assert!(reg.len() <= reg.max_entries());
    }

    // ── eviction ──────────────────────────────────────────────────────────

    #[test]
    fn oldest_entry_is_evicted_first() {
        let mut reg = CacheRegistry::new(3);
        for (i, id) in ["A", "B", "C"].into_iter().enumerate() {
            assert!(reg.insert(id.into(), i as u32).is_empty());
        }
        let evicted = reg.insert("D".into(), 3);

        assert_eq!(evicted, vec![(CacheId::from("A"), 0)]);
        assert_eq!(ids(&reg), ["B", "C", "D"]);
        assert_consistent(&reg);
    }

    #[test]
    fn access_protects_from_eviction() {
        let mut reg = CacheRegistry::new(3);
        reg.insert("A".into(), 0);
        reg.insert("B".into(), 1);
        reg.insert("C".into(), 2);
        assert_eq!(reg.touch("A"), Some(&0));
        let evicted = reg.insert("D".into(), 3);

        assert_eq!(evicted, vec![(CacheId::from("B"), 1)]);
        assert_eq!(ids(&reg), ["C", "A", "D"]);
        assert_consistent(&reg);
    }

    #[test]
    fn peek_does_not_count_as_access() {
        let mut reg = CacheRegistry::new(2);
        reg.insert("A".into(), 0);
        reg.insert("B".into(), 1);
        assert_eq!(reg.peek("A"), Some(&0));
        let evicted = reg.insert("C".into(), 2);
        assert_eq!(evicted[0].0.as_str(), "A");
    }

    #[test]
    fn shrinking_capacity_evicts_oldest() {
        let mut reg = CacheRegistry::new(4);
        for (i, id) in ["A", "B", "C", "D"].into_iter().enumerate() {
            reg.insert(id.into(), i as u32);
        }
        let evicted: Vec<_> = reg.set_max_entries(2).into_iter().map(|(id, _)| id).collect();
        assert_eq!(evicted, vec![CacheId::from("A"), CacheId::from("B")]);
        assert_eq!(ids(&reg), ["C", "D"]);
        assert_consistent(&reg);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut reg = CacheRegistry::new(0);
        assert_eq!(reg.max_entries(), 1);
        reg.insert("A".into(), 0);
        assert!(reg.set_max_entries(0).is_empty());
        assert!(reg.contains("A"));
    }

    // ── removal ───────────────────────────────────────────────────────────

    #[test]
    fn remove_is_idempotent() {
        let mut reg = CacheRegistry::new(3);
        reg.insert("A".into(), 0);
        assert_eq!(reg.remove("A"), Some(0));
        assert_eq!(reg.remove("A"), None);
        assert!(reg.is_empty());
        assert_consistent(&reg);
    }

    #[test]
    fn reinsert_returns_previous_value() {
        let mut reg = CacheRegistry::new(3);
        reg.insert("A".into(), 0);
        let evicted = reg.insert("A".into(), 1);
        assert_eq!(evicted, vec![(CacheId::from("A"), 0)]);
        assert_eq!(ids(&reg), ["A"]);
    }

    #[test]
    fn drain_empties_in_lru_order() {
        let mut reg = CacheRegistry::new(3);
        reg.insert("A".into(), 0);
        reg.insert("B".into(), 1);
        reg.touch("A");
        let drained: Vec<_> = reg.drain().into_iter().map(|(_, v)| v).collect();
        assert_eq!(drained, vec![1, 0]);
        assert!(reg.is_empty());
        assert_consistent(&reg);
    }

    #[test]
    fn stats_report_order_and_bounds() {
        let mut reg = CacheRegistry::new(5);
        reg.insert("A".into(), 0);
        reg.insert("B".into(), 1);
        let stats = reg.stats();
        assert_eq!(stats.item_count, 2);
        assert_eq!(stats.max_items, 5);
        assert_eq!(stats.access_order, vec![CacheId::from("A"), CacheId::from("B")]);
    }
}
