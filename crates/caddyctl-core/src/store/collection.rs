// ── Generic entity table ──
//
// Concurrent storage keyed by entity id with O(1) lookups. Readers get
// owned, sorted copies so the engine never holds a shard lock.

use dashmap::DashMap;
use uuid::Uuid;

/// A concurrent table for a single entity type.
pub(crate) struct Collection<T: Clone + Send + Sync + 'static> {
    by_id: DashMap<Uuid, T>,
}

impl<T: Clone + Send + Sync + 'static> Collection<T> {
    pub(crate) fn new() -> Self {
        Self {
            by_id: DashMap::new(),
        }
    }

    /// Insert or replace. Returns the previous value, if any.
    pub(crate) fn upsert(&self, id: Uuid, entity: T) -> Option<T> {
        self.by_id.insert(id, entity)
    }

    pub(crate) fn remove(&self, id: Uuid) -> Option<T> {
        self.by_id.remove(&id).map(|(_, v)| v)
    }

    pub(crate) fn get(&self, id: Uuid) -> Option<T> {
        self.by_id.get(&id).map(|r| r.value().clone())
    }

    /// All values, sorted by `key`.
    pub(crate) fn sorted_by_key<K: Ord>(&self, key: impl Fn(&T) -> K) -> Vec<T> {
        let mut values: Vec<T> = self.by_id.iter().map(|r| r.value().clone()).collect();
        values.sort_by_key(&key);
        values
    }

    /// Values matching `pred`, sorted by `key`.
    pub(crate) fn filtered<K: Ord>(
        &self,
        pred: impl Fn(&T) -> bool,
        key: impl Fn(&T) -> K,
    ) -> Vec<T> {
        let mut values: Vec<T> = self
            .by_id
            .iter()
            .filter(|r| pred(r.value()))
            .map(|r| r.value().clone())
            .collect();
        values.sort_by_key(&key);
        values
    }

    /// Remove every value matching `pred`; returns how many went.
    pub(crate) fn remove_where(&self, pred: impl Fn(&T) -> bool) -> usize {
        let before = self.by_id.len();
        self.by_id.retain(|_, v| !pred(v));
        before - self.by_id.len()
    }

    #[allow(dead_code)]
    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    #[allow(dead_code)]
    pub(crate) fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
