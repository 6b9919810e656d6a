//! Render targets and the shared recycled pool.

use std::any::Any;
use std::fmt;
use std::sync::Mutex;

use rustc_hash::FxHashMap;

use rebind_core::{MemoTable, RenderTypeId};

use crate::item::ItemId;

/// Default number of idle targets retained per type.
pub const DEFAULT_POOL_CAPACITY: usize = 5;

/// A reusable, mutable presentation object plus its bind-skip state.
///
/// Exclusively owned by either the scrolling container (while attached) or
/// the [`RecycledPool`] (while idle); the adapter transfers ownership
/// atomically by moving the value.
pub struct RenderTarget {
    type_id: RenderTypeId,
    view: Box<dyn Any + Send>,
    memo: MemoTable,
    last_bound: Option<ItemId>,
}

impl fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTarget")
            .field("type_id", &self.type_id)
            .field("last_bound", &self.last_bound)
            .finish_non_exhaustive()
    }
}

impl RenderTarget {
    pub fn new(type_id: RenderTypeId, view: Box<dyn Any + Send>) -> Self {
        Self {
            type_id,
            view,
            memo: MemoTable::new(),
            last_bound: None,
        }
    }

    pub fn type_id(&self) -> RenderTypeId {
        self.type_id
    }

    /// Identity this target was last bound to, surviving a round trip
    /// through the pool so a same-identity rebind can still skip.
    pub fn last_bound(&self) -> Option<ItemId> {
        self.last_bound
    }

    pub fn view<V: Any>(&self) -> Option<&V> {
        self.view.downcast_ref()
    }

    pub fn view_mut<V: Any>(&mut self) -> Option<&mut V> {
        self.view.downcast_mut()
    }

    /// Starts a bind pass for `id`. A different identity than the last bind
    /// means a new bind context: the memo table is cleared. The same identity
    /// keeps its slots so unchanged dependencies skip.
    pub(crate) fn prepare_bind(&mut self, id: ItemId) {
        if self.last_bound != Some(id) {
            self.memo.clear();
            self.last_bound = Some(id);
        }
        self.memo.begin_pass();
    }

    pub(crate) fn finish_bind(&mut self) {
        self.memo.end_pass();
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut (dyn Any + Send), &mut MemoTable) {
        (self.view.as_mut(), &mut self.memo)
    }
}

#[derive(Debug)]
struct Bucket {
    idle: Vec<RenderTarget>,
    capacity: usize,
}

impl Default for Bucket {
    fn default() -> Self {
        Self {
            idle: Vec::new(),
            capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

/// Capacity-bounded cache of constructed-but-unbound render targets, keyed
/// by type id.
///
/// Explicitly constructed and shared via `Arc` between the list instances
/// that should recycle each other's targets. Internally synchronized; all
/// operations are infallible - an empty bucket is a normal outcome handled
/// by constructing fresh.
#[derive(Debug, Default)]
pub struct RecycledPool {
    buckets: Mutex<FxHashMap<RenderTypeId, Bucket>>,
}

impl RecycledPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns an idle target of `type_id`, most recently
    /// released first. `None` means the caller constructs one.
    pub fn acquire(&self, type_id: RenderTypeId) -> Option<RenderTarget> {
        let mut buckets = self.buckets.lock().expect("recycled pool poisoned");
        buckets.get_mut(&type_id).and_then(|bucket| bucket.idle.pop())
    }

    /// Enqueues `target` as idle for its type. A bucket already at capacity
    /// drops the incoming target instead of growing unbounded.
    pub fn release(&self, target: RenderTarget) {
        let mut buckets = self.buckets.lock().expect("recycled pool poisoned");
        let bucket = buckets.entry(target.type_id()).or_default();
        if bucket.idle.len() < bucket.capacity {
            bucket.idle.push(target);
        }
    }

    /// Capacity ratchet: raises the retained-idle limit for `type_id` to at
    /// least `capacity`, never lowering a previously configured larger value.
    pub fn set_min_capacity(&self, type_id: RenderTypeId, capacity: usize) {
        let mut buckets = self.buckets.lock().expect("recycled pool poisoned");
        let bucket = buckets.entry(type_id).or_default();
        if capacity > bucket.capacity {
            bucket.capacity = capacity;
            let additional = capacity.saturating_sub(bucket.idle.len());
            bucket.idle.reserve(additional);
        }
    }

    pub fn idle_count(&self, type_id: RenderTypeId) -> usize {
        let buckets = self.buckets.lock().expect("recycled pool poisoned");
        buckets.get(&type_id).map_or(0, |bucket| bucket.idle.len())
    }

    /// Drops every idle target. Capacities are kept.
    pub fn clear(&self) {
        let mut buckets = self.buckets.lock().expect("recycled pool poisoned");
        for bucket in buckets.values_mut() {
            bucket.idle.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(type_id: RenderTypeId) -> RenderTarget {
        RenderTarget::new(type_id, Box::new(0u32))
    }

    const ROW: RenderTypeId = RenderTypeId::reserved(1);
    const HEADER: RenderTypeId = RenderTypeId::reserved(2);

    #[test]
    fn acquire_miss_is_none() {
        let pool = RecycledPool::new();
        assert!(pool.acquire(ROW).is_none());
    }

    #[test]
    fn release_then_acquire_round_trips_by_type() {
        let pool = RecycledPool::new();
        pool.release(target(ROW));
        assert_eq!(pool.idle_count(ROW), 1);
        assert!(pool.acquire(HEADER).is_none());

        let reused = pool.acquire(ROW).expect("idle target");
        assert_eq!(reused.type_id(), ROW);
        assert_eq!(pool.idle_count(ROW), 0);
    }

    #[test]
    fn release_at_capacity_discards() {
        let pool = RecycledPool::new();
        for _ in 0..DEFAULT_POOL_CAPACITY + 3 {
            pool.release(target(ROW));
        }
        assert_eq!(pool.idle_count(ROW), DEFAULT_POOL_CAPACITY);
    }

    #[test]
    fn capacity_ratchet_never_lowers() {
        let pool = RecycledPool::new();
        pool.set_min_capacity(ROW, 5);
        pool.set_min_capacity(ROW, 3);
        for _ in 0..8 {
            pool.release(target(ROW));
        }
        assert_eq!(pool.idle_count(ROW), 5);

        pool.set_min_capacity(ROW, 8);
        for _ in 0..8 {
            pool.release(target(ROW));
        }
        assert_eq!(pool.idle_count(ROW), 8);
    }

    #[test]
    fn most_recently_released_acquired_first() {
        let pool = RecycledPool::new();
        let mut first = target(ROW);
        first.prepare_bind(ItemId::Key(1));
        let mut second = target(ROW);
        second.prepare_bind(ItemId::Key(2));

        pool.release(first);
        pool.release(second);
        let reused = pool.acquire(ROW).expect("idle target");
        assert_eq!(reused.last_bound(), Some(ItemId::Key(2)));
    }

    #[test]
    fn clear_keeps_capacity() {
        let pool = RecycledPool::new();
        pool.set_min_capacity(ROW, 7);
        pool.release(target(ROW));
        pool.clear();
        assert_eq!(pool.idle_count(ROW), 0);
        for _ in 0..9 {
            pool.release(target(ROW));
        }
        assert_eq!(pool.idle_count(ROW), 7);
    }
}
