//! The adapter: owns the current sequence and drives diff, bind, recycle.
//!
//! One adapter per scrolling container. All container mutation happens on
//! the rendering thread through [`Adapter::drain`]; only the diff itself may
//! run on a background thread, and its result is handed back before any
//! mutation is applied.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use rebind_core::{DepList, MemoTable, Payload, RenderTypeId, ShapeKey, TypeRegistry};

use crate::diff::{diff, DiffError, DiffResult, DuplicatePolicy, ListOp};
use crate::error::{ConstructionError, ErrorReporter};
use crate::item::{ItemId, WrappedItem};
use crate::pool::{RecycledPool, RenderTarget};

/// Sequences at or below this length diff inline on the rendering thread;
/// longer ones go to a background thread to stay inside a frame budget.
pub const ASYNC_DIFF_THRESHOLD: usize = 256;

/// Receives structural ops during [`Adapter::drain`], in apply-safe order:
/// removals, moves, insertions, content changes.
pub trait ContainerCallbacks {
    fn on_removed(&mut self, index: usize);
    fn on_moved(&mut self, from: usize, to: usize);
    fn on_inserted(&mut self, index: usize);
    fn on_changed(&mut self, index: usize);
}

/// Handed to an item's bind closure: the target's view, its memo table, and
/// the payload being bound.
pub struct BindContext<'a> {
    view: &'a mut (dyn Any + Send),
    memo: &'a mut MemoTable,
    payload: &'a Payload,
}

impl<'a> BindContext<'a> {
    pub fn payload(&self) -> &Payload {
        self.payload
    }

    pub fn view_mut<V: Any>(&mut self) -> Option<&mut V> {
        self.view.downcast_mut()
    }

    /// The skip-binding primitive: runs `action` on the view only when some
    /// dependency changed since the last bind of the same identity.
    ///
    /// Guarded calls must be issued in a stable order and count per identity
    /// (the memo table is positional). Returns whether the action ran.
    pub fn check_and_run<D>(
        &mut self,
        deps: D,
        action: impl FnOnce(&mut (dyn Any + Send)),
    ) -> bool
    where
        D: DepList,
    {
        let Self { view, memo, .. } = self;
        memo.check_and_run(deps, || action(&mut **view))
    }
}

/// Target lifecycle counters, for tests and diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdapterStats {
    /// Targets constructed by a factory.
    pub created: usize,
    /// Targets taken from the recycled pool instead of constructed.
    pub reused: usize,
    /// Targets returned to the pool.
    pub recycled: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct AdapterConfig {
    pub duplicate_policy: DuplicatePolicy,
    pub async_threshold: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::default(),
            async_threshold: ASYNC_DIFF_THRESHOLD,
        }
    }
}

struct PendingDiff {
    generation: u64,
    result: Result<DiffResult, DiffError>,
}

/// Orchestrates diffing, pooling, and binding for one container.
pub struct Adapter {
    registry: Arc<TypeRegistry>,
    pool: Arc<RecycledPool>,
    reporter: Arc<dyn ErrorReporter>,
    config: AdapterConfig,
    items: Vec<WrappedItem>,
    generation: u64,
    ready: Option<PendingDiff>,
    tx: Sender<PendingDiff>,
    rx: Receiver<PendingDiff>,
    stats: AdapterStats,
}

impl Adapter {
    pub fn new(
        registry: Arc<TypeRegistry>,
        pool: Arc<RecycledPool>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self::with_config(registry, pool, reporter, AdapterConfig::default())
    }

    pub fn with_config(
        registry: Arc<TypeRegistry>,
        pool: Arc<RecycledPool>,
        reporter: Arc<dyn ErrorReporter>,
        config: AdapterConfig,
    ) -> Self {
        let (tx, rx) = channel();
        Self {
            registry,
            pool,
            reporter,
            config,
            items: Vec::new(),
            generation: 0,
            ready: None,
            tx,
            rx,
            stats: AdapterStats::default(),
        }
    }

    /// Submits a new ordered sequence.
    ///
    /// Small sequences diff immediately; large ones diff on a background
    /// thread. Either way nothing is applied until [`drain`](Self::drain)
    /// runs on the rendering thread. A submission made while an earlier
    /// async diff is still pending supersedes it: the stale result is
    /// discarded silently when it arrives.
    ///
    /// Returns `Err` only for a strict-mode duplicate id detected inline;
    /// the previous sequence stays in effect. The same error on the
    /// background path is routed to the error reporter instead.
    pub fn submit(&mut self, new: Vec<WrappedItem>) -> Result<(), DiffError> {
        self.generation += 1;
        let generation = self.generation;

        if new.len().max(self.items.len()) <= self.config.async_threshold {
            let result = diff(&self.items, new, self.config.duplicate_policy)?;
            self.ready = Some(PendingDiff {
                generation,
                result: Ok(result),
            });
            return Ok(());
        }

        let old = self.items.clone();
        let policy = self.config.duplicate_policy;
        let tx = self.tx.clone();
        let reporter = Arc::clone(&self.reporter);
        std::thread::spawn(move || {
            match catch_unwind(AssertUnwindSafe(|| diff(&old, new, policy))) {
                Ok(result) => {
                    // Receiver gone means the adapter was dropped; fine.
                    let _ = tx.send(PendingDiff { generation, result });
                }
                Err(_) => reporter.report(
                    &"panic in background diff computation",
                    "submission dropped, previous sequence stays displayed",
                ),
            }
        });
        Ok(())
    }

    /// Applies the newest pending diff, if any, replaying its ops into
    /// `container`. Superseded results are discarded without being applied.
    /// Returns whether a submission was applied.
    pub fn drain(&mut self, container: &mut dyn ContainerCallbacks) -> bool {
        let mut latest = self.ready.take();
        for pending in self.rx.try_iter() {
            if latest
                .as_ref()
                .map_or(true, |best| pending.generation > best.generation)
            {
                latest = Some(pending);
            }
        }
        let Some(pending) = latest else {
            return false;
        };
        if pending.generation != self.generation {
            // Superseded while computing; only the most recent submission
            // may ever be applied.
            return false;
        }
        match pending.result {
            Ok(result) => {
                self.items = result.items;
                for op in &result.ops {
                    match *op {
                        ListOp::Remove { index } => container.on_removed(index),
                        ListOp::Move { from, to } => container.on_moved(from, to),
                        ListOp::Insert { index } => container.on_inserted(index),
                        ListOp::Update { index } => container.on_changed(index),
                    }
                }
                true
            }
            Err(error) => {
                self.reporter
                    .report(&error, "submission rejected, previous sequence stays displayed");
                false
            }
        }
    }

    /// A render target for `position`: pooled when one of the right type is
    /// idle, freshly constructed through the item's factory otherwise. The
    /// returned target is already bound.
    pub fn target_for(
        &mut self,
        position: usize,
        container: &mut dyn Any,
    ) -> Result<RenderTarget, ConstructionError> {
        let item = self
            .items
            .get(position)
            .ok_or_else(|| ConstructionError::new(format!("no item at position {position}")))?;
        let mut target = match self.pool.acquire(item.type_id) {
            Some(target) => {
                self.stats.reused += 1;
                target
            }
            None => {
                let view = (item.create)(container)?;
                self.stats.created += 1;
                RenderTarget::new(item.type_id, view)
            }
        };
        self.bind_target(position, &mut target);
        Ok(target)
    }

    /// Runs the bind pass for `position` against `target`.
    ///
    /// A target last bound to a different identity gets its memo table
    /// cleared first; the same identity keeps it so unchanged dependencies
    /// skip their sub-operations.
    pub fn bind_target(&mut self, position: usize, target: &mut RenderTarget) {
        let Some(item) = self.items.get(position) else {
            log::warn!("bind requested for out-of-range position {position}");
            return;
        };
        debug_assert_eq!(
            RenderTarget::type_id(target),
            item.type_id,
            "render target type does not match item at position {position}",
        );
        target.prepare_bind(item.id);
        let (view, memo) = target.parts_mut();
        let mut ctx = BindContext {
            view,
            memo,
            payload: &item.payload,
        };
        (item.bind)(&mut ctx);
        target.finish_bind();
    }

    /// Returns a detached target to the shared pool.
    pub fn recycle(&mut self, target: RenderTarget) {
        self.stats.recycled += 1;
        self.pool.release(target);
    }

    /// Span for the layout integration: every column when the item is marked
    /// full-span, its span hint otherwise.
    pub fn span_size(&self, position: usize, total_columns: u32) -> u32 {
        self.items.get(position).map_or(1, |item| {
            if item.full_span {
                total_columns
            } else {
                item.span
            }
        })
    }

    /// Dispatches a click to the item currently at `position`. Looked up at
    /// event time, so it always reflects the item bound there now.
    pub fn notify_click(&self, position: usize) {
        if let Some(callback) = self.items.get(position).and_then(|item| item.on_click.as_ref()) {
            callback();
        }
    }

    pub fn notify_attached(&self, position: usize) {
        if let Some(callback) = self.items.get(position).and_then(|item| item.on_attach.as_ref()) {
            callback();
        }
    }

    pub fn notify_detached(&self, position: usize) {
        if let Some(callback) = self.items.get(position).and_then(|item| item.on_detach.as_ref()) {
            callback();
        }
    }

    /// Delegates to the shared registry; a convenience for builder layers
    /// stamping items.
    pub fn type_id_of(&self, key: &ShapeKey) -> RenderTypeId {
        self.registry.type_id_of(key)
    }

    pub fn item(&self, position: usize) -> Option<&WrappedItem> {
        self.items.get(position)
    }

    /// Index of the item with `id` in the current sequence. Used by scroll
    /// position restoration keyed by item id.
    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn stats(&self) -> AdapterStats {
        self.stats
    }

    pub fn pool(&self) -> &Arc<RecycledPool> {
        &self.pool
    }
}
