//! Background, frame-budgeted pool warm-up.
//!
//! Pre-constructs render targets before they become visible to reduce jank
//! during fast scrolls. This is a fill-ahead-of-demand strategy, not eager
//! warm-up: each frame tick constructs targets only until a fixed time
//! budget elapses, then yields and resumes on the next tick, so the
//! rendering thread is never blocked past the budget.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rustc_hash::FxHashSet;
use web_time::Instant;

use rebind_core::RenderTypeId;

use crate::error::{ConstructionError, ErrorReporter};
use crate::pool::{RecycledPool, RenderTarget};

/// Per-tick construction budget. 8 ms leaves roughly half of a 60 Hz frame
/// for the rest of the pipeline.
pub const DEFAULT_FRAME_BUDGET: Duration = Duration::from_millis(8);

/// Schedules a unit of work for the next rendering frame.
///
/// The host integration drives this from its frame clock; tests drive it
/// manually to step ticks one at a time.
pub trait FrameScheduler: Send + Sync {
    fn post(&self, tick: Box<dyn FnOnce() + Send>);
}

/// Runs ticks inline. Suitable for frameless hosts and tools; production
/// still pauses at budget boundaries, it just resumes immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl FrameScheduler for ImmediateScheduler {
    fn post(&self, tick: Box<dyn FnOnce() + Send>) {
        tick();
    }
}

/// Constructs one render target for a preload task.
pub type PreloadFactory =
    Arc<dyn Fn() -> Result<RenderTarget, ConstructionError> + Send + Sync>;

/// How a preload task ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreloadOutcome {
    /// The pool reached the requested idle count.
    Completed,
    /// A factory failure aborted the remaining work for the type.
    Aborted,
}

/// Fills the [`RecycledPool`] ahead of need, one cooperative tick per frame.
pub struct Preloader {
    pool: Arc<RecycledPool>,
    scheduler: Arc<dyn FrameScheduler>,
    reporter: Arc<dyn ErrorReporter>,
    budget: Duration,
    in_flight: Arc<Mutex<FxHashSet<RenderTypeId>>>,
}

impl Preloader {
    pub fn new(
        pool: Arc<RecycledPool>,
        scheduler: Arc<dyn FrameScheduler>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            pool,
            scheduler,
            reporter,
            budget: DEFAULT_FRAME_BUDGET,
            in_flight: Arc::new(Mutex::new(FxHashSet::default())),
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Brings `idle_count(type_id)` up to `count` in the background.
    ///
    /// A no-op when the pool already holds enough idle targets or a task for
    /// `type_id` is in flight (at most one per type). Raises the pool's
    /// capacity ratchet to `count` so the produced targets are retained.
    pub fn request(&self, type_id: RenderTypeId, count: usize, factory: PreloadFactory) {
        self.request_with(type_id, count, factory, None);
    }

    /// Like [`request`](Self::request), with a completion callback invoked
    /// once the task finishes or aborts.
    pub fn request_with(
        &self,
        type_id: RenderTypeId,
        count: usize,
        factory: PreloadFactory,
        on_complete: Option<Box<dyn FnOnce(PreloadOutcome) + Send>>,
    ) {
        if self.pool.idle_count(type_id) >= count {
            if let Some(on_complete) = on_complete {
                on_complete(PreloadOutcome::Completed);
            }
            return;
        }
        {
            let mut in_flight = self.in_flight.lock().expect("preloader poisoned");
            if !in_flight.insert(type_id) {
                return;
            }
        }
        self.pool.set_min_capacity(type_id, count);

        let task = Arc::new(PreloadTask {
            pool: Arc::clone(&self.pool),
            scheduler: Arc::clone(&self.scheduler),
            reporter: Arc::clone(&self.reporter),
            in_flight: Arc::clone(&self.in_flight),
            budget: self.budget,
            type_id,
            target_count: count,
            factory,
            on_complete: Mutex::new(on_complete),
        });
        schedule_tick(task);
    }

    /// Whether a preload task for `type_id` is currently in flight.
    pub fn in_flight(&self, type_id: RenderTypeId) -> bool {
        self.in_flight
            .lock()
            .expect("preloader poisoned")
            .contains(&type_id)
    }
}

struct PreloadTask {
    pool: Arc<RecycledPool>,
    scheduler: Arc<dyn FrameScheduler>,
    reporter: Arc<dyn ErrorReporter>,
    in_flight: Arc<Mutex<FxHashSet<RenderTypeId>>>,
    budget: Duration,
    type_id: RenderTypeId,
    target_count: usize,
    factory: PreloadFactory,
    on_complete: Mutex<Option<Box<dyn FnOnce(PreloadOutcome) + Send>>>,
}

fn schedule_tick(task: Arc<PreloadTask>) {
    let scheduler = Arc::clone(&task.scheduler);
    scheduler.post(Box::new(move || run_tick(task)));
}

fn run_tick(task: Arc<PreloadTask>) {
    let started = Instant::now();
    loop {
        if task.pool.idle_count(task.type_id) >= task.target_count {
            finish(&task, PreloadOutcome::Completed);
            return;
        }
        if started.elapsed() >= task.budget {
            // Out of budget for this frame; resume on the next tick.
            schedule_tick(Arc::clone(&task));
            return;
        }
        match (task.factory)() {
            Ok(target) => task.pool.release(target),
            Err(error) => {
                task.reporter.report(
                    &error,
                    "preload aborted: factory failed to construct a render target",
                );
                finish(&task, PreloadOutcome::Aborted);
                return;
            }
        }
    }
}

fn finish(task: &PreloadTask, outcome: PreloadOutcome) {
    task.in_flight
        .lock()
        .expect("preloader poisoned")
        .remove(&task.type_id);
    if let Some(on_complete) = task
        .on_complete
        .lock()
        .expect("preloader poisoned")
        .take()
    {
        on_complete(outcome);
    }
}
