//! List machinery for Rebind: diffing, pooling, preloading, binding.
//!
//! # Architecture
//!
//! A caller-side builder produces an ordered `Vec<WrappedItem>` per
//! submission. The [`Adapter`] diffs it against the previous sequence,
//! instructs the scrolling container through [`ContainerCallbacks`], and
//! hands out pooled [`RenderTarget`]s for the positions that need one:
//!
//! - [`diff`] - keyed list diff producing removals, moves, inserts, and
//!   content changes in apply-safe order
//! - [`RecycledPool`] - capacity-bounded idle targets keyed by type id,
//!   shared between list instances
//! - [`Preloader`] - frame-budgeted background fill of the pool ahead of
//!   demand
//! - [`Adapter`] - owns the current sequence and drives acquire, bind,
//!   recycle, and event dispatch
//!
//! Layout, view inflation, and animation live outside this crate; they
//! consume `submit`, the pool operations, and the bind primitives.

mod adapter;
mod diff;
mod error;
mod item;
mod pool;
mod preload;

pub use adapter::{
    Adapter, AdapterConfig, AdapterStats, BindContext, ContainerCallbacks, ASYNC_DIFF_THRESHOLD,
};
pub use diff::{diff, DiffError, DiffResult, DuplicatePolicy, ListOp};
pub use error::{ConstructionError, ErrorReporter, LogReporter};
pub use item::{BindFn, EventFn, ItemId, TargetFactory, WrappedItem};
pub use pool::{RecycledPool, RenderTarget, DEFAULT_POOL_CAPACITY};
pub use preload::{
    FrameScheduler, ImmediateScheduler, PreloadFactory, PreloadOutcome, Preloader,
    DEFAULT_FRAME_BUDGET,
};

pub use rebind_core::{
    DepList, MemoTable, Payload, RenderTypeId, ShapeKey, TypeRegistry, FIRST_DYNAMIC_TYPE_ID,
};
