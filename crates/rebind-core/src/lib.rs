//! Core kernel for Rebind's diff-driven list engine.
//!
//! This crate holds the pieces with no dependency on the list machinery
//! itself:
//! - [`Payload`] - a tagged value with structural equality, used both as the
//!   business data carried by an item and as a memo dependency value
//! - [`MemoTable`] - positional memoization attached to one render target,
//!   letting a bind pass skip sub-operations whose dependencies are unchanged
//! - [`TypeRegistry`] - durable integer identities for render "shapes" so
//!   targets of the same shape can be recycled across unrelated lists
//!
//! Everything here is UI-agnostic. The list layer (`rebind-foundation`)
//! composes these into an adapter, a recycled pool, and a preloader.

mod memo;
mod payload;
mod registry;

pub use memo::{DepList, MemoTable};
pub use payload::Payload;
pub use registry::{RenderTypeId, ShapeKey, TypeRegistry, FIRST_DYNAMIC_TYPE_ID};
