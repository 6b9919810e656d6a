//! Positional memoization for bind passes.
//!
//! A [`MemoTable`] belongs to exactly one render target. During a bind pass
//! the table walks an ordered sequence of slots with a cursor; each guarded
//! call compares its dependency values against the slots it owns and skips
//! the action when nothing changed since the last bind of the same identity.
//!
//! The table is positional, not keyed: a bind closure must issue the same
//! guarded calls, in the same order, with the same arity, on every pass for a
//! given identity. Violating that produces undefined skip behavior; debug
//! builds flag it with a warning at the end of the pass (see
//! [`MemoTable::end_pass`]).

use smallvec::SmallVec;

use crate::payload::Payload;

/// Dependency values for one guarded bind call.
///
/// Implemented for 1..=3-element tuples of payload-convertible values and for
/// `Vec<Payload>` when the arity is dynamic. Pass a single dependency as a
/// one-element tuple: `(value,)`.
pub trait DepList {
    fn into_deps(self) -> SmallVec<[Payload; 3]>;
}

macro_rules! impl_dep_list {
    ($(($($name:ident),+))+) => {
        $(
            impl<$($name: Into<Payload>),+> DepList for ($($name,)+) {
                #[allow(non_snake_case)]
                fn into_deps(self) -> SmallVec<[Payload; 3]> {
                    let ($($name,)+) = self;
                    let mut deps = SmallVec::new();
                    $(deps.push($name.into());)+
                    deps
                }
            }
        )+
    };
}

impl_dep_list! {
    (A)
    (A, B)
    (A, B, C)
}

impl DepList for Vec<Payload> {
    fn into_deps(self) -> SmallVec<[Payload; 3]> {
        SmallVec::from_vec(self)
    }
}

/// Ordered dependency slots plus a cursor, owned by one render target.
#[derive(Debug, Default)]
pub struct MemoTable {
    slots: Vec<Payload>,
    cursor: usize,
}

impl MemoTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewinds the cursor; called at the start of every bind pass.
    pub fn begin_pass(&mut self) {
        self.cursor = 0;
    }

    /// Runs `action` unless every dependency equals the value stored at the
    /// cursor. The cursor advances by the dependency count either way.
    ///
    /// First observation (table shorter than needed) always runs. On any
    /// mismatch the stored values are overwritten before the action runs.
    /// Returns whether the action ran.
    pub fn check_and_run<D, F>(&mut self, deps: D, action: F) -> bool
    where
        D: DepList,
        F: FnOnce(),
    {
        let deps = deps.into_deps();
        let start = self.cursor;
        let end = start + deps.len();
        self.cursor = end;

        if self.slots.len() < end {
            // First observation for these slots. Anything left over from a
            // longer earlier pass past `start` is stale; drop it.
            self.slots.truncate(start);
            self.slots.extend(deps);
            action();
            return true;
        }

        let unchanged = deps.iter().eq(self.slots[start..end].iter());
        if unchanged {
            return false;
        }
        for (slot, dep) in self.slots[start..end].iter_mut().zip(deps) {
            *slot = dep;
        }
        action();
        true
    }

    /// Ends a bind pass. Debug builds warn (non-fatally) when the cursor does
    /// not land exactly on the slot count, which means the guarded calls were
    /// not stable in order and count for this identity.
    pub fn end_pass(&self) {
        if cfg!(debug_assertions) && self.cursor != self.slots.len() {
            log::warn!(
                "bind pass ended at memo slot {} of {}; guarded bind calls must be \
                 issued in a stable order and count per identity",
                self.cursor,
                self.slots.len()
            );
        }
    }

    /// Drops all recorded values. Called when the owning target is rebound to
    /// a different identity.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.cursor = 0;
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn bind_once(table: &mut MemoTable, deps: impl DepList) -> bool {
        table.begin_pass();
        let ran = table.check_and_run(deps, || {});
        table.end_pass();
        ran
    }

    #[test]
    fn first_observation_always_runs() {
        let mut table = MemoTable::new();
        assert!(bind_once(&mut table, ("title",)));
        assert_eq!(table.slot_count(), 1);
    }

    #[test]
    fn unchanged_dependency_skips() {
        let mut table = MemoTable::new();
        assert!(bind_once(&mut table, ("title",)));
        assert!(!bind_once(&mut table, ("title",)));
        assert!(bind_once(&mut table, ("renamed",)));
        // Slot storage was updated to the new value.
        assert!(!bind_once(&mut table, ("renamed",)));
    }

    #[test]
    fn any_changed_dependency_runs_exactly_once() {
        let mut table = MemoTable::new();
        let runs = Cell::new(0);

        for (a, b) in [("x", 1), ("x", 1), ("x", 2), ("y", 2)] {
            table.begin_pass();
            table.check_and_run((a, b), || runs.set(runs.get() + 1));
            table.end_pass();
        }
        // Initial run, then one run per changed pass.
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn cursor_advances_even_when_skipped() {
        let mut table = MemoTable::new();

        table.begin_pass();
        table.check_and_run((1,), || {});
        table.check_and_run((2, 3), || {});
        table.end_pass();
        assert_eq!(table.slot_count(), 3);

        table.begin_pass();
        let first = table.check_and_run((1,), || {});
        let second = table.check_and_run((2, 9), || {});
        table.end_pass();
        assert!(!first);
        assert!(second);
        assert_eq!(table.cursor(), 3);
    }

    #[test]
    fn clear_forgets_observations() {
        let mut table = MemoTable::new();
        assert!(bind_once(&mut table, (42,)));
        table.clear();
        assert!(bind_once(&mut table, (42,)));
    }

    #[test]
    fn dynamic_arity_via_vec() {
        let mut table = MemoTable::new();
        let deps: Vec<Payload> = (0..5).map(Payload::from).collect();
        assert!(bind_once(&mut table, deps.clone()));
        assert!(!bind_once(&mut table, deps));
        assert_eq!(table.slot_count(), 5);
    }

    #[test]
    fn shorter_pass_truncates_stale_slots() {
        let mut table = MemoTable::new();
        table.begin_pass();
        table.check_and_run((1,), || {});
        table.check_and_run((2,), || {});
        table.end_pass();

        // A structurally different pass is a contract violation, but the
        // table must stay self-consistent: growth past the end of the stored
        // slots drops the stale tail and always runs.
        table.begin_pass();
        assert!(!table.check_and_run((1,), || {}));
        assert!(table.check_and_run((2, 7), || {}));
        table.end_pass();
        assert_eq!(table.slot_count(), 3);
    }
}
