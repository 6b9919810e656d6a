//! Keyed list diff between two ordered item sequences.
//!
//! Items are paired old-to-new by id. Unmatched old ids become removals,
//! unmatched new ids insertions; matched pairs at different positions become
//! moves, and matched pairs with a changed payload become content changes.
//! Ops are emitted in apply-safe order - removals (descending indices), then
//! moves, then insertions (ascending), then content changes - so a container
//! replaying them stepwise always sees valid indices.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::item::{ItemId, WrappedItem};

/// One structural change to replay against the scrolling container.
///
/// `Move` indices follow remove-then-insert semantics: the item is taken out
/// at `from`, and `to` addresses the list after that removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListOp {
    Remove { index: usize },
    Move { from: usize, to: usize },
    Insert { index: usize },
    Update { index: usize },
}

/// What to do when one submission contains two items with an equal id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail fast with [`DiffError::DuplicateId`]; nothing is applied.
    Strict,
    /// Keep the first occurrence, drop later ones in submission order, and
    /// warn. Never crashes, at the cost of visually dropping the duplicate.
    Lenient,
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::Lenient
        }
    }
}

/// Caller errors detected while diffing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffError {
    DuplicateId(ItemId),
}

impl std::fmt::Display for DiffError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId(id) => {
                write!(f, "submission contains two items with {id}")
            }
        }
    }
}

impl std::error::Error for DiffError {}

/// Ordered ops plus the sequence the adapter retains afterwards (the new
/// submission, minus any lenient-mode duplicates).
#[derive(Debug)]
pub struct DiffResult {
    pub ops: Vec<ListOp>,
    pub items: Vec<WrappedItem>,
}

/// Diffs `old` against `new`.
///
/// `old` is assumed duplicate-free (it is the retained result of a previous
/// accepted submission). Runs in O(n log n) from the longest-increasing-
/// subsequence pass; the move set is minimal for the keyed pairing.
pub fn diff(
    old: &[WrappedItem],
    new: Vec<WrappedItem>,
    policy: DuplicatePolicy,
) -> Result<DiffResult, DiffError> {
    let mut new_index: FxHashMap<ItemId, usize> = FxHashMap::default();
    let mut items: Vec<WrappedItem> = Vec::with_capacity(new.len());
    for item in new {
        if new_index.contains_key(&item.id) {
            match policy {
                DuplicatePolicy::Strict => return Err(DiffError::DuplicateId(item.id)),
                DuplicatePolicy::Lenient => {
                    log::warn!("dropping duplicate item with {} from submission", item.id);
                    continue;
                }
            }
        }
        new_index.insert(item.id, items.len());
        items.push(item);
    }

    let old_index: FxHashMap<ItemId, usize> =
        old.iter().enumerate().map(|(i, item)| (item.id, i)).collect();

    let mut ops = Vec::new();

    // Removals, descending so earlier indices stay valid.
    for (old_pos, item) in old.iter().enumerate().rev() {
        if !new_index.contains_key(&item.id) {
            ops.push(ListOp::Remove { index: old_pos });
        }
    }

    // Survivors in old order, with the position each takes in the new
    // sequence. The longest increasing subsequence of those positions marks
    // the items that can stay put; everything else moves.
    let survivors_old: Vec<ItemId> = old
        .iter()
        .map(|item| item.id)
        .filter(|id| new_index.contains_key(id))
        .collect();
    let new_positions: Vec<usize> = survivors_old.iter().map(|id| new_index[id]).collect();
    let stable = longest_increasing_mask(&new_positions);
    let stable_ids: FxHashSet<ItemId> = survivors_old
        .iter()
        .zip(&stable)
        .filter(|(_, keep)| **keep)
        .map(|(id, _)| *id)
        .collect();

    let survivors_new: Vec<ItemId> = items
        .iter()
        .map(|item| item.id)
        .filter(|id| old_index.contains_key(id))
        .collect();

    // Walk the new order back to front, inserting each moved item directly
    // before its successor; a simulated working list keeps every emitted
    // index valid at its point in the op stream.
    let mut working = survivors_old;
    for pos in (0..survivors_new.len()).rev() {
        let id = survivors_new[pos];
        if stable_ids.contains(&id) {
            continue;
        }
        let from = working
            .iter()
            .position(|candidate| *candidate == id)
            .expect("survivor present in working list");
        working.remove(from);
        let to = match survivors_new.get(pos + 1) {
            Some(next) => working
                .iter()
                .position(|candidate| candidate == next)
                .expect("successor present in working list"),
            None => working.len(),
        };
        working.insert(to, id);
        if from != to {
            ops.push(ListOp::Move { from, to });
        }
    }

    // Insertions at final positions, ascending.
    for (new_pos, item) in items.iter().enumerate() {
        if !old_index.contains_key(&item.id) {
            ops.push(ListOp::Insert { index: new_pos });
        }
    }

    // Content changes for surviving ids whose payload differs.
    for (new_pos, item) in items.iter().enumerate() {
        if let Some(&old_pos) = old_index.get(&item.id) {
            if !old[old_pos].same_content(item) {
                ops.push(ListOp::Update { index: new_pos });
            }
        }
    }

    Ok(DiffResult { ops, items })
}

/// Marks one longest strictly increasing subsequence of `values`.
fn longest_increasing_mask(values: &[usize]) -> Vec<bool> {
    let n = values.len();
    let mut mask = vec![false; n];
    if n == 0 {
        return mask;
    }

    // Patience algorithm with predecessor links for reconstruction.
    let mut tails: Vec<usize> = Vec::new();
    let mut parents: Vec<usize> = vec![usize::MAX; n];
    for i in 0..n {
        let slot = tails.partition_point(|&j| values[j] < values[i]);
        if slot > 0 {
            parents[i] = tails[slot - 1];
        }
        if slot == tails.len() {
            tails.push(i);
        } else {
            tails[slot] = i;
        }
    }

    let mut current = tails.last().copied();
    while let Some(i) = current {
        mask[i] = true;
        current = (parents[i] != usize::MAX).then(|| parents[i]);
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::test_support::test_item;
    use rebind_core::{Payload, RenderTypeId};

    const ROW: RenderTypeId = RenderTypeId::reserved(1);

    fn items(ids: &[u64]) -> Vec<WrappedItem> {
        ids.iter()
            .map(|&id| test_item(id, ROW, Payload::from(format!("payload-{id}"))))
            .collect()
    }

    /// Replays ops against the old id sequence and returns the resulting
    /// order; verifies every index is valid at its point in the stream.
    fn replay(old: &[WrappedItem], result: &DiffResult) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = old.iter().map(|item| item.id).collect();
        for op in &result.ops {
            match *op {
                ListOp::Remove { index } => {
                    assert!(index < ids.len(), "remove index out of range");
                    ids.remove(index);
                }
                ListOp::Move { from, to } => {
                    assert!(from < ids.len(), "move source out of range");
                    let id = ids.remove(from);
                    assert!(to <= ids.len(), "move target out of range");
                    ids.insert(to, id);
                }
                ListOp::Insert { index } => {
                    assert!(index <= ids.len(), "insert index out of range");
                    ids.insert(index, result.items[index].id);
                }
                ListOp::Update { index } => {
                    assert!(index < ids.len(), "update index out of range");
                }
            }
        }
        ids
    }

    fn structural(ops: &[ListOp]) -> usize {
        ops.iter()
            .filter(|op| !matches!(op, ListOp::Update { .. }))
            .count()
    }

    #[test]
    fn first_submission_is_all_inserts() {
        let result = diff(&[], items(&[1, 2, 3]), DuplicatePolicy::Strict).unwrap();
        assert_eq!(
            result.ops,
            vec![
                ListOp::Insert { index: 0 },
                ListOp::Insert { index: 1 },
                ListOp::Insert { index: 2 },
            ]
        );
    }

    #[test]
    fn identical_resubmission_is_empty() {
        let old = items(&[1, 2, 3]);
        let result = diff(&old, items(&[1, 2, 3]), DuplicatePolicy::Strict).unwrap();
        assert!(result.ops.is_empty());
    }

    #[test]
    fn disjoint_ids_pair_removal_and_insertion() {
        let old = items(&[1]);
        let result = diff(&old, items(&[2]), DuplicatePolicy::Strict).unwrap();
        assert_eq!(
            result.ops,
            vec![ListOp::Remove { index: 0 }, ListOp::Insert { index: 0 }]
        );
    }

    #[test]
    fn payload_change_is_update_not_remove_insert() {
        let old = items(&[1, 2]);
        let mut new = items(&[1, 2]);
        new[1].payload = Payload::from("renamed");
        let result = diff(&old, new, DuplicatePolicy::Strict).unwrap();
        assert_eq!(result.ops, vec![ListOp::Update { index: 1 }]);
    }

    #[test]
    fn reorder_with_removal() {
        // [A,B,C] -> [C,A]: remove id 2, then one move placing id 3 before
        // id 1; ids 1 and 3 persist with unchanged payload.
        let old = items(&[1, 2, 3]);
        let result = diff(&old, items(&[3, 1]), DuplicatePolicy::Strict).unwrap();

        assert_eq!(
            result.ops,
            vec![ListOp::Remove { index: 1 }, ListOp::Move { from: 0, to: 1 }]
        );
        assert_eq!(replay(&old, &result), vec![ItemId::Key(3), ItemId::Key(1)]);
    }

    #[test]
    fn moves_are_minimal_for_shuffle() {
        let old = items(&[1, 2, 3, 4]);
        let result = diff(&old, items(&[3, 1, 4, 2]), DuplicatePolicy::Strict).unwrap();

        let moves = result
            .ops
            .iter()
            .filter(|op| matches!(op, ListOp::Move { .. }))
            .count();
        // Longest common stable chain is [1, 4] (or [3, 4]), so two moves.
        assert_eq!(moves, 2);
        assert_eq!(
            replay(&old, &result),
            [3u64, 1, 4, 2].map(ItemId::Key).to_vec()
        );
    }

    #[test]
    fn mixed_churn_replays_to_new_order() {
        let old = items(&[10, 20, 30, 40, 50]);
        let new_ids = [50u64, 25, 10, 40, 60];
        let result = diff(&old, items(&new_ids), DuplicatePolicy::Strict).unwrap();
        assert_eq!(replay(&old, &result), new_ids.map(ItemId::Key).to_vec());
    }

    #[test]
    fn duplicate_id_strict_fails_fast() {
        let mut new = items(&[7]);
        new.push(test_item(7, ROW, Payload::from("B")));
        new.push(test_item(8, ROW, Payload::from("C")));

        let result = diff(&[], new, DuplicatePolicy::Strict);
        assert_eq!(result.unwrap_err(), DiffError::DuplicateId(ItemId::Key(7)));
    }

    #[test]
    fn duplicate_id_lenient_keeps_first() {
        let mut new = Vec::new();
        new.push(test_item(7, ROW, Payload::from("A")));
        new.push(test_item(7, ROW, Payload::from("B")));
        new.push(test_item(8, ROW, Payload::from("C")));

        let result = diff(&[], new, DuplicatePolicy::Lenient).unwrap();
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.items[0].id, ItemId::Key(7));
        assert_eq!(result.items[0].payload, Payload::from("A"));
        assert_eq!(result.items[1].id, ItemId::Key(8));
    }

    #[test]
    fn clearing_the_list_removes_descending() {
        let old = items(&[1, 2, 3]);
        let result = diff(&old, Vec::new(), DuplicatePolicy::Strict).unwrap();
        assert_eq!(
            result.ops,
            vec![
                ListOp::Remove { index: 2 },
                ListOp::Remove { index: 1 },
                ListOp::Remove { index: 0 },
            ]
        );
        assert!(replay(&old, &result).is_empty());
    }

    #[test]
    fn update_and_move_combine() {
        let old = items(&[1, 2]);
        let mut new = items(&[2, 1]);
        new[0].payload = Payload::from("changed");
        let result = diff(&old, new, DuplicatePolicy::Strict).unwrap();

        assert_eq!(structural(&result.ops), 1);
        assert!(result.ops.contains(&ListOp::Update { index: 0 }));
        assert_eq!(
            replay(&old, &result),
            vec![ItemId::Key(2), ItemId::Key(1)]
        );
    }

    #[test]
    fn lis_mask_marks_one_longest_run() {
        assert_eq!(
            longest_increasing_mask(&[1, 3, 0, 2]),
            vec![false, false, true, true]
        );
        assert_eq!(longest_increasing_mask(&[1, 0]), vec![false, true]);
        assert_eq!(longest_increasing_mask(&[]), Vec::<bool>::new());
        assert_eq!(
            longest_increasing_mask(&[0, 1, 2]),
            vec![true, true, true]
        );
    }
}
