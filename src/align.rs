//! Sub-axis alignment by decomposition (§4.2): given two families of
//! per-dimension axis lists, split every axis that partially overlaps one
//! in the other family into aligned prefix/overlap/suffix pieces, so that
//! afterward any two axes across the families are either equal or disjoint.

use std::collections::VecDeque;

use crate::axis::AxisRef;

pub type AxisList = VecDeque<AxisRef>;

/// The first axis in `ordered_other_axes` (sorted by the total order on
/// `AxisRef`) that overlaps `axis`, found via a lower-bound binary search
/// plus a check of its predecessor -- any axis that overlaps `axis` must be
/// adjacent to the lower bound in a sorted-by-`(name, pre_size, size)`
/// ordering, so at most these two candidates need checking.
pub fn get_first_overlapping(axis: &AxisRef, ordered_other_axes: &[AxisRef]) -> Option<usize> {
    if ordered_other_axes.is_empty() {
        return None;
    }
    let after = ordered_other_axes.partition_point(|a| a < axis);
    if after > 0 && ordered_other_axes[after - 1].overlaps(axis) {
        return Some(after - 1);
    }
    if after < ordered_other_axes.len() && ordered_other_axes[after].overlaps(axis) {
        return Some(after);
    }
    None
}

/// All axes across every dimension's list, sorted by the total order.
pub fn get_ordered_axes(axes_per_dim: &[AxisList]) -> Vec<AxisRef> {
    let mut result: Vec<AxisRef> = axes_per_dim.iter().flatten().cloned().collect();
    result.sort();
    result
}

/// Decomposes every axis in `axes` that partially (but not fully) overlaps
/// some axis of `ordered_other_axes`, in place.
///
/// When an axis is decomposed, its suffix (if any) becomes the next axis to
/// check -- against the immediate successor of the overlap found, not a
/// fresh binary search, since the suffix starts exactly where the overlap
/// ended and the other family is sorted.
pub fn align_sub_axes_by_decomposition(axes: &mut AxisList, ordered_other_axes: &[AxisRef]) {
    if ordered_other_axes.is_empty() {
        return;
    }
    let mut idx = 0;
    while idx < axes.len() {
        let mut axis = axes[idx].clone();
        let mut overlap_idx = get_first_overlapping(&axis, ordered_other_axes);
        let mut advanced = false;
        while let Some(oi) = overlap_idx {
            let overlap_axis = &ordered_other_axes[oi];
            if !(overlap_axis.can_coexist(&axis)
                && !overlap_axis.contains(&axis)
                && overlap_axis.overlaps(&axis))
            {
                break;
            }
            axes.remove(idx);
            let mut insert_at = idx;
            if let Some(prefix) = axis.get_prefix_without_overlap(overlap_axis) {
                axes.insert(insert_at, prefix);
                insert_at += 1;
            }
            let overlap = axis
                .get_overlap(overlap_axis)
                .expect("getFirstOverlapping guarantees an overlap exists");
            axes.insert(insert_at, overlap);
            insert_at += 1;
            if let Some(suffix) = axis.get_suffix_without_overlap(overlap_axis) {
                axes.insert(insert_at, suffix.clone());
                idx = insert_at;
                axis = suffix;
                overlap_idx = (oi + 1 < ordered_other_axes.len()).then_some(oi + 1);
                advanced = false;
            } else {
                advanced = true;
                break;
            }
        }
        if !advanced {
            idx += 1;
        }
    }
}

/// Runs [`align_sub_axes_by_decomposition`] on every dimension's axis list.
pub fn align_sub_axes_by_decomposition_per_dim(
    axes_per_dim: &mut [AxisList],
    ordered_other_axes: &[AxisRef],
) {
    if ordered_other_axes.is_empty() {
        return;
    }
    for axes in axes_per_dim.iter_mut() {
        align_sub_axes_by_decomposition(axes, ordered_other_axes);
    }
}

/// Aligns `in_axes_per_dim` and `out_axes_per_dim` against each other: both
/// directions are computed against *snapshots* taken before either family is
/// mutated, matching the original two-pass structure (aligning `in` against
/// `out` must not see axes `out` has already split while aligning against
/// the stale `in` snapshot, and vice versa).
pub fn align_sub_axes(in_axes_per_dim: &mut [AxisList], out_axes_per_dim: &mut [AxisList]) {
    let ordered_in = get_ordered_axes(in_axes_per_dim);
    let ordered_out = get_ordered_axes(out_axes_per_dim);
    align_sub_axes_by_decomposition_per_dim(in_axes_per_dim, &ordered_out);
    align_sub_axes_by_decomposition_per_dim(out_axes_per_dim, &ordered_in);
}

/// Removes the common leading prefix of `in_axes_per_dim[d]` and
/// `out_axes_per_dim[d]` for every dimension `d`.
pub fn remove_common_prefix(in_axes_per_dim: &mut [AxisList], out_axes_per_dim: &mut [AxisList]) {
    for (in_axes, out_axes) in in_axes_per_dim.iter_mut().zip(out_axes_per_dim.iter_mut()) {
        while !in_axes.is_empty() && !out_axes.is_empty() && in_axes.front() == out_axes.front() {
            in_axes.pop_front();
            out_axes.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(axes: Vec<AxisRef>) -> AxisList {
        axes.into_iter().collect()
    }

    #[test]
    fn no_overlap_leaves_axes_untouched() {
        let mut axes = list(vec![AxisRef::sub("x", 1, 2)]);
        let other = vec![AxisRef::sub("y", 1, 2)];
        align_sub_axes_by_decomposition(&mut axes, &other);
        assert_eq!(axes, list(vec![AxisRef::sub("x", 1, 2)]));
    }

    #[test]
    fn equal_axes_are_not_decomposed() {
        let mut axes = list(vec![AxisRef::sub("a", 1, 4)]);
        let other = vec![AxisRef::sub("a", 1, 4)];
        align_sub_axes_by_decomposition(&mut axes, &other);
        assert_eq!(axes, list(vec![AxisRef::sub("a", 1, 4)]));
    }

    #[test]
    fn partial_overlap_decomposes_into_three_pieces() {
        // "a":(1)8 aligned against "a":(4)4 -> "a":(1)4, "a":(4)2.
        let mut in_axes = vec![list(vec![AxisRef::sub("a", 1, 8)])];
        let mut out_axes = vec![list(vec![AxisRef::sub("a", 4, 4)])];
        align_sub_axes(&mut in_axes, &mut out_axes);
        assert_eq!(
            in_axes[0],
            list(vec![AxisRef::sub("a", 1, 4), AxisRef::sub("a", 4, 2)])
        );
        assert_eq!(
            out_axes[0],
            list(vec![AxisRef::sub("a", 4, 2), AxisRef::sub("a", 8, 2)])
        );
    }

    #[test]
    fn remove_common_prefix_stops_at_first_mismatch() {
        let mut in_axes = vec![list(vec![
            AxisRef::sub("x", 1, 2),
            AxisRef::sub("y", 1, 2),
        ])];
        let mut out_axes = vec![list(vec![AxisRef::sub("x", 1, 2), AxisRef::sub("z", 1, 2)])];
        remove_common_prefix(&mut in_axes, &mut out_axes);
        assert_eq!(in_axes[0], list(vec![AxisRef::sub("y", 1, 2)]));
        assert_eq!(out_axes[0], list(vec![AxisRef::sub("z", 1, 2)]));
    }
}
