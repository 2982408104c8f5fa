//! Capacity accounting: splitting axes to fit a per-dimension or total
//! capacity budget, and greedily distributing a queue of available axes
//! across dimensions within that budget.

use indexmap::IndexSet;

use crate::align::{align_sub_axes_by_decomposition_per_dim, AxisList};
use crate::axis::AxisRef;

/// The product of the sizes of `axes`. `1` for an empty list.
pub fn sharded_size(axes: &AxisList) -> u64 {
    axes.iter().map(|a| a.size()).product()
}

/// Pops the axes in `axes_to_pop` off the back of `current_axes`, in
/// reverse order. `axes_to_pop` may be a decomposed sub-axis of whatever is
/// sitting at the back of `current_axes` (as happens when only a suffix of
/// a dimension's `in` axes is being moved, e.g. by an all-to-all), in which
/// case the trailing entry of `current_axes` is split down to its
/// remaining prefix rather than popped outright.
pub fn pop_back_from_current_axes(current_axes: &mut Vec<AxisRef>, axes_to_pop: &[AxisRef]) {
    for axis in axes_to_pop.iter().rev() {
        let remaining_prefix = current_axes
            .last()
            .and_then(|back| back.get_prefix_without_overlap(axis));
        match remaining_prefix {
            Some(prefix) => {
                *current_axes.last_mut().expect("checked above") = prefix;
            }
            None => {
                current_axes.pop();
            }
        }
    }
}

/// The result of fitting `axis` into a capacity: the piece that fits
/// (`within_axis`, of size `size_within <= capacity`) and, if `axis` was
/// larger than `capacity`, the leftover piece (`remainder_axis`).
#[derive(Debug, Clone)]
pub struct AxisWithinCapacity {
    pub within_axis: AxisRef,
    pub remainder_axis: Option<AxisRef>,
    pub size_within: u64,
}

/// Splits `axis` so that `within_axis` has size at most `capacity`.
///
/// Assumes `capacity` divides `axis.size()` when a split is actually
/// needed -- the same assumption the original algorithm makes, and the
/// same known limitation (§9): a mesh whose axis sizes aren't mutually
/// divisible power-of-two factors can hit a non-dividing capacity here,
/// in which case this silently takes the whole axis as `within_axis`
/// rather than corrupting state with an uneven split.
pub fn get_axis_within_capacity(axis: &AxisRef, capacity: u64) -> AxisWithinCapacity {
    let axis_size = axis.size();
    if capacity >= axis_size || axis_size % capacity != 0 {
        return AxisWithinCapacity {
            within_axis: axis.clone(),
            remainder_axis: None,
            size_within: axis_size,
        };
    }
    let within_axis = AxisRef::sub(axis.name.clone(), axis.pre_size, capacity);
    let remainder_axis = AxisRef::sub(
        axis.name.clone(),
        axis.pre_size * capacity,
        axis_size / capacity,
    );
    AxisWithinCapacity {
        within_axis,
        remainder_axis: Some(remainder_axis),
        size_within: capacity,
    }
}

/// One axis placed into `in_axes_per_dim[dim]` by
/// [`distribute_in_axes_within_capacity`]. The distribution function owns
/// `in_axes_per_dim`/`in_axis_set`/`out_axes_per_dim` realignment directly;
/// callers fold the returned list into whatever other per-dim scratch state
/// they're tracking (e.g. `slicingAxesPerDim`, `currentAxesPerDim`).
#[derive(Debug, Clone)]
pub struct DistributedAxis {
    pub axis: AxisRef,
    pub dim: usize,
}

/// Greedily distributes `available_axes` into `in_axes_per_dim`, one
/// dimension at a time in order, as long as that dimension's capacity (and
/// `total_capacity`, if given) is above `1`, splitting axes against
/// capacity as needed. Re-aligns `out_axes_per_dim` against any axis that
/// was split off due to a capacity constraint, since that introduces a new
/// sub-axis boundary the other family doesn't know about yet.
pub fn distribute_in_axes_within_capacity(
    available_axes: &mut AxisList,
    add_to_front: bool,
    mut total_capacity: Option<u64>,
    in_axes_per_dim: &mut [AxisList],
    in_axis_set: &mut IndexSet<AxisRef>,
    capacity_per_dim: &mut [u64],
    out_axes_per_dim: &mut [AxisList],
) -> Vec<DistributedAxis> {
    let mut distributed = Vec::new();
    if total_capacity == Some(1) {
        return distributed;
    }
    let mut split_added_axes: Vec<AxisRef> = Vec::new();

    for (dim, dim_capacity) in capacity_per_dim.iter_mut().enumerate() {
        let in_axes = &mut in_axes_per_dim[dim];
        while !available_axes.is_empty()
            && *dim_capacity > 1
            && total_capacity.map_or(true, |tc| tc > 1)
        {
            let axis = available_axes.pop_front().expect("checked non-empty above");
            let cur_capacity = (*dim_capacity).min(total_capacity.unwrap_or(*dim_capacity));
            let AxisWithinCapacity {
                within_axis,
                remainder_axis,
                size_within,
            } = get_axis_within_capacity(&axis, cur_capacity);

            if add_to_front {
                in_axes.push_front(within_axis.clone());
            } else {
                in_axes.push_back(within_axis.clone());
            }
            in_axis_set.insert(within_axis.clone());
            distributed.push(DistributedAxis {
                axis: within_axis.clone(),
                dim,
            });

            if let Some(remainder) = remainder_axis {
                split_added_axes.push(within_axis);
                available_axes.push_front(remainder);
            }
            *dim_capacity /= size_within;
            if let Some(tc) = total_capacity.as_mut() {
                *tc /= size_within;
            }
        }
    }

    split_added_axes.sort();
    align_sub_axes_by_decomposition_per_dim(out_axes_per_dim, &split_added_axes);
    distributed
}
