//! `tryAllSlice` (§4.3): the capacity-bounded redistribution of available
//! `out` axes into `in_axes_per_dim`, emitted as a single `all-slice`.

use crate::axis::AxisRef;
use crate::capacity::{distribute_in_axes_within_capacity, get_axis_within_capacity, sharded_size};
use crate::collective::CollectiveEmitter;
use crate::merge::add_axis_or_merge;

use super::PlannerState;

/// Recomputes `capacity_per_dim` as the per-dimension slicing capacity
/// (`outShardedSize[d] / inShardedSize[d]`, or `1` if not divisible), and
/// returns the analogous ratio across the whole tensor.
fn update_capacity_per_dim_for_slice(state: &mut PlannerState) -> u64 {
    let mut total_in = 1u64;
    let mut total_out = 1u64;
    for dim in 0..state.rank() {
        let in_size = sharded_size(&state.in_axes_per_dim[dim]);
        let out_size = sharded_size(&state.out_axes_per_dim[dim]);
        total_in *= in_size;
        total_out *= out_size;
        state.capacity_per_dim[dim] = if out_size % in_size == 0 {
            out_size / in_size
        } else {
            1
        };
    }
    if total_out % total_in == 0 {
        total_out / total_in
    } else {
        1
    }
}

/// If slicing can help (total capacity > 1), returns the per-dimension axes
/// to slice and mutates state exactly as described in spec §4.3's two-stage
/// algorithm: first slice each `out` axis into the dimension it's destined
/// for when that dimension still has capacity, then distribute whatever's
/// left over the first dimension with remaining capacity.
fn get_slicing_axes_per_dim(state: &mut PlannerState) -> Option<Vec<Vec<AxisRef>>> {
    let mut total_capacity = update_capacity_per_dim_for_slice(state);
    if total_capacity <= 1 {
        return None;
    }

    let rank = state.rank();
    let mut slicing_axes_per_dim: Vec<Vec<AxisRef>> = vec![Vec::new(); rank];
    let mut available_out_axes = crate::align::AxisList::new();

    for out_dim in 0..rank {
        let mut out_idx = 0usize;
        while out_idx < state.out_axes_per_dim[out_dim].len() && total_capacity > 1 {
            let out_axis = state.out_axes_per_dim[out_dim][out_idx].clone();
            if state.in_axis_set.contains(&out_axis) {
                out_idx += 1;
                continue;
            }
            // Available to slice, but this dim is full: still record it so
            // it can be placed on some other dimension in stage 2.
            if state.capacity_per_dim[out_dim] <= 1 {
                available_out_axes.push_back(out_axis);
                out_idx += 1;
                continue;
            }

            let cur_capacity = state.capacity_per_dim[out_dim].min(total_capacity);
            let within = get_axis_within_capacity(&out_axis, cur_capacity);

            add_axis_or_merge(&mut slicing_axes_per_dim[out_dim], within.within_axis.clone());
            add_axis_or_merge(
                &mut state.current_axes_per_dim[out_dim],
                within.within_axis.clone(),
            );

            let erased_in_place = state.in_axes_per_dim[out_dim].is_empty() && out_idx == 0;
            if erased_in_place {
                // The slicing axis is already where it needs to be.
                state.out_axes_per_dim[out_dim].remove(out_idx);
            } else {
                state.in_axis_set.insert(within.within_axis.clone());
                state.in_axes_per_dim[out_dim].push_back(within.within_axis.clone());
                state.out_axes_per_dim[out_dim][out_idx] = within.within_axis.clone();
                out_idx += 1;
            }

            if let Some(remainder) = within.remainder_axis {
                state.out_axes_per_dim[out_dim].insert(out_idx, remainder.clone());
                available_out_axes.push_back(remainder);
                // The substitute branch already advanced past the withinAxis
                // slot above; skip past the remainder too so stage 1 doesn't
                // reprocess (and re-enqueue) the same axis a second time.
                if !erased_in_place {
                    out_idx += 1;
                }
            }

            total_capacity /= within.size_within;
            state.capacity_per_dim[out_dim] /= within.size_within;
        }
    }

    let distributed = {
        let (in_axes_per_dim, out_axes_per_dim, _current, capacity_per_dim, in_axis_set, _map) =
            state.fields_mut();
        distribute_in_axes_within_capacity(
            &mut available_out_axes,
            false,
            Some(total_capacity),
            in_axes_per_dim,
            in_axis_set,
            capacity_per_dim,
            out_axes_per_dim,
        )
    };
    for placed in distributed {
        add_axis_or_merge(&mut slicing_axes_per_dim[placed.dim], placed.axis.clone());
        add_axis_or_merge(&mut state.current_axes_per_dim[placed.dim], placed.axis);
    }

    // An out axis may have been split due to a capacity constraint; the
    // index built against the un-split axis is now stale.
    state.rebuild_out_axis_to_dim_and_index();

    Some(slicing_axes_per_dim)
}

pub fn try_all_slice<E: CollectiveEmitter>(
    state: &mut PlannerState,
    operand: E::Value,
    emitter: &mut E,
) -> E::Value {
    match get_slicing_axes_per_dim(state) {
        Some(slicing_axes_per_dim) => {
            log::debug!("all-slice: {slicing_axes_per_dim:?}");
            let result_sharding = state.current_sharding();
            emitter.emit_all_slice(operand, &slicing_axes_per_dim, &result_sharding)
        }
        None => {
            log::trace!("all-slice: skipped (no capacity)");
            operand
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collective::ChainRecorder;
    use crate::sharding::TensorSharding;

    fn state_for(
        in_axes: Vec<Vec<AxisRef>>,
        out_axes: Vec<Vec<AxisRef>>,
    ) -> PlannerState {
        let rank = in_axes.len();
        let input = TensorSharding::new("mesh", in_axes, vec![]);
        let output = TensorSharding::new("mesh", out_axes, vec![]);
        let mut state = PlannerState::new("mesh".to_string(), vec![], rank);
        for dim in 0..rank {
            state.in_axes_per_dim[dim] = input.dim_shardings[dim].iter().cloned().collect();
            state.out_axes_per_dim[dim] = output.dim_shardings[dim].iter().cloned().collect();
        }
        state.current_axes_per_dim = input.dim_shardings;
        crate::align::align_sub_axes(&mut state.in_axes_per_dim, &mut state.out_axes_per_dim);
        crate::align::remove_common_prefix(&mut state.in_axes_per_dim, &mut state.out_axes_per_dim);
        for axes in &state.in_axes_per_dim {
            state.in_axis_set.extend(axes.iter().cloned());
        }
        state.rebuild_out_axis_to_dim_and_index();
        state
    }

    #[test]
    fn pure_slice_emits_one_all_slice() {
        let mut state = state_for(
            vec![vec![], vec![]],
            vec![vec![AxisRef::sub("x", 1, 2)], vec![AxisRef::sub("y", 1, 2)]],
        );
        let mut recorder = ChainRecorder::default();
        let sharding = state.current_sharding();
        let _ = try_all_slice(&mut state, sharding, &mut recorder);

        assert_eq!(recorder.ops.len(), 1);
        assert!(state.out_axes_per_dim.iter().all(|a| a.is_empty()));
        assert!(state.in_axes_per_dim.iter().all(|a| a.is_empty()));
    }

    #[test]
    fn identity_sharding_emits_nothing() {
        let mut state = state_for(vec![vec![AxisRef::sub("x", 1, 2)]], vec![vec![AxisRef::sub("x", 1, 2)]]);
        let mut recorder = ChainRecorder::default();
        let sharding = state.current_sharding();
        let _ = try_all_slice(&mut state, sharding, &mut recorder);
        assert!(recorder.ops.is_empty());
    }
}
