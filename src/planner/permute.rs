//! `tryCollectivePermute` (§4.4): deciding whether a permute is needed, and
//! performing it by replacing each dimension's residual axes wholesale.

use crate::align::AxisList;
use crate::capacity::{
    distribute_in_axes_within_capacity, get_axis_within_capacity, pop_back_from_current_axes,
    sharded_size,
};
use crate::collective::CollectiveEmitter;
use crate::merge::add_axis_or_merge;

use super::PlannerState;

/// True when any of the disjunctive triggers in spec §4.4 hold: a dimension
/// has both residual `in` and `out` axes (a direct swap is possible), or
/// there's both an available `in` axis (needs gathering) and an available
/// `out` axis (needs slicing) to substitute for each other, or traversing
/// `in_axes_per_dim` finds target dimensions out of contiguity/order, or an
/// axis destined to be gathered sits before one destined for another
/// dimension (it must move to the front so gather happens after
/// all-to-all).
fn should_collective_permute(state: &PlannerState) -> bool {
    let mut available_in_axis = false;
    let mut available_out_axis = false;

    for dim in 0..state.rank() {
        let in_axes = &state.in_axes_per_dim[dim];
        let out_axes = &state.out_axes_per_dim[dim];
        if !in_axes.is_empty() && !out_axes.is_empty() {
            return true;
        }

        for out_axis in out_axes {
            if !state.in_axis_set.contains(out_axis) {
                available_out_axis = true;
            }
        }

        let mut last_out_dim: Option<usize> = None;
        let mut last_out_index = 0usize;
        let mut seen_dims = vec![false; state.rank()];
        for in_axis in in_axes {
            let entry = state.out_axis_to_dim_and_index.get(in_axis).copied();
            if entry.is_none() {
                available_in_axis = true;
            }
            match entry {
                Some((cur_dim, cur_index)) => {
                    if seen_dims[cur_dim] && (last_out_dim != Some(cur_dim) || cur_index < last_out_index)
                    {
                        return true;
                    }
                    seen_dims[cur_dim] = true;
                    last_out_index = cur_index;
                }
                None if last_out_dim.is_some() => return true,
                None => {}
            }
            last_out_dim = entry.map(|(d, _)| d);
        }
    }

    available_in_axis && available_out_axis
}

/// Rebuilds every dimension's current sharding by clearing `in_axes_per_dim`
/// and repopulating it (and `current_axes_per_dim`) from `out_axes_per_dim`
/// and the axes left over, per spec §4.4's three stages.
fn perform_collective_permute(state: &mut PlannerState) {
    let rank = state.rank();
    let mut available_in_axes = AxisList::new();
    let mut available_out_axes = AxisList::new();

    state.in_axis_set.clear();
    for dim in 0..rank {
        state.capacity_per_dim[dim] = sharded_size(&state.in_axes_per_dim[dim]);

        for axis in state.in_axes_per_dim[dim].iter() {
            if !state.out_axis_to_dim_and_index.contains_key(axis) {
                available_in_axes.push_back(axis.clone());
            }
        }

        let in_axes_snapshot: Vec<_> = std::mem::take(&mut state.in_axes_per_dim[dim]).into();
        pop_back_from_current_axes(&mut state.current_axes_per_dim[dim], &in_axes_snapshot);

        while state.capacity_per_dim[dim] > 1 {
            let Some(out_axis) = state.out_axes_per_dim[dim].pop_front() else {
                break;
            };
            let within = get_axis_within_capacity(&out_axis, state.capacity_per_dim[dim]);
            add_axis_or_merge(&mut state.current_axes_per_dim[dim], within.within_axis);
            if let Some(remainder) = within.remainder_axis {
                state.out_axes_per_dim[dim].push_front(remainder);
            }
            state.capacity_per_dim[dim] /= within.size_within;
        }

        available_out_axes.extend(state.out_axes_per_dim[dim].iter().cloned());
    }

    {
        let (in_axes_per_dim, out_axes_per_dim, _current, capacity_per_dim, in_axis_set, _map) =
            state.fields_mut();
        distribute_in_axes_within_capacity(
            &mut available_out_axes,
            false,
            None,
            in_axes_per_dim,
            in_axis_set,
            capacity_per_dim,
            out_axes_per_dim,
        );
    }
    {
        let (in_axes_per_dim, out_axes_per_dim, _current, capacity_per_dim, in_axis_set, _map) =
            state.fields_mut();
        distribute_in_axes_within_capacity(
            &mut available_in_axes,
            true,
            None,
            in_axes_per_dim,
            in_axis_set,
            capacity_per_dim,
            out_axes_per_dim,
        );
    }

    state.rebuild_out_axis_to_dim_and_index();

    for dim in 0..rank {
        let axes: Vec<_> = state.in_axes_per_dim[dim].iter().cloned().collect();
        for axis in axes {
            add_axis_or_merge(&mut state.current_axes_per_dim[dim], axis);
        }
    }
}

pub fn try_collective_permute<E: CollectiveEmitter>(
    state: &mut PlannerState,
    operand: E::Value,
    emitter: &mut E,
) -> E::Value {
    if !should_collective_permute(state) {
        log::trace!("collective-permute: skipped");
        return operand;
    }
    perform_collective_permute(state);
    log::debug!("collective-permute: current sharding now {:?}", state.current_axes_per_dim);
    let result_sharding = state.current_sharding();
    emitter.emit_collective_permute(operand, &result_sharding)
}
