//! `tryAllGather` (§4.6): the final sweep that clears out whatever's left
//! in `in_axes_per_dim` by gathering it.

use crate::axis::AxisRef;
use crate::capacity::pop_back_from_current_axes;
use crate::collective::CollectiveEmitter;
use crate::merge::add_axis_or_merge;

use super::PlannerState;

/// The axes to gather for `dim` (all of `in_axes_per_dim[dim]`, merged into
/// canonical form), with `in_axes_per_dim[dim]`, `current_axes_per_dim[dim]`
/// and `in_axis_set` updated to reflect the gather.
fn get_gathering_axes(state: &mut PlannerState, dim: usize) -> Vec<AxisRef> {
    if state.in_axes_per_dim[dim].is_empty() {
        return Vec::new();
    }
    let in_axes: Vec<AxisRef> = std::mem::take(&mut state.in_axes_per_dim[dim]).into();
    pop_back_from_current_axes(&mut state.current_axes_per_dim[dim], &in_axes);

    let mut gathering_axes = Vec::new();
    for axis in &in_axes {
        add_axis_or_merge(&mut gathering_axes, axis.clone());
        state.in_axis_set.shift_remove(axis);
    }
    gathering_axes
}

pub fn try_all_gather<E: CollectiveEmitter>(
    state: &mut PlannerState,
    operand: E::Value,
    emitter: &mut E,
) -> E::Value {
    let rank = state.rank();
    let mut gathering_axes_per_dim = vec![Vec::new(); rank];
    let mut has_gathering_axes = false;
    for dim in 0..rank {
        let axes = get_gathering_axes(state, dim);
        if !axes.is_empty() {
            has_gathering_axes = true;
        }
        gathering_axes_per_dim[dim] = axes;
    }

    if !has_gathering_axes {
        log::trace!("all-gather: skipped (nothing left to gather)");
        return operand;
    }

    log::debug!("all-gather: {gathering_axes_per_dim:?}");
    let result_sharding = state.current_sharding();
    emitter.emit_all_gather(operand, &gathering_axes_per_dim, &result_sharding)
}
