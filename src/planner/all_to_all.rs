//! `tryAllToAlls` (§4.5): the fixpoint loop that, for each source dimension
//! in turn, all-to-alls the maximal contiguous suffix of its residual `in`
//! axes that all map to the same target dimension.

use crate::axis::AxisRef;
use crate::capacity::pop_back_from_current_axes;
use crate::collective::CollectiveEmitter;
use crate::merge::add_axis_or_merge;

use super::PlannerState;

/// If an all-to-all can be performed from `src_dim`, returns the axes moved
/// and the target dimension, with state updated per spec §4.5: the suffix
/// is popped from `in_axes_per_dim[src_dim]`/`current_axes_per_dim[src_dim]`
/// and appended to `in_axes_per_dim[tgt_dim]`/`current_axes_per_dim[tgt_dim]`
/// (or, where it's already the next axis `tgt_dim` is waiting for, consumed
/// directly out of `out_axes_per_dim[tgt_dim]` instead).
fn get_all_to_all_info(state: &mut PlannerState, src_dim: usize) -> Option<(Vec<AxisRef>, usize)> {
    let len = state.in_axes_per_dim[src_dim].len();
    let mut num_axes = 0usize;
    let mut tgt_dim: Option<usize> = None;
    for axis in state.in_axes_per_dim[src_dim].iter().rev() {
        let Some(&(out_dim, _)) = state.out_axis_to_dim_and_index.get(axis) else {
            break;
        };
        if out_dim == src_dim || tgt_dim.is_some_and(|t| t != out_dim) {
            break;
        }
        tgt_dim = Some(out_dim);
        num_axes += 1;
    }
    let tgt_dim = tgt_dim?;
    let start_index = len - num_axes;

    let suffix: Vec<AxisRef> = state.in_axes_per_dim[src_dim]
        .iter()
        .skip(start_index)
        .cloned()
        .collect();
    pop_back_from_current_axes(&mut state.current_axes_per_dim[src_dim], &suffix);
    state.in_axes_per_dim[src_dim].truncate(start_index);

    let mut all_to_all_axes = Vec::with_capacity(suffix.len());
    for axis in suffix {
        add_axis_or_merge(&mut all_to_all_axes, axis.clone());
        add_axis_or_merge(&mut state.current_axes_per_dim[tgt_dim], axis.clone());
        state.in_axis_set.shift_remove(&axis);

        let consumes_out_front = state.in_axes_per_dim[tgt_dim].is_empty()
            && state.out_axes_per_dim[tgt_dim].front() == Some(&axis);
        if consumes_out_front {
            state.out_axes_per_dim[tgt_dim].pop_front();
        } else {
            state.in_axes_per_dim[tgt_dim].push_back(axis.clone());
            state.in_axis_set.insert(axis);
        }
    }

    Some((all_to_all_axes, tgt_dim))
}

pub fn try_all_to_alls<E: CollectiveEmitter>(
    state: &mut PlannerState,
    operand: E::Value,
    emitter: &mut E,
) -> E::Value {
    let mut value = operand;
    loop {
        let mut created = false;
        for src_dim in 0..state.rank() {
            if let Some((axes, tgt_dim)) = get_all_to_all_info(state, src_dim) {
                log::debug!("all-to-all: {src_dim} -> {tgt_dim}: {axes:?}");
                let result_sharding = state.current_sharding();
                value = emitter.emit_all_to_all(value, src_dim, tgt_dim, &axes, &result_sharding);
                created = true;
            }
        }
        if !created {
            break;
        }
    }
    value
}
