//! The planner driver (§4.1): initializes state from an input/output
//! sharding pair, aligns and strips the common prefix, and runs the four
//! collective strategies in their fixed priority order.

mod all_to_all;
mod gather;
mod permute;
mod slice;

use indexmap::{IndexMap, IndexSet};

use crate::align::{self, AxisList};
use crate::axis::AxisRef;
use crate::collective::CollectiveEmitter;
use crate::mesh::Mesh;
use crate::sharding::TensorSharding;

/// The full mutable state of an in-progress reshard: the residual `in`/`out`
/// diffs per dimension, the tensor's live sharding so far, and the two
/// indices (`in_axis_set`, `out_axis_to_dim_and_index`) every strategy
/// consults for O(1) membership/lookup instead of scanning axis lists.
pub struct PlannerState {
    mesh_name: String,
    replicated_axes: Vec<AxisRef>,
    in_axes_per_dim: Vec<AxisList>,
    out_axes_per_dim: Vec<AxisList>,
    current_axes_per_dim: Vec<Vec<AxisRef>>,
    capacity_per_dim: Vec<u64>,
    in_axis_set: IndexSet<AxisRef>,
    out_axis_to_dim_and_index: IndexMap<AxisRef, (usize, usize)>,
}

impl PlannerState {
    fn new(mesh_name: String, replicated_axes: Vec<AxisRef>, rank: usize) -> Self {
        PlannerState {
            mesh_name,
            replicated_axes,
            in_axes_per_dim: vec![AxisList::new(); rank],
            out_axes_per_dim: vec![AxisList::new(); rank],
            current_axes_per_dim: vec![Vec::new(); rank],
            capacity_per_dim: vec![1; rank],
            in_axis_set: IndexSet::new(),
            out_axis_to_dim_and_index: IndexMap::new(),
        }
    }

    pub fn rank(&self) -> usize {
        self.current_axes_per_dim.len()
    }

    /// True once both `in_axes_per_dim` and `out_axes_per_dim` are entirely
    /// empty -- the post-termination invariant the driver asserts.
    pub fn is_done(&self) -> bool {
        self.in_axes_per_dim.iter().all(AxisList::is_empty)
            && self.out_axes_per_dim.iter().all(AxisList::is_empty)
    }

    pub fn current_sharding(&self) -> TensorSharding {
        TensorSharding::new(
            self.mesh_name.clone(),
            self.current_axes_per_dim.clone(),
            self.replicated_axes.clone(),
        )
    }

    /// Rebuilds `out_axis_to_dim_and_index` from scratch against the current
    /// `out_axes_per_dim`. Needed whenever an out axis is split into two
    /// sub-axes by a capacity-driven decomposition, since the split
    /// invalidates any entry recorded under the un-split axis.
    fn rebuild_out_axis_to_dim_and_index(&mut self) {
        self.out_axis_to_dim_and_index.clear();
        for (dim, axes) in self.out_axes_per_dim.iter().enumerate() {
            for (index, axis) in axes.iter().enumerate() {
                self.out_axis_to_dim_and_index
                    .entry(axis.clone())
                    .or_insert((dim, index));
            }
        }
    }

    /// Disjoint mutable borrows of every field, for passing into free
    /// functions (`capacity::distribute_in_axes_within_capacity` and
    /// friends) that need several fields at once without the caller having
    /// to re-derive each one by hand.
    #[allow(clippy::type_complexity)]
    fn fields_mut(
        &mut self,
    ) -> (
        &mut [AxisList],
        &mut [AxisList],
        &mut [Vec<AxisRef>],
        &mut [u64],
        &mut IndexSet<AxisRef>,
        &mut IndexMap<AxisRef, (usize, usize)>,
    ) {
        (
            &mut self.in_axes_per_dim,
            &mut self.out_axes_per_dim,
            &mut self.current_axes_per_dim,
            &mut self.capacity_per_dim,
            &mut self.in_axis_set,
            &mut self.out_axis_to_dim_and_index,
        )
    }
}

/// Plans and emits the sequence of collectives that reshards `operand` from
/// `input` to `output`, using `emitter` to materialize each collective
/// against the host's own value representation.
///
/// Precondition: `input` and `output` have equal rank and the same
/// `mesh_name` (asserted, not a recoverable error -- rejecting incompatible
/// shardings is the surrounding rewriter's job, see spec §7).
pub fn plan_reshard<E: CollectiveEmitter>(
    mesh: &Mesh,
    input: &TensorSharding,
    output: &TensorSharding,
    operand: E::Value,
    emitter: &mut E,
) -> E::Value {
    assert_eq!(
        input.rank(),
        output.rank(),
        "reshard requires equal-rank shardings"
    );
    assert_eq!(
        input.mesh_name(),
        output.mesh_name(),
        "reshard requires shardings over the same mesh"
    );
    debug_assert!(
        input.validate(mesh).is_ok() && output.validate(mesh).is_ok(),
        "sharding references an axis outside the bounds of {mesh:?}"
    );
    let rank = input.rank();

    let mut state = PlannerState::new(
        input.mesh_name().to_string(),
        input.replicated_axes.clone(),
        rank,
    );
    for dim in 0..rank {
        state.in_axes_per_dim[dim] = input.dim_shardings[dim].iter().cloned().collect();
        state.out_axes_per_dim[dim] = output.dim_shardings[dim].iter().cloned().collect();
    }
    state.current_axes_per_dim = input.dim_shardings.clone();

    align::align_sub_axes(&mut state.in_axes_per_dim, &mut state.out_axes_per_dim);
    align::remove_common_prefix(&mut state.in_axes_per_dim, &mut state.out_axes_per_dim);

    for axes in &state.in_axes_per_dim {
        state.in_axis_set.extend(axes.iter().cloned());
    }
    state.rebuild_out_axis_to_dim_and_index();

    log::debug!(
        "planning reshard over {} dim(s) on mesh {:?}",
        rank,
        mesh.axes().iter().map(|a| a.name.as_str()).collect::<Vec<_>>()
    );

    let mut value = operand;
    value = slice::try_all_slice(&mut state, value, emitter);
    value = permute::try_collective_permute(&mut state, value, emitter);
    value = all_to_all::try_all_to_alls(&mut state, value, emitter);
    value = gather::try_all_gather(&mut state, value, emitter);

    debug_assert!(
        state.is_done(),
        "planner terminated with residual in/out axes -- this is a bug, not a recoverable error"
    );
    value
}
