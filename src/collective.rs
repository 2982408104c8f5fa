//! The four collective op kinds (§9: "closed sum"), the `CollectiveEmitter`
//! builder-callback seam external IR builders plug into, and a ready-made
//! `ChainRecorder` emitter for exercising the planner without one.

use crate::axis::AxisRef;
use crate::mesh::Mesh;
use crate::sharding::TensorSharding;

/// One of the four collectives the planner can emit, tagged with the
/// per-dimension axes it moved and the sharding the tensor has after it
/// runs. A closed sum rather than an open-ended hierarchy, per §9.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectiveOp {
    AllSlice {
        axes_per_dim: Vec<Vec<AxisRef>>,
        result: TensorSharding,
    },
    CollectivePermute {
        result: TensorSharding,
    },
    AllToAll {
        src_dim: usize,
        tgt_dim: usize,
        axes: Vec<AxisRef>,
        result: TensorSharding,
    },
    AllGather {
        axes_per_dim: Vec<Vec<AxisRef>>,
        result: TensorSharding,
    },
}

impl CollectiveOp {
    /// The sharding of the tensor immediately after this op runs.
    pub fn result(&self) -> &TensorSharding {
        match self {
            CollectiveOp::AllSlice { result, .. } => result,
            CollectiveOp::CollectivePermute { result } => result,
            CollectiveOp::AllToAll { result, .. } => result,
            CollectiveOp::AllGather { result, .. } => result,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CollectiveOp::AllSlice { .. } => "all-slice",
            CollectiveOp::CollectivePermute { .. } => "collective-permute",
            CollectiveOp::AllToAll { .. } => "all-to-all",
            CollectiveOp::AllGather { .. } => "all-gather",
        }
    }
}

/// The builder callback the planner drives: one method per collective kind,
/// each handed the operand, the axes the collective moves, and the
/// resulting sharding, and returning the new value handle. Generic over the
/// embedder's own IR value representation.
pub trait CollectiveEmitter {
    type Value;

    fn emit_all_slice(
        &mut self,
        operand: Self::Value,
        axes_per_dim: &[Vec<AxisRef>],
        result_sharding: &TensorSharding,
    ) -> Self::Value;

    fn emit_collective_permute(
        &mut self,
        operand: Self::Value,
        result_sharding: &TensorSharding,
    ) -> Self::Value;

    fn emit_all_to_all(
        &mut self,
        operand: Self::Value,
        src_dim: usize,
        tgt_dim: usize,
        axes: &[AxisRef],
        result_sharding: &TensorSharding,
    ) -> Self::Value;

    fn emit_all_gather(
        &mut self,
        operand: Self::Value,
        axes_per_dim: &[Vec<AxisRef>],
        result_sharding: &TensorSharding,
    ) -> Self::Value;
}

/// A `CollectiveEmitter` with no IR of its own to build against: it just
/// records each emitted op in order and threads the resulting sharding
/// through as its `Value`. Used by the `plan()` convenience entry point,
/// tests, and the CLI, since this crate has no IR builder (that's the
/// out-of-scope surrounding compiler's job).
#[derive(Debug, Default, Clone)]
pub struct ChainRecorder {
    pub ops: Vec<CollectiveOp>,
}

impl CollectiveEmitter for ChainRecorder {
    type Value = TensorSharding;

    fn emit_all_slice(
        &mut self,
        _operand: TensorSharding,
        axes_per_dim: &[Vec<AxisRef>],
        result_sharding: &TensorSharding,
    ) -> TensorSharding {
        self.ops.push(CollectiveOp::AllSlice {
            axes_per_dim: axes_per_dim.to_vec(),
            result: result_sharding.clone(),
        });
        result_sharding.clone()
    }

    fn emit_collective_permute(
        &mut self,
        _operand: TensorSharding,
        result_sharding: &TensorSharding,
    ) -> TensorSharding {
        self.ops.push(CollectiveOp::CollectivePermute {
            result: result_sharding.clone(),
        });
        result_sharding.clone()
    }

    fn emit_all_to_all(
        &mut self,
        _operand: TensorSharding,
        src_dim: usize,
        tgt_dim: usize,
        axes: &[AxisRef],
        result_sharding: &TensorSharding,
    ) -> TensorSharding {
        self.ops.push(CollectiveOp::AllToAll {
            src_dim,
            tgt_dim,
            axes: axes.to_vec(),
            result: result_sharding.clone(),
        });
        result_sharding.clone()
    }

    fn emit_all_gather(
        &mut self,
        _operand: TensorSharding,
        axes_per_dim: &[Vec<AxisRef>],
        result_sharding: &TensorSharding,
    ) -> TensorSharding {
        self.ops.push(CollectiveOp::AllGather {
            axes_per_dim: axes_per_dim.to_vec(),
            result: result_sharding.clone(),
        });
        result_sharding.clone()
    }
}

/// The chain produced by [`crate::planner::plan_reshard`] via a
/// [`ChainRecorder`]: the ordered collectives and the final sharding they
/// reach (equal to the requested output sharding, by construction).
#[derive(Debug, Clone)]
pub struct CollectivePlan {
    pub ops: Vec<CollectiveOp>,
    pub result: TensorSharding,
}

impl CollectivePlan {
    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Plans the reshard from `input` to `output` over `mesh` and returns the
/// ordered chain of collectives as data, with no IR builder of its own --
/// the convenience entry point for callers (the CLI, tests) that just want
/// the plan rather than driving a real emitter.
pub fn plan(mesh: &Mesh, input: &TensorSharding, output: &TensorSharding) -> CollectivePlan {
    let mut recorder = ChainRecorder::default();
    let result = crate::planner::plan_reshard(mesh, input, output, input.clone(), &mut recorder);
    debug_assert_eq!(&result, output, "planner result did not reach the requested output sharding");
    CollectivePlan {
        ops: recorder.ops,
        result,
    }
}
