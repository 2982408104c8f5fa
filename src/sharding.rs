//! `TensorSharding`: how a single tensor's dimensions and replication are
//! distributed across a named mesh.

use crate::axis::AxisRef;
use crate::mesh::Mesh;

/// The sharding of one tensor over a named mesh: for each dimension, the
/// ordered list of axes (outer to inner) that dimension is split across,
/// plus the axes that are replicated across every device instead.
///
/// The mesh itself is referenced by name rather than held inline, mirroring
/// the original attribute's symbol-or-inline mesh reference -- this crate
/// has no symbol table, so callers thread the resolved `Mesh` alongside
/// wherever an axis's size is actually needed (`sharded_size`, alignment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSharding {
    pub mesh_name: String,
    pub dim_shardings: Vec<Vec<AxisRef>>,
    pub replicated_axes: Vec<AxisRef>,
}

impl TensorSharding {
    pub fn new(
        mesh_name: impl Into<String>,
        dim_shardings: Vec<Vec<AxisRef>>,
        replicated_axes: Vec<AxisRef>,
    ) -> Self {
        TensorSharding {
            mesh_name: mesh_name.into(),
            dim_shardings,
            replicated_axes,
        }
    }

    /// A fully-replicated sharding of the given rank: no dimension is split.
    pub fn fully_replicated(mesh_name: impl Into<String>, rank: usize) -> Self {
        TensorSharding {
            mesh_name: mesh_name.into(),
            dim_shardings: vec![Vec::new(); rank],
            replicated_axes: Vec::new(),
        }
    }

    pub fn mesh_name(&self) -> &str {
        &self.mesh_name
    }

    pub fn rank(&self) -> usize {
        self.dim_shardings.len()
    }

    pub fn axes_for_dim(&self, dim: usize) -> &[AxisRef] {
        &self.dim_shardings[dim]
    }

    /// Product of the sizes of the axes sharding `dim`.
    pub fn sharded_size(&self, dim: usize) -> u64 {
        self.dim_shardings[dim].iter().map(|a| a.size()).product()
    }

    /// Every axis this sharding uses, across all dims and replication --
    /// handy for building the `in_axis_set` the planner needs up front.
    pub fn all_axes(&self) -> impl Iterator<Item = &AxisRef> {
        self.dim_shardings
            .iter()
            .flatten()
            .chain(self.replicated_axes.iter())
    }

    /// Sanity-check that every axis named here actually exists on `mesh`
    /// and that no axis is used twice (sharding the same mesh axis across
    /// two different tensor dims, or both sharding and replicating it, is
    /// never valid).
    pub fn validate(&self, mesh: &Mesh) -> Result<(), String> {
        let mut seen: Vec<&AxisRef> = Vec::new();
        for axis in self.all_axes() {
            let full = mesh.axis_size(&axis.name);
            if axis.pre_size * axis.size > full {
                return Err(format!(
                    "axis {axis} exceeds the bounds of mesh axis {:?} (size {full})",
                    axis.name
                ));
            }
            for other in &seen {
                if axis.overlaps(other) {
                    return Err(format!("axis {axis} overlaps already-used axis {other}"));
                }
            }
            seen.push(axis);
        }
        Ok(())
    }
}
