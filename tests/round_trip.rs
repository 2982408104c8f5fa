//! The round-trip property of spec.md §8: planning `S_in -> S_out` then
//! `S_out -> S_in` must compose back to the identity. Since every
//! `CollectiveOp` already carries the sharding that holds right after it
//! runs, "replaying" a chain is just reading the last op's `result` (or the
//! starting sharding, for an empty chain) -- that's exactly what
//! `CollectivePlan::result` already is.

use reshard_planner::axis::AxisRef;
use reshard_planner::collective;
use reshard_planner::mesh::{Mesh, MeshAxis};
use reshard_planner::sharding::TensorSharding;

fn mesh_xyzw() -> Mesh {
    Mesh::new(vec![
        MeshAxis::new("x", 2),
        MeshAxis::new("y", 2),
        MeshAxis::new("z", 2),
        MeshAxis::new("w", 2),
    ])
}

fn round_trips(mesh: &Mesh, a: &TensorSharding, b: &TensorSharding) {
    let there = collective::plan(mesh, a, b);
    assert_eq!(&there.result, b, "forward chain did not reach the target sharding");

    let back = collective::plan(mesh, b, a);
    assert_eq!(&back.result, a, "return chain did not reach the original sharding");
}

#[test]
fn gather_then_slice_round_trips() {
    let mesh = mesh_xyzw();
    let sharded = TensorSharding::new(
        "mesh",
        vec![vec![AxisRef::whole("x", &mesh), AxisRef::whole("y", &mesh)], vec![]],
        vec![],
    );
    let replicated = TensorSharding::new("mesh", vec![vec![], vec![]], vec![]);
    round_trips(&mesh, &sharded, &replicated);
}

#[test]
fn all_to_all_round_trips() {
    let mesh = mesh_xyzw();
    let a = TensorSharding::new(
        "mesh",
        vec![vec![AxisRef::whole("x", &mesh), AxisRef::whole("y", &mesh)], vec![]],
        vec![],
    );
    let b = TensorSharding::new(
        "mesh",
        vec![vec![AxisRef::whole("x", &mesh)], vec![AxisRef::whole("y", &mesh)]],
        vec![],
    );
    round_trips(&mesh, &a, &b);
}

#[test]
fn permute_round_trips() {
    let mesh = mesh_xyzw();
    let a = TensorSharding::new(
        "mesh",
        vec![vec![AxisRef::whole("x", &mesh)], vec![AxisRef::whole("y", &mesh)]],
        vec![],
    );
    let b = TensorSharding::new(
        "mesh",
        vec![vec![AxisRef::whole("y", &mesh)], vec![]],
        vec![],
    );
    round_trips(&mesh, &a, &b);
}

#[test]
fn sub_axis_split_round_trips() {
    let mesh = Mesh::new(vec![MeshAxis::new("a", 8)]);
    let a = TensorSharding::new("mesh", vec![vec![]], vec![]);
    let b = TensorSharding::new("mesh", vec![vec![AxisRef::sub("a", 1, 4)]], vec![]);
    round_trips(&mesh, &a, &b);
}

#[test]
fn identity_round_trips_with_no_collectives_either_direction() {
    let mesh = mesh_xyzw();
    let sharding = TensorSharding::new("mesh", vec![vec![AxisRef::whole("x", &mesh)], vec![]], vec![]);

    let there = collective::plan(&mesh, &sharding, &sharding);
    let back = collective::plan(&mesh, &sharding, &sharding);
    assert!(there.is_identity());
    assert!(back.is_identity());
}
