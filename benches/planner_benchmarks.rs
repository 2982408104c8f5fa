/// Performance benchmarks for the reshard planner.
///
/// Run with: cargo bench
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use reshard_planner::axis::AxisRef;
use reshard_planner::collective;
use reshard_planner::mesh::{Mesh, MeshAxis};
use reshard_planner::sharding::TensorSharding;

fn mesh_of_rank(rank: usize) -> Mesh {
    let axes = (0..rank)
        .map(|i| MeshAxis::new(format!("axis{i}"), 2))
        .collect();
    Mesh::new(axes)
}

/// A sharding where dim `d` is sharded by `axis(d+1 mod rank)`: every
/// dimension has an axis but none matches its own input-side assignment, so
/// the planner has real all-to-all/permute work to do rather than hitting
/// the `S_in == S_out` fast path.
fn rotated_sharding(mesh: &Mesh, rank: usize, rotate_by: usize) -> TensorSharding {
    let dims = (0..rank)
        .map(|d| vec![AxisRef::whole(format!("axis{}", (d + rotate_by) % rank), mesh)])
        .collect();
    TensorSharding::new("mesh", dims, vec![])
}

fn bench_plan_by_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_by_rank");

    for rank in [2usize, 3, 4, 6] {
        group.bench_with_input(BenchmarkId::from_parameter(rank), &rank, |b, &rank| {
            let mesh = mesh_of_rank(rank);
            let input = rotated_sharding(&mesh, rank, 0);
            let output = rotated_sharding(&mesh, rank, 1);

            b.iter(|| {
                let plan = collective::plan(black_box(&mesh), black_box(&input), black_box(&output));
                black_box(plan.ops.len())
            });
        });
    }

    group.finish();
}

fn bench_plan_identity(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_identity");

    for rank in [2usize, 4, 6] {
        group.bench_with_input(BenchmarkId::from_parameter(rank), &rank, |b, &rank| {
            let mesh = mesh_of_rank(rank);
            let sharding = rotated_sharding(&mesh, rank, 0);

            b.iter(|| {
                let plan = collective::plan(black_box(&mesh), black_box(&sharding), black_box(&sharding));
                black_box(plan.ops.len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_plan_by_rank, bench_plan_identity);
criterion_main!(benches);
