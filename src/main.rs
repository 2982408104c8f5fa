use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use reshard_planner::collective::{self, CollectiveOp};
use reshard_planner::descriptor::{parse_mesh, parse_sharding};

/// Plans a minimal sequence of collectives (all-slice, collective-permute,
/// all-to-all, all-gather) that reshards a tensor from one device-mesh
/// sharding to another.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Mesh descriptor, e.g. "x=2,y=2,z=2,w=2"
    #[clap(long = "mesh", value_name = "AXIS=SIZE,...")]
    mesh: String,

    /// Input sharding, e.g. "[x,y];[]"
    #[clap(long = "from", value_name = "SHARDING")]
    from: String,

    /// Output sharding, e.g. "[x];[y]"
    #[clap(long = "to", value_name = "SHARDING")]
    to: String,

    /// Quiet mode: suppress the per-collective report, print only the count
    #[clap(short = 'q', long = "quiet")]
    quiet: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mesh = parse_mesh(&args.mesh).context("parsing --mesh")?;
    let input = parse_sharding(&args.from, "mesh", &mesh).context("parsing --from")?;
    let output = parse_sharding(&args.to, "mesh", &mesh).context("parsing --to")?;

    if input.rank() != output.rank() {
        anyhow::bail!(
            "incompatible shardings: --from has rank {} but --to has rank {}",
            input.rank(),
            output.rank()
        );
    }

    let start = Instant::now();
    let plan = collective::plan(&mesh, &input, &output);
    let elapsed = start.elapsed();

    if args.quiet {
        println!("{}", plan.ops.len());
        return Ok(());
    }

    if plan.is_identity() {
        println!("identity: no collectives needed");
    } else {
        for (i, op) in plan.ops.iter().enumerate() {
            println!("{}: {}", i + 1, describe(op));
        }
    }
    log::info!(
        "planned {} collective(s) in {:.3}ms",
        plan.ops.len(),
        elapsed.as_secs_f64() * 1000.0
    );

    Ok(())
}

fn describe(op: &CollectiveOp) -> String {
    match op {
        CollectiveOp::AllSlice { axes_per_dim, .. } => {
            format!("all-slice {axes_per_dim:?}")
        }
        CollectiveOp::CollectivePermute { result } => {
            format!("collective-permute -> {:?}", result.dim_shardings)
        }
        CollectiveOp::AllToAll {
            src_dim,
            tgt_dim,
            axes,
            ..
        } => format!("all-to-all {src_dim} -> {tgt_dim}: {axes:?}"),
        CollectiveOp::AllGather { axes_per_dim, .. } => {
            format!("all-gather {axes_per_dim:?}")
        }
    }
}
