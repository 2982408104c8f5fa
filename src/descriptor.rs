//! A small textual notation for meshes and shardings, parsed with `nom`.
//! Not a protocol (§6): this exists purely so the CLI has something to
//! read from argv without reaching for a heavier format.
//!
//! Mesh: `x=2,y=2,z=2,w=2`.
//!
//! Sharding: one `[axis,axis,...]` block per dimension, separated by `;`,
//! optionally followed by `|axis,axis,...` for replicated axes. An axis is
//! either a bare mesh-axis name (`x`) or a sub-axis window `x:(4)2`
//! (`preSize` then `size`). Examples:
//!
//! - `[x,y];[]` -- dim 0 sharded on `x` then `y`, dim 1 unsharded.
//! - `[x:(1)4];[]|z` -- dim 0 sharded on the first half of `x`, `z`
//!   replicated, dim 1 unsharded.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1},
    combinator::{map, map_res, opt, recognize},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair},
    IResult,
};

use anyhow::{anyhow, Result};

use crate::axis::AxisRef;
use crate::mesh::{Mesh, MeshAxis};
use crate::sharding::TensorSharding;

fn ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(alpha1, many0(alt((alphanumeric1, tag("_"))))))(input)
}

fn number(input: &str) -> IResult<&str, u64> {
    map_res(digit1, str::parse)(input)
}

fn mesh_axis(input: &str) -> IResult<&str, MeshAxis> {
    map(
        separated_pair(ident, char('='), number),
        |(name, size)| MeshAxis::new(name, size),
    )(input)
}

fn mesh(input: &str) -> IResult<&str, Mesh> {
    map(separated_list1(char(','), mesh_axis), Mesh::new)(input)
}

/// An axis as written in a sharding descriptor, before it's resolved
/// against a mesh: either a bare name (a whole mesh axis) or an explicit
/// `name:(preSize)size` sub-axis window.
enum ParsedAxis<'a> {
    Whole(&'a str),
    Sub(&'a str, u64, u64),
}

impl ParsedAxis<'_> {
    fn resolve(self, mesh: &Mesh) -> AxisRef {
        match self {
            ParsedAxis::Whole(name) => AxisRef::whole(name, mesh),
            ParsedAxis::Sub(name, pre_size, size) => AxisRef::sub(name, pre_size, size),
        }
    }
}

/// `name` or `name:(preSize)size`.
fn axis_ref(input: &str) -> IResult<&str, ParsedAxis<'_>> {
    map(
        pair(
            ident,
            opt(preceded(
                char(':'),
                preceded(char('('), pair(number, preceded(char(')'), number))),
            )),
        ),
        |(name, window)| match window {
            Some((pre_size, size)) => ParsedAxis::Sub(name, pre_size, size),
            None => ParsedAxis::Whole(name),
        },
    )(input)
}

fn axis_list(input: &str) -> IResult<&str, Vec<ParsedAxis<'_>>> {
    delimited(char('['), separated_list0(char(','), axis_ref), char(']'))(input)
}

fn replicated_axes(input: &str) -> IResult<&str, Vec<ParsedAxis<'_>>> {
    preceded(char('|'), separated_list1(char(','), axis_ref))(input)
}

fn sharding_body(input: &str) -> IResult<&str, (Vec<Vec<ParsedAxis<'_>>>, Vec<ParsedAxis<'_>>)> {
    pair(
        separated_list1(char(';'), axis_list),
        map(opt(replicated_axes), |r| r.unwrap_or_default()),
    )(input)
}

/// Parses a mesh descriptor like `x=2,y=2,z=2,w=2`.
pub fn parse_mesh(input: &str) -> Result<Mesh> {
    let (rest, parsed) =
        mesh(input.trim()).map_err(|e| anyhow!("invalid mesh descriptor {input:?}: {e}"))?;
    if !rest.is_empty() {
        return Err(anyhow!("unexpected trailing input in mesh descriptor: {rest:?}"));
    }
    Ok(parsed)
}

/// Parses a sharding descriptor like `[x,y];[]` against an already-parsed
/// mesh, resolving bare axis names (no explicit `:(preSize)size` window)
/// to whole-axis references sized from `mesh`.
pub fn parse_sharding(input: &str, mesh_name: &str, mesh: &Mesh) -> Result<TensorSharding> {
    let (rest, (dim_shardings, replicated_axes)) = sharding_body(input.trim())
        .map_err(|e| anyhow!("invalid sharding descriptor {input:?}: {e}"))?;
    if !rest.is_empty() {
        return Err(anyhow!(
            "unexpected trailing input in sharding descriptor: {rest:?}"
        ));
    }

    let dim_shardings: Vec<Vec<AxisRef>> = dim_shardings
        .into_iter()
        .map(|dim| dim.into_iter().map(|a| a.resolve(mesh)).collect())
        .collect();
    let replicated_axes: Vec<AxisRef> = replicated_axes.into_iter().map(|a| a.resolve(mesh)).collect();

    let sharding = TensorSharding::new(mesh_name, dim_shardings, replicated_axes);
    sharding
        .validate(mesh)
        .map_err(|e| anyhow!("sharding descriptor {input:?} is invalid: {e}"))?;
    Ok(sharding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mesh_descriptor() {
        let mesh = parse_mesh("x=2,y=2,z=2,w=2").unwrap();
        assert_eq!(mesh.axes().len(), 4);
        assert_eq!(mesh.axis_size("w"), 2);
    }

    #[test]
    fn parses_whole_axis_sharding() {
        let mesh = parse_mesh("x=2,y=2").unwrap();
        let sharding = parse_sharding("[x];[y]", "mesh", &mesh).unwrap();
        assert_eq!(sharding.rank(), 2);
        assert_eq!(sharding.axes_for_dim(0), &[AxisRef::sub("x", 1, 2)]);
        assert_eq!(sharding.axes_for_dim(1), &[AxisRef::sub("y", 1, 2)]);
    }

    #[test]
    fn parses_sub_axis_and_replicated() {
        let mesh = parse_mesh("a=8,z=2").unwrap();
        let sharding = parse_sharding("[a:(1)4];[]|z", "mesh", &mesh).unwrap();
        assert_eq!(sharding.axes_for_dim(0), &[AxisRef::sub("a", 1, 4)]);
        assert!(sharding.axes_for_dim(1).is_empty());
        assert_eq!(sharding.replicated_axes, vec![AxisRef::sub("z", 1, 2)]);
    }

    #[test]
    fn rejects_overlapping_sharding() {
        let mesh = parse_mesh("a=8").unwrap();
        let err = parse_sharding("[a:(1)4,a:(2)4]", "mesh", &mesh).unwrap_err();
        assert!(err.to_string().contains("invalid"));
    }
}
