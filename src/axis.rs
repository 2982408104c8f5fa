//! `AxisRef` and the axis algebra: overlap, containment, coexistence, and
//! the decomposition operations sub-axis alignment is built on.
//!
//! An `AxisRef` always carries an explicit `(pre_size, size)` window rather
//! than an optional sub-axis, so a whole mesh axis is just the window
//! `(pre_size: 1, size: <full axis size>)`. This keeps every algebra
//! operation below a single interval computation instead of a branch on
//! "is this a sub-axis or not".

use std::cmp::Ordering;

use crate::mesh::Mesh;

/// A reference to a mesh axis, or a contiguous sub-axis window of one.
#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub struct AxisRef {
    pub name: String,
    /// Product of the sizes of the outer factor split off to the left of
    /// this window. `1` for a whole axis.
    pub pre_size: u64,
    /// Length of this window. Equal to the full axis size for a whole axis.
    pub size: u64,
}

impl AxisRef {
    /// A reference to the whole of a named mesh axis.
    pub fn whole(name: impl Into<String>, mesh: &Mesh) -> Self {
        let name = name.into();
        let size = mesh.axis_size(&name);
        AxisRef {
            name,
            pre_size: 1,
            size,
        }
    }

    /// A reference to the sub-axis window `(pre_size, size)` of a named axis.
    pub fn sub(name: impl Into<String>, pre_size: u64, size: u64) -> Self {
        assert!(pre_size >= 1 && size >= 1, "sub-axis window must be non-empty");
        AxisRef {
            name: name.into(),
            pre_size,
            size,
        }
    }

    /// The number of devices along this window. Independent of `mesh` since
    /// the window already carries its own `size`; kept for symmetry with
    /// `full_size` and to make call sites read naturally.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The size of the full mesh axis this is a window of.
    pub fn full_size(&self, mesh: &Mesh) -> u64 {
        mesh.axis_size(&self.name)
    }

    /// True if this is a strict sub-window of its full mesh axis.
    pub fn is_sub_axis(&self, mesh: &Mesh) -> bool {
        self.pre_size != 1 || self.size != self.full_size(mesh)
    }

    fn start(&self) -> u64 {
        self.pre_size
    }

    fn end(&self) -> u64 {
        self.pre_size * self.size
    }

    /// Do `self` and `other`'s windows intersect in at least one element?
    pub fn overlaps(&self, other: &AxisRef) -> bool {
        self.name == other.name && self.start() < other.end() && other.start() < self.end()
    }

    /// Is `other`'s window a (non-strict) subset of `self`'s?
    pub fn contains(&self, other: &AxisRef) -> bool {
        self.name == other.name && self.start() <= other.start() && other.end() <= self.end()
    }

    /// Can these two axis refs coexist in the same aligned axis universe?
    ///
    /// True whenever they're disjoint, or one contains the other, or (same
    /// name, partial overlap) their windows' start offsets are in a clean
    /// divisor relationship -- the condition under which decomposing them
    /// into a shared prefix/overlap/suffix is well-formed under the
    /// power-of-two divisibility assumption this crate makes throughout
    /// (see the known limitation in `capacity.rs`).
    pub fn can_coexist(&self, other: &AxisRef) -> bool {
        if self.name != other.name {
            return true;
        }
        if self.contains(other) || other.contains(self) {
            return true;
        }
        if !self.overlaps(other) {
            return true;
        }
        let (lo, hi) = if self.pre_size <= other.pre_size {
            (self, other)
        } else {
            (other, self)
        };
        hi.pre_size % lo.pre_size == 0
    }

    /// The intersection window of `self` and `other`, if same-named and
    /// overlapping.
    ///
    /// `pre_size`/`size` compose multiplicatively (each is a product of
    /// power-of-two factors of the full axis), so unlike a plain interval
    /// the window's *size* at a given `(start, end)` boundary is `end /
    /// start`, not `end - start`.
    pub fn get_overlap(&self, other: &AxisRef) -> Option<AxisRef> {
        if self.name != other.name {
            return None;
        }
        let start = self.start().max(other.start());
        let end = self.end().min(other.end());
        (end > start).then(|| AxisRef {
            name: self.name.clone(),
            pre_size: start,
            size: end / start,
        })
    }

    /// The part of `self` strictly to the left of its overlap with `other`.
    pub fn get_prefix_without_overlap(&self, other: &AxisRef) -> Option<AxisRef> {
        let overlap = self.get_overlap(other)?;
        let prefix_end = overlap.start();
        (prefix_end > self.start()).then(|| AxisRef {
            name: self.name.clone(),
            pre_size: self.start(),
            size: prefix_end / self.start(),
        })
    }

    /// The part of `self` strictly to the right of its overlap with `other`.
    pub fn get_suffix_without_overlap(&self, other: &AxisRef) -> Option<AxisRef> {
        let overlap = self.get_overlap(other)?;
        let suffix_start = overlap.end();
        (self.end() > suffix_start).then(|| AxisRef {
            name: self.name.clone(),
            pre_size: suffix_start,
            size: self.end() / suffix_start,
        })
    }
}

/// Strict total order: by name, then by `pre_size`, then by `size` as a
/// final tie-break so the order stays strict even for two windows that
/// happen to start at the same offset before alignment has run.
impl Ord for AxisRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.pre_size.cmp(&other.pre_size))
            .then_with(|| self.size.cmp(&other.size))
    }
}

impl PartialOrd for AxisRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for AxisRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.pre_size == 1 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:({}){}", self.name, self.pre_size, self.size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh() -> Mesh {
        Mesh::new(vec![
            crate::mesh::MeshAxis::new("x", 2),
            crate::mesh::MeshAxis::new("y", 2),
            crate::mesh::MeshAxis::new("a", 8),
        ])
    }

    #[test]
    fn whole_axis_overlaps_itself() {
        let m = mesh();
        let x = AxisRef::whole("x", &m);
        assert!(x.overlaps(&x));
        assert!(x.contains(&x));
    }

    #[test]
    fn disjoint_sub_axes_do_not_overlap() {
        let a1 = AxisRef::sub("a", 1, 4);
        let a2 = AxisRef::sub("a", 4, 2);
        assert!(!a1.overlaps(&a2));
        assert!(a1.can_coexist(&a2));
    }

    #[test]
    fn partial_overlap_decomposes() {
        // Mirrors the original source's worked decomposition example:
        // "a":(1)8 and "a":(4)4 split into "a":(1)4, "a":(4)2, "a":(8)2.
        let a = AxisRef::sub("a", 1, 8);
        let b = AxisRef::sub("a", 4, 4);
        assert!(a.overlaps(&b));
        assert!(!a.contains(&b));
        assert!(!b.contains(&a));
        assert!(a.can_coexist(&b));

        let overlap = a.get_overlap(&b).unwrap();
        assert_eq!((overlap.pre_size, overlap.size), (4, 2));

        let a_prefix = a.get_prefix_without_overlap(&b).unwrap();
        assert_eq!((a_prefix.pre_size, a_prefix.size), (1, 4));
        assert!(a.get_suffix_without_overlap(&b).is_none());

        assert!(b.get_prefix_without_overlap(&a).is_none());
        let b_suffix = b.get_suffix_without_overlap(&a).unwrap();
        assert_eq!((b_suffix.pre_size, b_suffix.size), (8, 2));
    }

    #[test]
    fn different_names_always_coexist() {
        let x = AxisRef::sub("x", 1, 2);
        let y = AxisRef::sub("y", 1, 2);
        assert!(x.can_coexist(&y));
        assert!(!x.overlaps(&y));
    }

    #[test]
    fn ordering_is_strict_total() {
        let a1 = AxisRef::sub("a", 1, 4);
        let a2 = AxisRef::sub("a", 4, 2);
        let x = AxisRef::sub("x", 1, 1);
        assert!(a1 < a2);
        assert!(a2 < x);
    }
}
