//! The named, ordered device mesh that shardings are defined over.

/// A single named dimension of a device mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshAxis {
    pub name: String,
    pub size: u64,
}

impl MeshAxis {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        assert!(size > 0, "mesh axis size must be positive");
        MeshAxis {
            name: name.into(),
            size,
        }
    }
}

/// A named, ordered list of mesh axes, optionally with explicit device ids.
///
/// Axis sizes are expected to be powers of two in the fully-supported case
/// (see the divisibility limitation noted throughout `capacity.rs`), but
/// this type itself doesn't enforce that -- the planner degrades to
/// capacity-1 (no slicing benefit) rather than misbehaving when it isn't.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mesh {
    axes: Vec<MeshAxis>,
    device_ids: Option<Vec<u64>>,
}

impl Mesh {
    pub fn new(axes: Vec<MeshAxis>) -> Self {
        Mesh {
            axes,
            device_ids: None,
        }
    }

    pub fn with_device_ids(axes: Vec<MeshAxis>, device_ids: Vec<u64>) -> Self {
        Mesh {
            axes,
            device_ids: Some(device_ids),
        }
    }

    pub fn axes(&self) -> &[MeshAxis] {
        &self.axes
    }

    pub fn device_ids(&self) -> Option<&[u64]> {
        self.device_ids.as_deref()
    }

    /// The full size of the named axis, i.e. the size it was declared with.
    pub fn axis_size(&self, name: &str) -> u64 {
        self.axes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.size)
            .unwrap_or_else(|| panic!("mesh has no axis named {name:?}"))
    }
}
