//! Appending an axis to an axis list, merging it into the trailing entry
//! when the two are contiguous sub-axes of the same mesh axis instead of
//! growing the list.

use crate::axis::AxisRef;

/// Push `axis` onto `axes`, merging with the last entry in place when it is
/// the same mesh axis and its window picks up exactly where the last one's
/// window ends (`last.pre_size * last.size == axis.pre_size`).
///
/// This is how a dimension's axis list stays in its canonical, maximally
/// coalesced form as the planner incrementally slices, gathers, and
/// redistributes axes onto it -- two adjacent sub-axis windows of the same
/// mesh axis are indistinguishable from one another's combined window, so
/// representing them separately would just be noise that later alignment
/// and capacity checks would have to re-discover.
pub fn add_axis_or_merge(axes: &mut Vec<AxisRef>, axis: AxisRef) {
    if let Some(last) = axes.last_mut() {
        if last.name == axis.name && last.pre_size * last.size == axis.pre_size {
            last.size *= axis.size;
            return;
        }
    }
    axes.push(axis);
}
