// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Vtable cloud layout.
//!
//! Every cloud of a [`ClassHierarchy`] gets one new table holding the slots
//! of all its defined sub-vtables, arranged so that the address points of a
//! class and its descendants fall into a small number of aligned ranges.
//! On top of a layout this crate translates old vtable indices to new ones,
//! computes the valid-address ranges for call-site checks, and materializes
//! the new tables.

pub mod cloud;
pub mod error;
pub mod materialize;
pub mod options;
pub mod ranges;
pub mod translate;

mod interleave;
mod order;
mod padding;
mod verify;

pub use cloud::{CloudLayout, Placement, Slot};
pub use error::LayoutError;
pub use materialize::{materialize, MaterializedTable, ThunkClone};
pub use options::{LayoutOptions, Strategy};
pub use ranges::{Precision, RangeEntry, RangeSet, RangeTuple};

use std::collections::HashMap;
use std::ops::Range;

use indexmap::IndexMap;
use tracing::{debug, info};
use vcloud_cha::{ClassHierarchy, NodeId};

/// Lay out the cloud rooted at `root` and verify the result.
pub fn build_layout(cha: &ClassHierarchy, root: &str, options: LayoutOptions) -> Result<CloudLayout, LayoutError> {
    let options = options.check()?;
    let root_id = cha.root_id(root)?;
    let preorder = cha.preorder_ids(root_id);
    let pre_pads = padding::pre_padding(cha, &preorder);

    let arrangement = match options.strategy {
        Strategy::Ordered => order::order_cloud(cha, &preorder, &pre_pads),
        Strategy::Interleaved => interleave::interleave_cloud(cha, &preorder, &pre_pads),
    };
    verify::check_stream(cha, root, &preorder, &pre_pads, &arrangement, options.strategy)?;

    let layout = CloudLayout::new(cha, root, options, preorder, &pre_pads, arrangement);
    verify::check_abi(cha, &layout)?;

    debug!(
        target: "vcloud::layout",
        root,
        strategy = %options.strategy,
        members = layout.preorder().len(),
        slots = layout.len(),
        alignment = layout.alignment_bytes(),
        "cloud laid out"
    );
    Ok(layout)
}

/// Layouts of every cloud in a hierarchy, plus the preorder ranges used for
/// call-site checks.
///
/// Borrows the hierarchy, so it cannot change while layouts exist.
#[derive(Debug)]
pub struct VtableLayouts<'h> {
    cha: &'h ClassHierarchy,
    options: LayoutOptions,
    clouds: IndexMap<String, CloudLayout>,
    ranges: HashMap<NodeId, Vec<Range<usize>>>,
}

impl<'h> VtableLayouts<'h> {
    pub fn build(cha: &'h ClassHierarchy, options: LayoutOptions) -> Result<Self, LayoutError> {
        let options = options.check()?;
        let mut clouds = IndexMap::new();
        let mut ranges = HashMap::new();

        for root in cha.roots() {
            let layout = build_layout(cha, root, options)?;
            let cloud_ranges = ranges::preorder_ranges(cha, layout.preorder());
            ranges::verify_ranges(cha, &layout, &cloud_ranges)?;
            ranges.extend(cloud_ranges);
            clouds.insert(root.to_string(), layout);
        }

        info!(
            target: "vcloud::layout",
            clouds = clouds.len(),
            strategy = %options.strategy,
            slots = clouds.values().map(CloudLayout::len).sum::<usize>(),
            "all clouds laid out"
        );
        Ok(Self {
            cha,
            options,
            clouds,
            ranges,
        })
    }

    pub fn hierarchy(&self) -> &'h ClassHierarchy {
        self.cha
    }

    pub fn options(&self) -> LayoutOptions {
        self.options
    }

    pub fn cloud(&self, root: &str) -> Option<&CloudLayout> {
        self.clouds.get(root)
    }

    /// Layouts in root-name order.
    pub fn clouds(&self) -> impl Iterator<Item = &CloudLayout> {
        self.clouds.values()
    }

    /// The layout hosting node `id`.
    pub fn cloud_of(&self, id: NodeId) -> Result<&CloudLayout, LayoutError> {
        let root = self.cha.node(self.cha.cloud_root_id(id));
        self.clouds.get(&root.key().class).ok_or_else(|| {
            LayoutError::violation(&root.key().class, self.cha.node(id).key(), "cloud was never laid out")
        })
    }

    /// Drop every layout.
    pub fn clear(&mut self) {
        self.clouds.clear();
        self.ranges.clear();
    }

    pub(crate) fn preorder_ranges_of(&self, id: NodeId) -> &[Range<usize>] {
        self.ranges.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// New slot position of a defined node's address point.
    pub(crate) fn address_point_slot(&self, layout: &CloudLayout, id: NodeId) -> Result<usize, LayoutError> {
        let key = self.cha.node(id).key();
        layout
            .address_point_position(self.cha, key)
            .ok_or_else(|| LayoutError::violation(layout.root(), key, "no placement for a defined sub-vtable"))
    }
}
