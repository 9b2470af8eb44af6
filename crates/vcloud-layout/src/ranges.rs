// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Valid-address ranges for virtual call checks.
//!
//! A call site whose static type is `T` may only load a vtable pointer that
//! points at the address point of `T` or of one of its descendants. Within
//! a cloud those address points occupy a few runs of the new table; each
//! run is described by a [`RangeTuple`].

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use tracing::{debug, warn};
use vcloud_cha::{ChaError, ClassHierarchy, NodeId, UpcastPath};
use vcloud_meta::SubVtableKey;

use crate::cloud::CloudLayout;
use crate::{LayoutError, VtableLayouts};

/// How closely a range follows the set of legal targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// One range from the lowest to the highest descendant address point.
    #[default]
    Single,
    /// One range per run of descendants whose address points sit one
    /// alignment apart in the table.
    Precise,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Precision::Single => "single",
            Precision::Precise => "precise",
        })
    }
}

/// Addresses `start, start + alignment, ...` below `start + width`. All
/// values are byte offsets from the start of the cloud's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeTuple {
    pub start: u64,
    pub width: u64,
    pub alignment: u64,
}

impl RangeTuple {
    pub fn admits(&self, addr: u64) -> bool {
        addr >= self.start && addr - self.start < self.width && (addr - self.start) % self.alignment == 0
    }

    /// The check as emitted at a call site: rotating the distance right by
    /// log2(alignment) pushes misaligned low bits to the top, so one
    /// unsigned compare covers both bounds and alignment.
    pub fn admits_rotated(&self, addr: u64) -> bool {
        let diff = addr.wrapping_sub(self.start);
        diff.rotate_right(self.alignment.trailing_zeros()) < self.slots()
    }

    /// Number of admitted addresses.
    pub fn slots(&self) -> u64 {
        self.width / self.alignment
    }
}

/// Union of ranges, widest first.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeSet(pub Vec<RangeTuple>);

impl RangeSet {
    pub fn admits(&self, addr: u64) -> bool {
        self.0.iter().any(|r| r.admits(addr))
    }

    pub fn tuples(&self) -> &[RangeTuple] {
        &self.0
    }
}

/// Runtime range table entry for the primary vtable of one class.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeEntry {
    pub class: String,
    /// Name of the table the range points into.
    pub table: String,
    pub start: u64,
    pub width: u64,
    pub alignment: u64,
}

// ============================================================================
// Preorder ranges
// ============================================================================

/// For every member of a cloud, the runs of the cloud's preorder that hold
/// its descendants (itself included), as half-open index ranges.
pub(crate) fn preorder_ranges(cha: &ClassHierarchy, preorder: &[NodeId]) -> HashMap<NodeId, Vec<Range<usize>>> {
    let position: HashMap<NodeId, usize> = preorder
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();
    let mut ranges = HashMap::new();
    if let Some(&root) = preorder.first() {
        collect_ranges(cha, root, &position, &mut ranges);
    }
    ranges
}

fn collect_ranges(
    cha: &ClassHierarchy,
    id: NodeId,
    position: &HashMap<NodeId, usize>,
    ranges: &mut HashMap<NodeId, Vec<Range<usize>>>,
) {
    if ranges.contains_key(&id) {
        return;
    }
    let children = cha.node(id).children();
    for &child in children {
        collect_ranges(cha, child, position, ranges);
    }

    let own = position[&id];
    let mut all = vec![own..own + 1];
    for child in children {
        all.extend(ranges[child].iter().cloned());
    }
    all.sort_by_key(|r| (r.start, r.end));

    let mut coalesced: Vec<Range<usize>> = Vec::new();
    for r in all {
        match coalesced.last_mut() {
            Some(last) if r.start <= last.end => last.end = last.end.max(r.end),
            _ => coalesced.push(r),
        }
    }
    ranges.insert(id, coalesced);
}

/// Every member's ranges are disjoint and cover exactly its descendants.
pub(crate) fn verify_ranges(
    cha: &ClassHierarchy,
    layout: &CloudLayout,
    ranges: &HashMap<NodeId, Vec<Range<usize>>>,
) -> Result<(), LayoutError> {
    let preorder = layout.preorder();
    let position: HashMap<NodeId, usize> = preorder
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();

    for &id in preorder {
        let key = cha.node(id).key();
        let mine = ranges.get(&id).map(Vec::as_slice).unwrap_or_default();

        let mut last_end: Option<usize> = None;
        for r in mine {
            if last_end.is_some_and(|end| end >= r.start) {
                return Err(LayoutError::violation(layout.root(), key, "preorder ranges overlap"));
            }
            last_end = Some(r.end);
        }

        let descendants = cha.preorder_ids(id);
        let total: usize = mine.iter().map(|r| r.len()).sum();
        if total != descendants.len() {
            return Err(LayoutError::violation(
                layout.root(),
                key,
                format!("preorder ranges span {} nodes, {} descendants", total, descendants.len()),
            ));
        }
        if let Some(missed) = descendants
            .iter()
            .find(|d| !mine.iter().any(|r| r.contains(&position[*d])))
        {
            return Err(LayoutError::violation(
                layout.root(),
                key,
                format!("descendant {} outside the preorder ranges", cha.node(*missed).key()),
            ));
        }
    }
    Ok(())
}

// ============================================================================
// Range queries
// ============================================================================

impl VtableLayouts<'_> {
    /// Valid targets for a call through `key`. `None` when the key is
    /// unknown or nothing defined descends from it; such a call can never
    /// pass a check.
    pub fn range_for(&self, key: &SubVtableKey, precision: Precision) -> Result<Option<RangeSet>, LayoutError> {
        let cha = self.hierarchy();
        let Ok(id) = cha.node_id(key) else {
            debug!(target: "vcloud::ranges", %key, "no range for unknown sub-vtable");
            return Ok(None);
        };
        if let Err(err) = cha.representative_id(id) {
            return match err {
                ChaError::NoDefinedDescendant { .. } => {
                    debug!(target: "vcloud::ranges", %key, "no defined descendant");
                    Ok(None)
                }
                other => Err(other.into()),
            };
        }
        let layout = self.cloud_of(id)?;

        let tuples = match precision {
            Precision::Single => {
                let mut aps = Vec::new();
                for n in cha.preorder_ids(id) {
                    if cha.node(n).is_defined() {
                        aps.push(self.address_point_slot(layout, n)?);
                    }
                }
                let lo = aps.iter().copied().min().unwrap_or(0);
                let hi = aps.iter().copied().max().unwrap_or(0);
                vec![span(layout, lo, hi, cha.cloud_size_of(id))]
            }
            Precision::Precise => {
                let preorder = layout.preorder();
                let step = layout.alignment();
                let mut tuples = Vec::new();
                for r in self.preorder_ranges_of(id) {
                    // (first address point, last address point, count)
                    let mut run: Option<(usize, usize, usize)> = None;
                    for &n in &preorder[r.clone()] {
                        if !cha.node(n).is_defined() {
                            continue;
                        }
                        let ap = self.address_point_slot(layout, n)?;
                        run = match run {
                            Some((first, last, count)) if ap == last + step => Some((first, ap, count + 1)),
                            Some((first, _, count)) => {
                                tuples.push(aligned_run(layout, first, count));
                                Some((ap, ap, 1))
                            }
                            None => Some((ap, ap, 1)),
                        };
                    }
                    if let Some((first, _, count)) = run {
                        tuples.push(aligned_run(layout, first, count));
                    }
                }
                tuples.sort_by(|a, b| b.width.cmp(&a.width));
                tuples
            }
        };
        Ok(Some(RangeSet(tuples)))
    }

    /// Precise range for a call site whose receiver is statically `static_class`
    /// but known to be at least `precise_class`. Falls back to the static
    /// class's range when the upcast path is not unique.
    pub fn range_for_site(&self, static_class: &str, precise_class: &str) -> Result<Option<RangeSet>, LayoutError> {
        let cha = self.hierarchy();
        match cha.sub_vtable_index(precise_class, static_class) {
            UpcastPath::Unique(order) => {
                self.range_for(&SubVtableKey::new(precise_class, order), Precision::Precise)
            }
            path => {
                warn!(
                    target: "vcloud::ranges",
                    static_class,
                    precise_class,
                    ?path,
                    "no unique upcast path, using the static type's range"
                );
                self.range_for(&SubVtableKey::primary(static_class), Precision::Precise)
            }
        }
    }

    /// One entry per class whose primary vtable has a defined
    /// representative.
    pub fn runtime_table(&self) -> Result<Vec<RangeEntry>, LayoutError> {
        let cha = self.hierarchy();
        let mut entries = Vec::new();
        for record in cha.records() {
            let key = record.key(0);
            let Some(set) = self.range_for(&key, Precision::Single)? else {
                continue;
            };
            let table = self.cloud_of(cha.node_id(&key)?)?.table_name();
            for tuple in set.0 {
                entries.push(RangeEntry {
                    class: record.name.clone(),
                    table: table.clone(),
                    start: tuple.start,
                    width: tuple.width,
                    alignment: tuple.alignment,
                });
            }
        }
        Ok(entries)
    }
}

/// Range over the address points in slots `lo..=hi`. Never narrower than
/// `count` aligned slots, and wide enough to bridge any alignment gaps the
/// ordered layout left in between. The gaps are admitted too.
fn aligned_run(layout: &CloudLayout, first: usize, count: usize) -> RangeTuple {
    let alignment = layout.alignment_bytes();
    RangeTuple {
        start: first as u64 * layout.word_width(),
        width: count as u64 * alignment,
        alignment,
    }
}

fn span(layout: &CloudLayout, lo: usize, hi: usize, count: usize) -> RangeTuple {
    let alignment = layout.alignment_bytes();
    let word = layout.word_width();
    let width = (count as u64 * alignment).max((hi - lo) as u64 * word + alignment);
    RangeTuple {
        start: lo as u64 * word,
        width,
        alignment,
    }
}
