// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The laid-out table of one cloud.

use std::fmt;

use indexmap::IndexMap;
use vcloud_cha::{ClassHierarchy, NodeId};
use vcloud_meta::SubVtableKey;

use crate::options::{LayoutOptions, Strategy};

/// One slot of a cloud's new table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Slot {
    /// Alignment filler.
    Dummy,
    /// Slot `index` of the class's original vtable. Indices below the
    /// sub-vtable's start are pre-padding and hold no value.
    Entry { key: SubVtableKey, index: i64 },
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Dummy => f.write_str("<dummy>"),
            Slot::Entry { key, index } => write!(f, "{}[{}]", key, index),
        }
    }
}

/// Output of a layout strategy.
#[derive(Debug, Clone)]
pub(crate) struct Arrangement {
    pub slots: Vec<Slot>,
    /// In slots.
    pub alignment: usize,
}

/// Where one sub-vtable ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub node: NodeId,
    /// Pre-padding slots in front of the sub-vtable's start.
    pub pre_pad: usize,
    /// New positions of old slots `start - pre_pad ..= end`.
    pub positions: Vec<usize>,
}

impl Placement {
    /// New positions of old slots `start..=end`.
    pub fn new_indices(&self) -> &[usize] {
        &self.positions[self.pre_pad..]
    }
}

/// The new table of one cloud, with every sub-vtable's placement in it.
#[derive(Debug, Clone)]
pub struct CloudLayout {
    root: String,
    strategy: Strategy,
    word_width: u64,
    alignment: usize,
    preorder: Vec<NodeId>,
    slots: Vec<Slot>,
    placements: IndexMap<SubVtableKey, Placement>,
}

impl CloudLayout {
    /// Assemble a layout from a slot stream. The stream must already have
    /// passed the stream checks in `verify`.
    pub(crate) fn new(
        cha: &ClassHierarchy,
        root: &str,
        options: LayoutOptions,
        preorder: Vec<NodeId>,
        pre_pads: &[usize],
        arrangement: Arrangement,
    ) -> Self {
        let Arrangement { slots, alignment } = arrangement;
        let mut placements: IndexMap<SubVtableKey, Placement> = preorder
            .iter()
            .enumerate()
            .filter(|&(_, &id)| cha.node(id).is_defined())
            .map(|(i, &id)| {
                let node = cha.node(id);
                let placement = Placement {
                    node: id,
                    pre_pad: pre_pads[i],
                    positions: vec![0; pre_pads[i] + node.width()],
                };
                (node.key().clone(), placement)
            })
            .collect();

        for (pos, slot) in slots.iter().enumerate() {
            if let Slot::Entry { key, index } = slot {
                if let Some(p) = placements.get_mut(key) {
                    let first = cha.node(p.node).start() as i64 - p.pre_pad as i64;
                    p.positions[(index - first) as usize] = pos;
                }
            }
        }

        Self {
            root: root.to_string(),
            strategy: options.strategy,
            word_width: options.word_width,
            alignment,
            preorder,
            slots,
            placements,
        }
    }

    /// Root class of the cloud.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn word_width(&self) -> u64 {
        self.word_width
    }

    /// Alignment of address points, in slots. Always a power of two.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn alignment_bytes(&self) -> u64 {
        self.alignment as u64 * self.word_width
    }

    /// Cloud members in preorder from the root.
    pub fn preorder(&self) -> &[NodeId] {
        &self.preorder
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Name of the global holding the new table.
    pub fn table_name(&self) -> String {
        format!("_SD{}", self.root)
    }

    pub fn placement(&self, key: &SubVtableKey) -> Option<&Placement> {
        self.placements.get(key)
    }

    /// Placements of the defined sub-vtables, in preorder.
    pub fn placements(&self) -> impl Iterator<Item = (&SubVtableKey, &Placement)> {
        self.placements.iter()
    }

    pub fn new_indices(&self, key: &SubVtableKey) -> Option<&[usize]> {
        self.placements.get(key).map(Placement::new_indices)
    }

    /// New slot position of a sub-vtable's address point.
    pub fn address_point_position(&self, cha: &ClassHierarchy, key: &SubVtableKey) -> Option<usize> {
        let placement = self.placements.get(key)?;
        let node = cha.node(placement.node);
        Some(placement.new_indices()[node.address_offset()])
    }

    /// Byte offset of a sub-vtable's address point from the table start.
    pub fn address_point_offset(&self, cha: &ClassHierarchy, key: &SubVtableKey) -> Option<u64> {
        self.address_point_position(cha, key)
            .map(|pos| pos as u64 * self.word_width)
    }

    /// One line per slot: `position : slot`.
    pub fn dump(&self) -> String {
        let mut out = format!(
            "{} ({}, {} slots, align {}):\n",
            self.table_name(),
            self.strategy,
            self.slots.len(),
            self.alignment_bytes()
        );
        for (i, slot) in self.slots.iter().enumerate() {
            out.push_str(&format!("{:5} : {}\n", i, slot));
        }
        out
    }
}
