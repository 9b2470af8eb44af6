// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Materialization of new tables.

use std::collections::HashSet;

use vcloud_cha::ClassHierarchy;
use vcloud_meta::{SubVtableKey, VtableElement};

use crate::cloud::{CloudLayout, Slot};
use crate::{LayoutError, VtableLayouts};

/// A virtual thunk that must be duplicated for one layout class, since its
/// body adjusts by offsets that now depend on the new table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThunkClone {
    pub original: String,
    pub clone: String,
    pub layout_class: String,
    /// Sub-vtable the thunk was found in; its vcall offsets translate
    /// through this key.
    pub key: SubVtableKey,
}

/// Contents of one new table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaterializedTable {
    pub name: String,
    /// In bytes.
    pub alignment: u64,
    pub elements: Vec<VtableElement>,
    pub thunks: Vec<ThunkClone>,
}

/// Fill a cloud's table from the original vtables. Dummy and pre-padding
/// slots become `Null`; virtual thunks are replaced by per-layout-class
/// clones.
pub fn materialize(cha: &ClassHierarchy, layout: &CloudLayout) -> Result<MaterializedTable, LayoutError> {
    let layout_class = layout.root();
    let mut elements = Vec::with_capacity(layout.len());
    let mut thunks = Vec::new();
    let mut cloned = HashSet::new();

    for slot in layout.slots() {
        let Slot::Entry { key, index } = slot else {
            elements.push(VtableElement::Null);
            continue;
        };
        let node = cha.node(cha.node_id(key)?);
        if *index < node.start() as i64 {
            elements.push(VtableElement::Null);
            continue;
        }

        let element = cha
            .record(&key.class)
            .and_then(|record| record.elements.get(*index as usize))
            .ok_or_else(|| LayoutError::violation(layout_class, key, format!("slot {} has no element", index)))?;

        match element {
            VtableElement::Function(symbol) if element.is_virtual_thunk() => {
                let clone = format!("_SVT{}{}", layout_class, symbol);
                if cloned.insert(clone.clone()) {
                    thunks.push(ThunkClone {
                        original: symbol.clone(),
                        clone: clone.clone(),
                        layout_class: layout_class.to_string(),
                        key: key.clone(),
                    });
                }
                elements.push(VtableElement::Function(clone));
            }
            other => elements.push(other.clone()),
        }
    }

    Ok(MaterializedTable {
        name: layout.table_name(),
        alignment: layout.alignment_bytes(),
        elements,
        thunks,
    })
}

impl VtableLayouts<'_> {
    /// Materialize every cloud, in root-name order.
    pub fn materialize_all(&self) -> Result<Vec<MaterializedTable>, LayoutError> {
        self.clouds()
            .map(|layout| materialize(self.hierarchy(), layout))
            .collect()
    }
}
