// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Class and sub-vtable records.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::{SubVtableKey, VtableElement};

/// A virtual function slot inside a sub-vtable.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionEntry {
    /// Mangled function name.
    pub name: String,
    /// Slot offset from the sub-vtable's start.
    pub offset: usize,
}

/// One sub-vtable of a class's vtable group.
///
/// `start`, `end` and `address_point` are slot indices into the class's
/// original vtable; the range is inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubVtableRecord {
    pub order: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub parents: BTreeSet<SubVtableKey>,
    pub start: usize,
    pub end: usize,
    pub address_point: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub functions: Vec<FunctionEntry>,
}

impl SubVtableRecord {
    pub fn new(order: usize, start: usize, end: usize, address_point: usize) -> Self {
        Self {
            order,
            parents: BTreeSet::new(),
            start,
            end,
            address_point,
            functions: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: SubVtableKey) -> Self {
        self.parents.insert(parent);
        self
    }

    pub fn with_function(mut self, name: impl Into<String>, offset: usize) -> Self {
        self.functions.push(FunctionEntry {
            name: name.into(),
            offset,
        });
        self
    }

    /// Number of slots in the sub-vtable.
    pub fn width(&self) -> usize {
        self.end - self.start + 1
    }

    /// Slots between the sub-vtable's start and its address point.
    pub fn address_offset(&self) -> usize {
        self.address_point - self.start
    }

    pub fn contains(&self, slot: usize) -> bool {
        self.start <= slot && slot <= self.end
    }
}

/// Everything the front end knows about one dynamic class.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassRecord {
    pub name: String,
    pub sub_vtables: Vec<SubVtableRecord>,
    /// Original vtable contents. Empty for undefined classes.
    #[cfg_attr(feature = "serde", serde(default))]
    pub elements: Vec<VtableElement>,
    /// False when the vtable is emitted in another module and only the
    /// declaration is visible.
    #[cfg_attr(feature = "serde", serde(default = "defined_by_default"))]
    pub is_defined: bool,
}

#[cfg(feature = "serde")]
fn defined_by_default() -> bool {
    true
}

/// Structural problems in a single class record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordDefect {
    #[error("class has no sub-vtables")]
    NoPrimary,

    #[error("sub-vtable at position {position} has order {order}")]
    OrderMismatch { position: usize, order: usize },

    #[error("sub-vtable {order} ends at {end} before it starts at {start}")]
    InvertedRange { order: usize, start: usize, end: usize },

    #[error("address point {address_point} of sub-vtable {order} is outside [{start}, {end}]")]
    AddressPointOutOfRange {
        order: usize,
        start: usize,
        end: usize,
        address_point: usize,
    },

    #[error("sub-vtable {order} starts at {start}, inside the previous one ending at {prev_end}")]
    Overlap {
        order: usize,
        start: usize,
        prev_end: usize,
    },

    #[error("secondary sub-vtable {order} has no parent")]
    MissingParents { order: usize },

    #[error("function `{name}` at offset {offset} lies outside sub-vtable {order}")]
    FunctionOutOfRange {
        order: usize,
        name: String,
        offset: usize,
    },

    #[error("vtable has {len} elements but sub-vtables reach slot {last}")]
    ShortElements { len: usize, last: usize },
}

impl ClassRecord {
    /// A class whose vtable body is available.
    pub fn defined(name: impl Into<String>, elements: Vec<VtableElement>) -> Self {
        Self {
            name: name.into(),
            sub_vtables: Vec::new(),
            elements,
            is_defined: true,
        }
    }

    /// A class known only by declaration.
    pub fn undefined(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sub_vtables: Vec::new(),
            elements: Vec::new(),
            is_defined: false,
        }
    }

    pub fn with_sub_vtable(mut self, sub: SubVtableRecord) -> Self {
        self.sub_vtables.push(sub);
        self
    }

    pub fn key(&self, order: usize) -> SubVtableKey {
        SubVtableKey::new(self.name.clone(), order)
    }

    pub fn sub_vtable(&self, order: usize) -> Option<&SubVtableRecord> {
        self.sub_vtables.get(order)
    }

    /// Check the per-record invariants. Cross-record checks (parents
    /// exist, no cycles) belong to the cloud builder.
    pub fn validate(&self) -> Result<(), RecordDefect> {
        if self.sub_vtables.is_empty() {
            return Err(RecordDefect::NoPrimary);
        }

        let mut prev_end: Option<usize> = None;
        for (position, sub) in self.sub_vtables.iter().enumerate() {
            if sub.order != position {
                return Err(RecordDefect::OrderMismatch {
                    position,
                    order: sub.order,
                });
            }
            if sub.end < sub.start {
                return Err(RecordDefect::InvertedRange {
                    order: sub.order,
                    start: sub.start,
                    end: sub.end,
                });
            }
            if !sub.contains(sub.address_point) {
                return Err(RecordDefect::AddressPointOutOfRange {
                    order: sub.order,
                    start: sub.start,
                    end: sub.end,
                    address_point: sub.address_point,
                });
            }
            if let Some(prev_end) = prev_end {
                if sub.start <= prev_end {
                    return Err(RecordDefect::Overlap {
                        order: sub.order,
                        start: sub.start,
                        prev_end,
                    });
                }
            }
            if sub.order > 0 && sub.parents.is_empty() {
                return Err(RecordDefect::MissingParents { order: sub.order });
            }
            if let Some(func) = sub.functions.iter().find(|f| f.offset >= sub.width()) {
                return Err(RecordDefect::FunctionOutOfRange {
                    order: sub.order,
                    name: func.name.clone(),
                    offset: func.offset,
                });
            }
            prev_end = Some(sub.end);
        }

        if self.is_defined {
            let last = self.sub_vtables.iter().map(|s| s.end).max().unwrap_or(0);
            if self.elements.len() <= last {
                return Err(RecordDefect::ShortElements {
                    len: self.elements.len(),
                    last,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elems(n: usize) -> Vec<VtableElement> {
        (0..n).map(|i| VtableElement::Function(format!("f{}", i))).collect()
    }

    #[test]
    fn well_formed_record_validates() {
        let rec = ClassRecord::defined("D", elems(8))
            .with_sub_vtable(SubVtableRecord::new(0, 0, 4, 2).with_parent(SubVtableKey::primary("B")))
            .with_sub_vtable(SubVtableRecord::new(1, 5, 7, 7).with_parent(SubVtableKey::primary("C")));
        assert_eq!(rec.validate(), Ok(()));
        assert_eq!(rec.sub_vtables[0].width(), 5);
        assert_eq!(rec.sub_vtables[0].address_offset(), 2);
    }

    #[test]
    fn address_point_must_lie_inside_range() {
        let rec = ClassRecord::defined("A", elems(4)).with_sub_vtable(SubVtableRecord::new(0, 1, 3, 0));
        assert!(matches!(
            rec.validate(),
            Err(RecordDefect::AddressPointOutOfRange { order: 0, .. })
        ));
    }

    #[test]
    fn secondary_without_parent_is_rejected() {
        let rec = ClassRecord::defined("A", elems(6))
            .with_sub_vtable(SubVtableRecord::new(0, 0, 2, 2))
            .with_sub_vtable(SubVtableRecord::new(1, 3, 5, 5));
        assert_eq!(rec.validate(), Err(RecordDefect::MissingParents { order: 1 }));
    }

    #[test]
    fn overlapping_sub_vtables_are_rejected() {
        let rec = ClassRecord::defined("A", elems(6))
            .with_sub_vtable(SubVtableRecord::new(0, 0, 3, 2))
            .with_sub_vtable(SubVtableRecord::new(1, 3, 5, 5).with_parent(SubVtableKey::primary("B")));
        assert!(matches!(rec.validate(), Err(RecordDefect::Overlap { order: 1, .. })));
    }

    #[test]
    fn orders_must_be_dense() {
        let rec = ClassRecord::defined("A", elems(4)).with_sub_vtable(SubVtableRecord::new(1, 0, 3, 2));
        assert_eq!(
            rec.validate(),
            Err(RecordDefect::OrderMismatch { position: 0, order: 1 })
        );
    }

    #[test]
    fn defined_class_needs_all_elements() {
        let rec = ClassRecord::defined("A", elems(3)).with_sub_vtable(SubVtableRecord::new(0, 0, 3, 2));
        assert_eq!(rec.validate(), Err(RecordDefect::ShortElements { len: 3, last: 3 }));

        let undefined = ClassRecord::undefined("A").with_sub_vtable(SubVtableRecord::new(0, 0, 3, 2));
        assert_eq!(undefined.validate(), Ok(()));
    }

    #[test]
    fn function_offsets_are_bounded() {
        let rec = ClassRecord::defined("A", elems(4))
            .with_sub_vtable(SubVtableRecord::new(0, 0, 3, 2).with_function("_ZN1A1fEv", 4));
        assert!(matches!(rec.validate(), Err(RecordDefect::FunctionOutOfRange { offset: 4, .. })));
    }
}
