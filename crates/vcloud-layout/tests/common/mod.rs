// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Shared fixtures for the layout integration tests.

#![allow(dead_code)]

use vcloud_cha::ClassHierarchy;
use vcloud_layout::LayoutOptions;
use vcloud_meta::{ClassRecord, SubVtableKey, SubVtableRecord, VtableElement};

/// Builds a class record sub-vtable by sub-vtable. Sub-vtables are laid
/// back to back in the original vtable.
pub struct ClassBuilder {
    record: ClassRecord,
    next: usize,
    explicit_elements: bool,
}

pub fn class(name: &str) -> ClassBuilder {
    ClassBuilder {
        record: ClassRecord::defined(name, Vec::new()),
        next: 0,
        explicit_elements: false,
    }
}

impl ClassBuilder {
    /// Append a sub-vtable of `width` slots with its address point `ap`
    /// slots after its start.
    pub fn sub(mut self, width: usize, ap: usize, parents: &[SubVtableKey]) -> Self {
        let order = self.record.sub_vtables.len();
        let mut sub = SubVtableRecord::new(order, self.next, self.next + width - 1, self.next + ap);
        for parent in parents {
            sub = sub.with_parent(parent.clone());
        }
        self.record.sub_vtables.push(sub);
        self.next += width;
        self
    }

    pub fn primary(self, width: usize, ap: usize, parents: &[&str]) -> Self {
        let parents: Vec<SubVtableKey> = parents.iter().map(|p| SubVtableKey::primary(*p)).collect();
        self.sub(width, ap, &parents)
    }

    pub fn secondary(self, width: usize, ap: usize, parent: SubVtableKey) -> Self {
        self.sub(width, ap, &[parent])
    }

    /// Name a function at `offset` from the start of the last sub-vtable.
    pub fn function(mut self, name: &str, offset: usize) -> Self {
        if let Some(sub) = self.record.sub_vtables.pop() {
            self.record.sub_vtables.push(sub.with_function(name, offset));
        }
        self
    }

    pub fn elements(mut self, elements: Vec<VtableElement>) -> Self {
        self.record.elements = elements;
        self.explicit_elements = true;
        self
    }

    pub fn undefined(mut self) -> Self {
        self.record.is_defined = false;
        self
    }

    pub fn build(mut self) -> ClassRecord {
        if !self.record.is_defined {
            self.record.elements.clear();
        } else if !self.explicit_elements {
            let name = self.record.name.clone();
            self.record.elements = (0..self.next)
                .map(|i| VtableElement::Function(format!("{}::slot{}", name, i)))
                .collect();
        }
        self.record
    }
}

/// A class with only a primary sub-vtable.
pub fn single(name: &str, width: usize, ap: usize, parents: &[&str]) -> ClassRecord {
    class(name).primary(width, ap, parents).build()
}

pub fn hierarchy(records: Vec<ClassRecord>) -> ClassHierarchy {
    ClassHierarchy::ingest(records).unwrap()
}

pub fn key(class: &str, order: usize) -> SubVtableKey {
    SubVtableKey::new(class, order)
}

/// `B` and `C` derive from `A`, `D` from both. Every class has three slots
/// with the address point in the middle.
pub fn diamond() -> Vec<ClassRecord> {
    vec![
        single("A", 3, 1, &[]),
        single("B", 3, 1, &["A"]),
        single("C", 3, 1, &["A"]),
        single("D", 3, 1, &["B", "C"]),
    ]
}

/// Two clouds, `A` and `B`. `C` derives from `A` and secondarily from
/// `B`; `E` derives from `C` and reaches `B` along two paths.
pub fn secondary_bases() -> Vec<ClassRecord> {
    vec![
        single("A", 3, 1, &[]),
        single("B", 3, 1, &[]),
        class("C")
            .primary(3, 1, &["A"])
            .secondary(3, 1, SubVtableKey::primary("B"))
            .build(),
        class("E")
            .primary(3, 1, &["C"])
            .secondary(3, 1, SubVtableKey::new("C", 1))
            .secondary(3, 1, SubVtableKey::primary("B"))
            .build(),
    ]
}

pub fn strategies() -> [LayoutOptions; 2] {
    [LayoutOptions::ordered(), LayoutOptions::interleaved()]
}
