// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Vtable metadata records.
//!
//! These are the types the compiler front end hands to the cloud builder:
//! one `ClassRecord` per dynamic class, describing the sub-vtables inside
//! the class's vtable group, their address points, their parents, and the
//! raw slot values.

pub mod element;
pub mod record;

pub use element::VtableElement;
pub use record::{ClassRecord, FunctionEntry, RecordDefect, SubVtableRecord};

use std::fmt;

/// Identifies one sub-vtable: a class name plus the sub-vtable's order
/// inside that class's vtable group. Order 0 is the primary vtable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubVtableKey {
    pub class: String,
    pub order: usize,
}

impl SubVtableKey {
    pub fn new(class: impl Into<String>, order: usize) -> Self {
        Self {
            class: class.into(),
            order,
        }
    }

    /// Key of the primary vtable of `class`.
    pub fn primary(class: impl Into<String>) -> Self {
        Self::new(class, 0)
    }

    pub fn is_primary(&self) -> bool {
        self.order == 0
    }
}

impl fmt::Display for SubVtableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.class, self.order)
    }
}
