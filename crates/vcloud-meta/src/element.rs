// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Raw vtable slot values.

/// One slot of an original vtable.
///
/// The engine never interprets these beyond recognizing virtual thunks;
/// they are carried through so a new table can be materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VtableElement {
    /// Empty slot (also used for padding in new tables).
    Null,
    /// Offset-to-top, virtual-base offset or vcall offset.
    Offset(i64),
    /// Pointer to the class's type info.
    Rtti(String),
    /// Pointer to a function or thunk.
    Function(String),
}

impl VtableElement {
    /// Virtual thunks adjust `this` through a vcall offset read from the
    /// vtable, so their bodies depend on the table layout.
    pub fn is_virtual_thunk(&self) -> bool {
        match self {
            VtableElement::Function(name) => name.starts_with("_ZTv") || name.starts_with("_ZTcv"),
            _ => false,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            VtableElement::Rtti(name) | VtableElement::Function(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_virtual_thunks() {
        assert!(VtableElement::Function("_ZTv0_n24_N1D1fEv".into()).is_virtual_thunk());
        assert!(VtableElement::Function("_ZTcv0_n24_h0_N1D1gEv".into()).is_virtual_thunk());
        assert!(!VtableElement::Function("_ZThn8_N1D1fEv".into()).is_virtual_thunk());
        assert!(!VtableElement::Function("_ZN1D1fEv".into()).is_virtual_thunk());
        assert!(!VtableElement::Rtti("_ZTv".into()).is_virtual_thunk());
        assert!(!VtableElement::Offset(-8).is_virtual_thunk());
    }
}
