// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Class hierarchy errors.

use thiserror::Error;
use vcloud_meta::{RecordDefect, SubVtableKey};

/// Errors raised while building or querying a [`crate::ClassHierarchy`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChaError {
    #[error("parent {parent} of {child} has no class record")]
    UndefinedParent {
        parent: SubVtableKey,
        child: SubVtableKey,
    },

    #[error("{key} is undefined and has no defined descendant")]
    NoDefinedDescendant { key: SubVtableKey },

    #[error("malformed record for `{class}`: {defect}")]
    MalformedRecord { class: String, defect: RecordDefect },

    #[error("conflicting records for `{class}`")]
    ConflictingRecords { class: String },

    #[error("parents of {key} lie in different clouds (`{first}` and `{second}`)")]
    MixedParentClouds {
        key: SubVtableKey,
        first: String,
        second: String,
    },

    #[error("inheritance cycle through {key}")]
    Cycle { key: SubVtableKey },

    #[error("unknown sub-vtable {key}")]
    UnknownKey { key: SubVtableKey },

    #[error("`{class}` is not a cloud root")]
    NotARoot { class: String },
}
