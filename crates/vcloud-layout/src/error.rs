// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Layout errors.

use thiserror::Error;
use vcloud_cha::ChaError;
use vcloud_meta::SubVtableKey;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// A built layout broke one of its structural guarantees. Always fatal.
    #[error("layout of cloud `{cloud}` is broken at {key}: {detail}")]
    InvariantViolation {
        cloud: String,
        key: SubVtableKey,
        detail: String,
    },

    #[error("offset {offset} is outside the {len} slots of {key}")]
    IndexOutOfRange {
        key: SubVtableKey,
        offset: i64,
        len: usize,
    },

    #[error("byte offset {bytes} into {key} is not a multiple of the {word_width}-byte word")]
    Misaligned {
        key: SubVtableKey,
        bytes: i64,
        word_width: u64,
    },

    #[error("word width must be positive")]
    ZeroWordWidth,

    #[error("no virtual function `{name}` in `{class}`")]
    UnknownFunction { class: String, name: String },

    #[error(transparent)]
    Cha(#[from] ChaError),
}

impl LayoutError {
    pub(crate) fn violation(cloud: &str, key: &SubVtableKey, detail: impl Into<String>) -> Self {
        LayoutError::InvariantViolation {
            cloud: cloud.to_string(),
            key: key.clone(),
            detail: detail.into(),
        }
    }
}
