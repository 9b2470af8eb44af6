// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Layout configuration.

use std::fmt;

use crate::LayoutError;

/// How the slots of a cloud are arranged in its new table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Strategy {
    /// Sub-vtables one after another, each address point aligned to the
    /// cloud's power-of-two alignment.
    #[default]
    Ordered,
    /// Slots of all sub-vtables interleaved around their address points.
    Interleaved,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Ordered => "ordered",
            Strategy::Interleaved => "interleaved",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOptions {
    pub strategy: Strategy,
    /// Bytes per vtable slot.
    pub word_width: u64,
}

impl LayoutOptions {
    pub const DEFAULT_WORD_WIDTH: u64 = 8;

    pub fn ordered() -> Self {
        Self::default()
    }

    pub fn interleaved() -> Self {
        Self {
            strategy: Strategy::Interleaved,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_word_width(self, word_width: u64) -> Self {
        Self { word_width, ..self }
    }

    /// Ranges and byte translation divide by the word width.
    pub(crate) fn check(self) -> Result<Self, LayoutError> {
        if self.word_width == 0 {
            return Err(LayoutError::ZeroWordWidth);
        }
        Ok(self)
    }
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Ordered,
            word_width: Self::DEFAULT_WORD_WIDTH,
        }
    }
}
