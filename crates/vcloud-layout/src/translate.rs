// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Old vtable index to new table index.

use tracing::trace;
use vcloud_meta::SubVtableKey;

use crate::{LayoutError, VtableLayouts};

impl VtableLayouts<'_> {
    /// Translate an index into `key`'s original sub-vtable.
    ///
    /// With `relative`, `offset` counts from the address point (as in a
    /// vcall) and the result counts from the new address point. Otherwise
    /// `offset` counts from the sub-vtable's start and the result is an
    /// absolute position in the cloud's table.
    ///
    /// Undefined sub-vtables are translated through their first defined
    /// descendant, which shares their layout.
    pub fn translate(&self, key: &SubVtableKey, offset: i64, relative: bool) -> Result<i64, LayoutError> {
        let cha = self.hierarchy();
        let id = cha.representative_id(cha.node_id(key)?)?;
        let node = cha.node(id);
        let layout = self.cloud_of(id)?;
        let indices = layout
            .new_indices(node.key())
            .ok_or_else(|| LayoutError::violation(layout.root(), node.key(), "no placement for a defined sub-vtable"))?;

        let out_of_range = || LayoutError::IndexOutOfRange {
            key: key.clone(),
            offset,
            len: indices.len(),
        };

        let translated = if relative {
            let ap = node.address_offset() as i64;
            let full = ap + offset;
            if full < 0 || full >= indices.len() as i64 {
                return Err(out_of_range());
            }
            indices[full as usize] as i64 - indices[ap as usize] as i64
        } else {
            if offset < 0 || offset >= indices.len() as i64 {
                return Err(out_of_range());
            }
            indices[offset as usize] as i64
        };

        trace!(target: "vcloud::layout", %key, offset, relative, translated, "translated index");
        Ok(translated)
    }

    /// [`Self::translate`] for relative byte offsets, as compilers emit
    /// them for vcall and vbase offsets.
    pub fn translate_bytes(&self, key: &SubVtableKey, bytes: i64) -> Result<i64, LayoutError> {
        let word = self.options().word_width as i64;
        if bytes % word != 0 {
            return Err(LayoutError::Misaligned {
                key: key.clone(),
                bytes,
                word_width: self.options().word_width,
            });
        }
        Ok(self.translate(key, bytes / word, true)? * word)
    }

    /// New slot of a virtual function, relative to the new address point of
    /// the sub-vtable declaring it.
    pub fn translate_function(&self, class: &str, name: &str) -> Result<i64, LayoutError> {
        let (key, offset) = self
            .hierarchy()
            .function_slot(class, name)
            .ok_or_else(|| LayoutError::UnknownFunction {
                class: class.to_string(),
                name: name.to_string(),
            })?;
        self.translate(&key, offset, true)
    }
}
