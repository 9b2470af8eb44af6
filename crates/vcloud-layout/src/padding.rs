// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Pre-padding: make every child's pre-address-point region cover its
//! parent's.

use std::collections::HashMap;

use vcloud_cha::{ClassHierarchy, NodeId};

/// Parent/child edges whose child comes later in `preorder`, as pairs of
/// preorder positions. Edges into a node already reached through another
/// parent are left out.
pub(crate) fn forward_edges(cha: &ClassHierarchy, preorder: &[NodeId]) -> Vec<(usize, usize)> {
    let position: HashMap<NodeId, usize> = preorder
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();

    let mut edges = Vec::new();
    for (i, &parent) in preorder.iter().enumerate() {
        for child in cha.node(parent).children() {
            let j = position[child];
            if j > i {
                edges.push((i, j));
            }
        }
    }
    edges
}

/// Pre-padding slot counts, indexed like `preorder`.
pub(crate) fn pre_padding(cha: &ClassHierarchy, preorder: &[NodeId]) -> Vec<usize> {
    let mut pads = vec![0; preorder.len()];
    // Edges come grouped by parent in preorder, so a parent's padding is
    // final before it is pushed down to its children.
    for (i, j) in forward_edges(cha, preorder) {
        let parent_pre = cha.node(preorder[i]).address_offset() + pads[i];
        let child_pre = cha.node(preorder[j]).address_offset();
        pads[j] = pads[j].max(parent_pre.saturating_sub(child_pre));
    }
    pads
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcloud_meta::{ClassRecord, SubVtableKey, SubVtableRecord, VtableElement};

    fn class(name: &str, width: usize, ap: usize, parents: &[&str]) -> ClassRecord {
        let mut sub = SubVtableRecord::new(0, 0, width - 1, ap);
        for p in parents {
            sub = sub.with_parent(SubVtableKey::primary(*p));
        }
        ClassRecord::defined(name, vec![VtableElement::Null; width]).with_sub_vtable(sub)
    }

    #[test]
    fn children_inherit_the_deepest_prefix() {
        // A has three slots before its address point; B only one, C none.
        let cha = ClassHierarchy::ingest(vec![
            class("A", 5, 3, &[]),
            class("B", 3, 1, &["A"]),
            class("C", 2, 0, &["B"]),
        ])
        .unwrap();
        let pre = cha.preorder_ids(cha.root_id("A").unwrap());
        assert_eq!(pre_padding(&cha, &pre), vec![0, 2, 3]);
    }

    #[test]
    fn back_edges_are_not_forward() {
        let cha = ClassHierarchy::ingest(vec![
            class("A", 2, 0, &[]),
            class("B", 2, 0, &["A"]),
            class("C", 2, 0, &["A"]),
            class("D", 2, 0, &["B", "C"]),
        ])
        .unwrap();
        let pre = cha.preorder_ids(cha.root_id("A").unwrap());
        // Preorder A, B, D, C: C -> D points backwards.
        assert_eq!(forward_edges(&cha, &pre), vec![(0, 1), (0, 3), (1, 2)]);
    }
}
