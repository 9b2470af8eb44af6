// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Ordered layout: sub-vtables back to back, address points aligned.

use tracing::debug;
use vcloud_cha::{ClassHierarchy, NodeId};

use crate::cloud::{Arrangement, Slot};

/// Lay the defined members of a cloud out in preorder. Every address
/// point lands on a multiple of the alignment, which is the widest member
/// of the cloud, defined or not, pre-padding included, rounded up to a
/// power of two.
pub(crate) fn order_cloud(cha: &ClassHierarchy, preorder: &[NodeId], pre_pads: &[usize]) -> Arrangement {
    let widest = preorder
        .iter()
        .zip(pre_pads)
        .map(|(&id, &pad)| cha.node(id).width() + pad)
        .max()
        .unwrap_or(1);
    let alignment = widest.next_power_of_two();

    let mut slots = Vec::new();
    for (&id, &pad) in preorder.iter().zip(pre_pads) {
        let node = cha.node(id);
        if !node.is_defined() {
            continue;
        }

        let addr_offset = node.address_offset() + pad;
        let misalign = (slots.len() + addr_offset) % alignment;
        if misalign != 0 {
            slots.resize(slots.len() + alignment - misalign, Slot::Dummy);
        }

        let first = node.start() as i64 - pad as i64;
        for index in first..=node.end() as i64 {
            slots.push(Slot::Entry {
                key: node.key().clone(),
                index,
            });
        }
    }

    debug!(target: "vcloud::layout", slots = slots.len(), alignment, "ordered cloud");
    Arrangement { slots, alignment }
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
    fn address_points_land_on_alignment() {
        let cha = ClassHierarchy::ingest(vec![class("A", 3, 2, &[]), class("B", 5, 2, &["A"])]).unwrap();
        let pre = cha.preorder_ids(cha.root_id("A").unwrap());
        let arrangement = order_cloud(&cha, &pre, &[0, 0]);

        assert_eq!(arrangement.alignment, 8);
        let a_ap = arrangement
            .slots
            .iter()
            .position(|s| *s == Slot::Entry { key: SubVtableKey::primary("A"), index: 2 })
            .unwrap();
        let b_ap = arrangement
            .slots
            .iter()
            .position(|s| *s == Slot::Entry { key: SubVtableKey::primary("B"), index: 2 })
            .unwrap();
        // Six dummies put A's address point on 8, five more put B's on 16.
        assert_eq!(a_ap, 8);
        assert_eq!(b_ap, 16);
        assert_eq!(arrangement.slots.len(), 19);
    }

    #[test]
    fn undefined_members_are_skipped() {
        let mut u = class("U", 2, 0, &["A"]);
        u.is_defined = false;
        let cha = ClassHierarchy::ingest(vec![class("A", 2, 0, &[]), u]).unwrap();
        let pre = cha.preorder_ids(cha.root_id("A").unwrap());
        let arrangement = order_cloud(&cha, &pre, &[0, 0]);
        assert_eq!(arrangement.slots.len(), 2);
        assert!(arrangement
            .slots
            .iter()
            .all(|s| matches!(s, Slot::Entry { key, .. } if key.class == "A")));
    }

    #[test]
    fn undefined_members_count_toward_alignment() {
        let mut u = class("U", 8, 2, &["A"]);
        u.is_defined = false;
        let cha = ClassHierarchy::ingest(vec![class("A", 4, 2, &[]), u]).unwrap();
        let pre = cha.preorder_ids(cha.root_id("A").unwrap());
        let arrangement = order_cloud(&cha, &pre, &[0, 0]);
        assert_eq!(arrangement.alignment, 8);
        // Six dummies, then A with its address point on slot 8.
        assert_eq!(arrangement.slots.len(), 10);
        assert!(arrangement.slots[..6].iter().all(|s| *s == Slot::Dummy));
    }
}
