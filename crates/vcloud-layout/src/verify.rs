// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Layout verification. Every check here is a hard invariant; a failure
//! means the layout builder is wrong, not the input.

use std::collections::{BTreeMap, HashMap};

use vcloud_cha::{ClassHierarchy, NodeId};
use vcloud_meta::SubVtableKey;

use crate::cloud::{Arrangement, CloudLayout, Slot};
use crate::options::Strategy;
use crate::padding::forward_edges;
use crate::LayoutError;

/// Check that the slot stream holds every slot of every defined member
/// exactly once, in the original order, and nothing else.
pub(crate) fn check_stream(
    cha: &ClassHierarchy,
    root: &str,
    preorder: &[NodeId],
    pre_pads: &[usize],
    arrangement: &Arrangement,
    strategy: Strategy,
) -> Result<(), LayoutError> {
    let members: HashMap<&SubVtableKey, usize> = preorder
        .iter()
        .enumerate()
        .map(|(i, &id)| (cha.node(id).key(), i))
        .collect();

    let mut placed: HashMap<&SubVtableKey, BTreeMap<i64, usize>> = HashMap::new();
    for (pos, slot) in arrangement.slots.iter().enumerate() {
        let Slot::Entry { key, index } = slot else {
            continue;
        };
        let Some(&i) = members.get(key) else {
            return Err(LayoutError::violation(root, key, "not a member of the cloud"));
        };
        let node = cha.node(preorder[i]);
        if !node.is_defined() {
            return Err(LayoutError::violation(root, key, "undefined sub-vtable placed in the table"));
        }
        let first = node.start() as i64 - pre_pads[i] as i64;
        if *index < first || *index > node.end() as i64 {
            return Err(LayoutError::violation(
                root,
                key,
                format!("slot {} outside [{}, {}]", index, first, node.end()),
            ));
        }
        if let Some(prev) = placed.entry(key).or_default().insert(*index, pos) {
            return Err(LayoutError::violation(
                root,
                key,
                format!("slot {} placed twice, at {} and {}", index, prev, pos),
            ));
        }
    }

    for (i, &id) in preorder.iter().enumerate() {
        let node = cha.node(id);
        if !node.is_defined() {
            continue;
        }
        let key = node.key();
        let expected = node.width() + pre_pads[i];
        let positions = placed.get(key).map(|m| m.values().copied().collect::<Vec<_>>());
        let positions = positions.unwrap_or_default();

        if positions.len() != expected {
            return Err(LayoutError::violation(
                root,
                key,
                format!("{} of {} slots placed", positions.len(), expected),
            ));
        }
        if positions.windows(2).any(|w| w[0] >= w[1]) {
            return Err(LayoutError::violation(root, key, "slot order not preserved"));
        }
        if strategy == Strategy::Ordered {
            if positions[expected - 1] - positions[0] + 1 != expected {
                return Err(LayoutError::violation(root, key, "slots not contiguous"));
            }
            let ap = positions[pre_pads[i] + node.address_offset()];
            if ap % arrangement.alignment != 0 {
                return Err(LayoutError::violation(
                    root,
                    key,
                    format!("address point at {} is not {}-slot aligned", ap, arrangement.alignment),
                ));
            }
        }
    }
    Ok(())
}

/// Check that every child still looks like its parent around the address
/// point: the parent's range fits inside the child's, and each slot of the
/// parent sits at the same distance from the address point in both.
///
/// Only forward edges are checked; a child reached first through another
/// parent gives no such guarantee.
pub(crate) fn check_abi(cha: &ClassHierarchy, layout: &CloudLayout) -> Result<(), LayoutError> {
    let preorder = layout.preorder();
    for (i, j) in forward_edges(cha, preorder) {
        let parent = cha.node(preorder[i]);
        let child = cha.node(preorder[j]);
        let (Some(pp), Some(cp)) = (layout.placement(parent.key()), layout.placement(child.key())) else {
            // Undefined on one side: nothing of it is in the table.
            continue;
        };

        let parent_pre = parent.address_offset() + pp.pre_pad;
        let child_pre = child.address_offset() + cp.pre_pad;
        let parent_post = parent.end() - parent.address_point();
        let child_post = child.end() - child.address_point();
        if parent_pre > child_pre || parent_post > child_post {
            return Err(LayoutError::violation(
                layout.root(),
                child.key(),
                format!(
                    "does not contain parent {} ({}+{} slots around the address point, child has {}+{})",
                    parent.key(),
                    parent_pre,
                    parent_post,
                    child_pre,
                    child_post
                ),
            ));
        }

        let parent_ap = pp.positions[parent_pre] as i64;
        let child_ap = cp.positions[child_pre] as i64;
        for (e, &pos) in pp.positions.iter().enumerate() {
            let rel = e as i64 - parent_pre as i64;
            let child_pos = cp.positions[(child_pre as i64 + rel) as usize] as i64;
            if pos as i64 - parent_ap != child_pos - child_ap {
                return Err(LayoutError::violation(
                    layout.root(),
                    child.key(),
                    format!(
                        "relative slot {} of parent {} moves to {}, child has it at {}",
                        rel,
                        parent.key(),
                        pos as i64 - parent_ap,
                        child_pos - child_ap
                    ),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcloud_meta::{ClassRecord, SubVtableRecord, VtableElement};

    fn hierarchy() -> ClassHierarchy {
        let a = ClassRecord::defined("A", vec![VtableElement::Null; 2])
            .with_sub_vtable(SubVtableRecord::new(0, 0, 1, 0));
        let b = ClassRecord::defined("B", vec![VtableElement::Null; 3])
            .with_sub_vtable(SubVtableRecord::new(0, 0, 2, 0).with_parent(SubVtableKey::primary("A")));
        ClassHierarchy::ingest(vec![a, b]).unwrap()
    }

    fn entry(class: &str, index: i64) -> Slot {
        Slot::Entry {
            key: SubVtableKey::primary(class),
            index,
        }
    }

    fn check(slots: Vec<Slot>, alignment: usize, strategy: Strategy) -> Result<(), LayoutError> {
        let cha = hierarchy();
        let pre = cha.preorder_ids(cha.root_id("A").unwrap());
        check_stream(&cha, "A", &pre, &[0, 0], &Arrangement { slots, alignment }, strategy)
    }

    #[test]
    fn accepts_a_well_formed_stream() {
        let slots = vec![
            entry("A", 0),
            entry("A", 1),
            Slot::Dummy,
            Slot::Dummy,
            entry("B", 0),
            entry("B", 1),
            entry("B", 2),
        ];
        assert_eq!(check(slots, 4, Strategy::Ordered), Ok(()));
    }

    #[test]
    fn rejects_duplicates() {
        let slots = vec![entry("A", 0), entry("A", 0), entry("A", 1), entry("B", 0), entry("B", 1), entry("B", 2)];
        let err = check(slots, 1, Strategy::Interleaved).unwrap_err();
        assert!(matches!(err, LayoutError::InvariantViolation { ref detail, .. } if detail.contains("twice")));
    }

    #[test]
    fn rejects_missing_slots() {
        let slots = vec![entry("A", 0), entry("A", 1), entry("B", 0), entry("B", 2)];
        let err = check(slots, 1, Strategy::Interleaved).unwrap_err();
        assert!(matches!(
            err,
            LayoutError::InvariantViolation { ref key, .. } if *key == SubVtableKey::primary("B")
        ));
    }

    #[test]
    fn rejects_reordering() {
        let slots = vec![entry("A", 1), entry("A", 0), entry("B", 0), entry("B", 1), entry("B", 2)];
        let err = check(slots, 1, Strategy::Interleaved).unwrap_err();
        assert!(matches!(err, LayoutError::InvariantViolation { ref detail, .. } if detail.contains("order")));
    }

    #[test]
    fn ordered_layouts_must_be_contiguous() {
        let slots = vec![entry("A", 0), entry("B", 0), entry("A", 1), entry("B", 1), entry("B", 2)];
        assert_eq!(check(slots.clone(), 1, Strategy::Interleaved), Ok(()));
        let err = check(slots, 1, Strategy::Ordered).unwrap_err();
        assert!(matches!(err, LayoutError::InvariantViolation { ref detail, .. } if detail.contains("contiguous")));
    }

    #[test]
    fn rejects_strangers() {
        let slots = vec![entry("A", 0), entry("A", 1), entry("Z", 0)];
        let err = check(slots, 1, Strategy::Interleaved).unwrap_err();
        assert!(matches!(err, LayoutError::InvariantViolation { ref detail, .. } if detail.contains("member")));
    }
}
