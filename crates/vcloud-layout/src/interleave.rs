// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Interleaved layout.
//!
//! The table is built outwards from the address points. The positive part
//! takes, round by round, the next slot at or after each sub-vtable's
//! address point; the negative part does the same walking backwards
//! through the slots before it, pre-padding included. Rounds visit the
//! defined members in preorder, and a member drops out once it has no
//! slots left in that direction. Negative rounds are stacked in front,
//! positive rounds appended.

use tracing::debug;
use vcloud_cha::{ClassHierarchy, Node, NodeId};

use crate::cloud::{Arrangement, Slot};

pub(crate) fn interleave_cloud(cha: &ClassHierarchy, preorder: &[NodeId], pre_pads: &[usize]) -> Arrangement {
    let members: Vec<(&Node, usize)> = preorder
        .iter()
        .zip(pre_pads)
        .map(|(&id, &pad)| (cha.node(id), pad))
        .filter(|(node, _)| node.is_defined())
        .collect();

    let negative = fill_part(&members, false);
    let positive = fill_part(&members, true);
    debug!(
        target: "vcloud::layout",
        negative_rounds = negative.len(),
        positive_rounds = positive.len(),
        "interleaved cloud"
    );

    let slots = negative
        .into_iter()
        .rev()
        .flatten()
        .chain(positive.into_iter().flatten())
        .collect();
    Arrangement { slots, alignment: 1 }
}

/// Rounds of one direction, nearest to the address points first.
fn fill_part(members: &[(&Node, usize)], positive: bool) -> Vec<Vec<Slot>> {
    let mut next: Vec<i64> = members
        .iter()
        .map(|(node, _)| {
            let ap = node.address_point() as i64;
            if positive {
                ap
            } else {
                ap - 1
            }
        })
        .collect();

    let mut rounds = Vec::new();
    loop {
        let mut round = Vec::new();
        for ((node, pad), pos) in members.iter().zip(next.iter_mut()) {
            let remaining = if positive {
                *pos <= node.end() as i64
            } else {
                *pos >= node.start() as i64 - *pad as i64
            };
            if remaining {
                round.push(Slot::Entry {
                    key: node.key().clone(),
                    index: *pos,
                });
                *pos += if positive { 1 } else { -1 };
            }
        }
        if round.is_empty() {
            break;
        }
        rounds.push(round);
    }
    rounds
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

    fn entry(class: &str, index: i64) -> Slot {
        Slot::Entry {
            key: SubVtableKey::primary(class),
            index,
        }
    }

    #[test]
    fn rounds_alternate_between_members() {
        // A: [0, 1 | 2, 3], B: [0, 1 | 2, 3, 4]
        let cha = ClassHierarchy::ingest(vec![class("A", 4, 2, &[]), class("B", 5, 2, &["A"])]).unwrap();
        let pre = cha.preorder_ids(cha.root_id("A").unwrap());
        let arrangement = interleave_cloud(&cha, &pre, &[0, 0]);

        assert_eq!(arrangement.alignment, 1);
        assert_eq!(
            arrangement.slots,
            vec![
                entry("A", 0),
                entry("B", 0),
                entry("A", 1),
                entry("B", 1),
                entry("A", 2),
                entry("B", 2),
                entry("A", 3),
                entry("B", 3),
                entry("B", 4),
            ]
        );
    }

    #[test]
    fn pre_padding_extends_the_negative_part() {
        let cha = ClassHierarchy::ingest(vec![class("A", 3, 2, &[]), class("B", 2, 0, &["A"])]).unwrap();
        let pre = cha.preorder_ids(cha.root_id("A").unwrap());
        let arrangement = interleave_cloud(&cha, &pre, &[0, 2]);

        assert_eq!(
            arrangement.slots,
            vec![
                entry("A", 0),
                entry("B", -2),
                entry("A", 1),
                entry("B", -1),
                entry("A", 2),
                entry("B", 0),
                entry("B", 1),
            ]
        );
    }
}
