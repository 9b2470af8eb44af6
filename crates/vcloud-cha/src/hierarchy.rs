// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The sub-vtable inheritance DAG.

use std::collections::{BTreeSet, HashMap, VecDeque};

use indexmap::IndexMap;
use tracing::{debug, info};
use vcloud_meta::{ClassRecord, SubVtableKey};

use crate::ChaError;

/// Index of a node in the hierarchy arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One sub-vtable in the DAG.
#[derive(Debug, Clone)]
pub struct Node {
    key: SubVtableKey,
    start: usize,
    end: usize,
    address_point: usize,
    is_defined: bool,
    parents: Vec<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn key(&self) -> &SubVtableKey {
        &self.key
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn address_point(&self) -> usize {
        self.address_point
    }

    /// Slots in `start..=end`.
    pub fn width(&self) -> usize {
        self.end - self.start + 1
    }

    /// Slots before the address point.
    pub fn address_offset(&self) -> usize {
        self.address_point - self.start
    }

    pub fn is_defined(&self) -> bool {
        self.is_defined
    }

    /// Parents in key order.
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// Children in key order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Result of looking for the sub-vtable of a derived class that an upcast
/// to a base class lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpcastPath {
    /// Exactly one sub-vtable of the derived class descends from the base.
    Unique(usize),
    /// Several do; the upcast is ambiguous.
    Ambiguous,
    /// None do.
    Unrelated,
}

/// The class hierarchy: every sub-vtable as a node, parent/child edges,
/// and the cloud each node belongs to.
#[derive(Debug, Default)]
pub struct ClassHierarchy {
    records: IndexMap<String, ClassRecord>,
    nodes: Vec<Node>,
    index: HashMap<SubVtableKey, NodeId>,
    roots: BTreeSet<String>,
    cloud_roots: Vec<NodeId>,
    cloud_sizes: Vec<usize>,
}

// ============================================================================
// Construction
// ============================================================================

impl ClassHierarchy {
    /// Build the hierarchy from class records. Ingestion order does not
    /// affect the result.
    pub fn ingest<I>(records: I) -> Result<Self, ChaError>
    where
        I: IntoIterator<Item = ClassRecord>,
    {
        let mut cha = Self::default();
        cha.collect_records(records)?;
        cha.create_nodes();
        cha.link_parents()?;
        let topo = cha.topological_order()?;
        cha.assign_clouds(&topo)?;
        cha.cloud_sizes = (0..cha.nodes.len())
            .map(|i| cha.calculate_cloud_size(NodeId(i as u32)))
            .collect();

        info!(
            target: "vcloud::cha",
            classes = cha.records.len(),
            sub_vtables = cha.nodes.len(),
            clouds = cha.roots.len(),
            "class hierarchy built"
        );
        Ok(cha)
    }

    fn collect_records<I>(&mut self, records: I) -> Result<(), ChaError>
    where
        I: IntoIterator<Item = ClassRecord>,
    {
        for record in records {
            record
                .validate()
                .map_err(|defect| ChaError::MalformedRecord {
                    class: record.name.clone(),
                    defect,
                })?;

            if let Some(existing) = self.records.get_mut(&record.name) {
                if *existing == record {
                    debug!(target: "vcloud::cha", class = %record.name, "merged duplicate record");
                    continue;
                }
                // A declaration and a definition of the same vtable group.
                if existing.sub_vtables == record.sub_vtables && existing.is_defined != record.is_defined {
                    if record.is_defined {
                        *existing = record;
                    }
                    continue;
                }
                return Err(ChaError::ConflictingRecords { class: record.name });
            }
            self.records.insert(record.name.clone(), record);
        }
        self.records.sort_keys();
        Ok(())
    }

    /// Nodes are numbered in key order, so id order is key order.
    fn create_nodes(&mut self) {
        for record in self.records.values() {
            for sub in &record.sub_vtables {
                let id = NodeId(self.nodes.len() as u32);
                let key = record.key(sub.order);
                self.index.insert(key.clone(), id);
                self.nodes.push(Node {
                    key,
                    start: sub.start,
                    end: sub.end,
                    address_point: sub.address_point,
                    is_defined: record.is_defined,
                    parents: Vec::new(),
                    children: Vec::new(),
                });
            }
        }
    }

    fn link_parents(&mut self) -> Result<(), ChaError> {
        for record in self.records.values() {
            for sub in &record.sub_vtables {
                let key = record.key(sub.order);
                let child = self.index[&key];
                for parent in &sub.parents {
                    let Some(&pid) = self.index.get(parent) else {
                        return Err(ChaError::UndefinedParent {
                            parent: parent.clone(),
                            child: key,
                        });
                    };
                    self.nodes[child.index()].parents.push(pid);
                    self.nodes[pid.index()].children.push(child);
                }
            }
        }

        for node in &mut self.nodes {
            node.parents.sort();
            node.children.sort();
            if node.key.is_primary() && node.parents.is_empty() {
                self.roots.insert(node.key.class.clone());
            }
        }
        Ok(())
    }

    /// Parents before children. Any node left over sits on a cycle or
    /// below one, since every parentless node is a root.
    fn topological_order(&self) -> Result<Vec<NodeId>, ChaError> {
        let mut pending: Vec<usize> = self.nodes.iter().map(|n| n.parents.len()).collect();
        let mut queue: VecDeque<NodeId> = (0..self.nodes.len())
            .filter(|&i| pending[i] == 0)
            .map(|i| NodeId(i as u32))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for &child in &self.nodes[id.index()].children {
                pending[child.index()] -= 1;
                if pending[child.index()] == 0 {
                    queue.push_back(child);
                }
            }
        }

        if let Some(stuck) = pending.iter().position(|&p| p > 0) {
            return Err(ChaError::Cycle {
                key: self.nodes[stuck].key.clone(),
            });
        }
        Ok(order)
    }

    fn assign_clouds(&mut self, topo: &[NodeId]) -> Result<(), ChaError> {
        self.cloud_roots = (0..self.nodes.len()).map(|i| NodeId(i as u32)).collect();

        for &id in topo {
            let node = &self.nodes[id.index()];
            let Some((&first, rest)) = node.parents.split_first() else {
                continue;
            };
            let root = self.cloud_roots[first.index()];
            if let Some(&other) = rest.iter().find(|p| self.cloud_roots[p.index()] != root) {
                let other_root = self.cloud_roots[other.index()];
                return Err(ChaError::MixedParentClouds {
                    key: node.key.clone(),
                    first: self.nodes[root.index()].key.class.clone(),
                    second: self.nodes[other_root.index()].key.class.clone(),
                });
            }
            self.cloud_roots[id.index()] = root;
        }
        Ok(())
    }

    /// Drop every structure.
    pub fn clear(&mut self) {
        self.records.clear();
        self.nodes.clear();
        self.index.clear();
        self.roots.clear();
        self.cloud_roots.clear();
        self.cloud_sizes.clear();
    }
}

// ============================================================================
// Node-level queries
// ============================================================================

impl ClassHierarchy {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_id(&self, key: &SubVtableKey) -> Result<NodeId, ChaError> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| ChaError::UnknownKey { key: key.clone() })
    }

    /// Id of the primary sub-vtable of a root class.
    pub fn root_id(&self, class: &str) -> Result<NodeId, ChaError> {
        if !self.is_root(class) {
            return Err(ChaError::NotARoot {
                class: class.to_string(),
            });
        }
        self.node_id(&SubVtableKey::primary(class))
    }

    /// Depth-first preorder from `root`, children in key order, each node
    /// visited once.
    pub fn preorder_ids(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if visited[id.index()] {
                continue;
            }
            visited[id.index()] = true;
            order.push(id);
            for &child in self.nodes[id.index()].children.iter().rev() {
                if !visited[child.index()] {
                    stack.push(child);
                }
            }
        }
        order
    }

    /// Count the defined nodes reachable from `id`, itself included.
    pub fn calculate_cloud_size(&self, id: NodeId) -> usize {
        self.preorder_ids(id)
            .into_iter()
            .filter(|&n| self.nodes[n.index()].is_defined)
            .count()
    }

    /// Memoized [`Self::calculate_cloud_size`].
    pub fn cloud_size_of(&self, id: NodeId) -> usize {
        self.cloud_sizes[id.index()]
    }

    /// The root node of the cloud `id` belongs to.
    pub fn cloud_root_id(&self, id: NodeId) -> NodeId {
        self.cloud_roots[id.index()]
    }

    pub fn first_defined_child_id(&self, id: NodeId) -> Result<NodeId, ChaError> {
        self.preorder_ids(id)
            .into_iter()
            .skip(1)
            .find(|&n| self.nodes[n.index()].is_defined)
            .ok_or_else(|| ChaError::NoDefinedDescendant {
                key: self.nodes[id.index()].key.clone(),
            })
    }

    /// `id` itself when defined, otherwise its first defined child.
    pub fn representative_id(&self, id: NodeId) -> Result<NodeId, ChaError> {
        if self.nodes[id.index()].is_defined {
            Ok(id)
        } else {
            self.first_defined_child_id(id)
        }
    }

    fn is_ancestor_id(&self, base: NodeId, derived: NodeId) -> bool {
        let mut seen = vec![false; self.nodes.len()];
        let mut work = vec![derived];
        while let Some(id) = work.pop() {
            if id == base {
                return true;
            }
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            work.extend(self.nodes[id.index()].parents.iter().copied());
        }
        false
    }
}

// ============================================================================
// Key-level queries
// ============================================================================

impl ClassHierarchy {
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.roots.iter().map(String::as_str)
    }

    pub fn is_root(&self, class: &str) -> bool {
        self.roots.contains(class)
    }

    pub fn knows_about(&self, key: &SubVtableKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn record(&self, class: &str) -> Option<&ClassRecord> {
        self.records.get(class)
    }

    pub fn records(&self) -> impl Iterator<Item = &ClassRecord> {
        self.records.values()
    }

    pub fn children(&self, key: &SubVtableKey) -> Result<Vec<&SubVtableKey>, ChaError> {
        let id = self.node_id(key)?;
        Ok(self.keys(&self.nodes[id.index()].children))
    }

    pub fn parents(&self, key: &SubVtableKey) -> Result<Vec<&SubVtableKey>, ChaError> {
        let id = self.node_id(key)?;
        Ok(self.keys(&self.nodes[id.index()].parents))
    }

    fn keys(&self, ids: &[NodeId]) -> Vec<&SubVtableKey> {
        ids.iter().map(|id| &self.nodes[id.index()].key).collect()
    }

    pub fn preorder(&self, root: &SubVtableKey) -> Result<Vec<SubVtableKey>, ChaError> {
        let id = self.node_id(root)?;
        Ok(self
            .preorder_ids(id)
            .into_iter()
            .map(|n| self.nodes[n.index()].key.clone())
            .collect())
    }

    pub fn cloud_size(&self, key: &SubVtableKey) -> Result<usize, ChaError> {
        Ok(self.cloud_size_of(self.node_id(key)?))
    }

    /// Root class of the cloud hosting `key`.
    pub fn ancestor(&self, key: &SubVtableKey) -> Result<&str, ChaError> {
        let root = self.cloud_root_id(self.node_id(key)?);
        Ok(&self.nodes[root.index()].key.class)
    }

    pub fn is_undefined(&self, key: &SubVtableKey) -> Result<bool, ChaError> {
        Ok(!self.nodes[self.node_id(key)?.index()].is_defined)
    }

    pub fn first_defined_child(&self, key: &SubVtableKey) -> Result<&SubVtableKey, ChaError> {
        let id = self.first_defined_child_id(self.node_id(key)?)?;
        Ok(&self.nodes[id.index()].key)
    }

    pub fn address_point(&self, key: &SubVtableKey) -> Result<usize, ChaError> {
        Ok(self.nodes[self.node_id(key)?.index()].address_point)
    }

    /// Order of the sub-vtable of `class` whose address point is `slot`.
    pub fn address_point_order(&self, class: &str, slot: usize) -> Option<usize> {
        self.records
            .get(class)?
            .sub_vtables
            .iter()
            .find(|sub| sub.address_point == slot)
            .map(|sub| sub.order)
    }

    /// Order of the sub-vtable of `class` that contains `slot`.
    pub fn sub_vtable_order(&self, class: &str, slot: usize) -> Option<usize> {
        self.records
            .get(class)?
            .sub_vtables
            .iter()
            .find(|sub| sub.contains(slot))
            .map(|sub| sub.order)
    }

    /// True if `derived` is `base` or reaches it through parent edges.
    pub fn is_ancestor(&self, base: &SubVtableKey, derived: &SubVtableKey) -> bool {
        match (self.index.get(base), self.index.get(derived)) {
            (Some(&b), Some(&d)) => self.is_ancestor_id(b, d),
            _ => false,
        }
    }

    /// Which sub-vtable of `derived` an upcast to `base` lands in.
    pub fn sub_vtable_index(&self, derived: &str, base: &str) -> UpcastPath {
        let (Some(record), Some(&base_id)) = (
            self.records.get(derived),
            self.index.get(&SubVtableKey::primary(base)),
        ) else {
            return UpcastPath::Unrelated;
        };

        let mut found = None;
        for sub in &record.sub_vtables {
            let id = self.index[&record.key(sub.order)];
            if self.is_ancestor_id(base_id, id) {
                if found.is_some() {
                    debug!(target: "vcloud::cha", derived, base, "ambiguous upcast");
                    return UpcastPath::Ambiguous;
                }
                found = Some(sub.order);
            }
        }
        found.map_or(UpcastPath::Unrelated, UpcastPath::Unique)
    }

    /// Locate a virtual function by mangled name: the sub-vtable holding it
    /// and its slot relative to that sub-vtable's address point.
    pub fn function_slot(&self, class: &str, name: &str) -> Option<(SubVtableKey, i64)> {
        let record = self.records.get(class)?;
        record.sub_vtables.iter().find_map(|sub| {
            sub.functions.iter().find(|f| f.name == name).map(|f| {
                let slot = (sub.start + f.offset) as i64;
                (record.key(sub.order), slot - sub.address_point as i64)
            })
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
