// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Graphviz export of a cloud.

use std::collections::VecDeque;

use crate::{ChaError, ClassHierarchy};

impl ClassHierarchy {
    /// Render the cloud rooted at `root` as a DOT digraph, breadth first.
    /// Every edge is listed; every node once.
    pub fn to_dot(&self, root: &str) -> Result<String, ChaError> {
        let root_id = self.root_id(root)?;

        let mut out = format!("digraph \"{}\" {{\n", root);
        let mut visited = vec![false; self.len()];
        let mut queue = VecDeque::from([root_id]);
        visited[root_id.index()] = true;

        while let Some(id) = queue.pop_front() {
            let node = self.node(id);
            out.push_str(&format!("\t \"{}\";\n", node.key()));
            for &child in node.children() {
                out.push_str(&format!("\t \"{}\" -> \"{}\";\n", node.key(), self.node(child).key()));
                if !visited[child.index()] {
                    visited[child.index()] = true;
                    queue.push_back(child);
                }
            }
        }
        out.push_str("}\n");
        Ok(out)
    }
}
