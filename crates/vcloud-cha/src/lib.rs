// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Class hierarchy analysis over vtable metadata.
//!
//! Builds the inheritance DAG of sub-vtables, groups it into clouds (one per
//! root class), and answers the structural queries the layout builder and
//! the range computer need: preorders, cloud sizes, ancestors, upcast paths.

pub mod dot;
pub mod error;
pub mod hierarchy;

pub use error::ChaError;
pub use hierarchy::{ClassHierarchy, Node, NodeId, UpcastPath};
