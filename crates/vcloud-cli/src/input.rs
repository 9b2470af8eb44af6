// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Reading class records from JSON.

use std::fs;

use serde::Deserialize;
use vcloud_cha::ClassHierarchy;
use vcloud_meta::ClassRecord;

use crate::output;

/// Top level of a records file: `{ "classes": [...] }`.
#[derive(Debug, Deserialize)]
struct RecordFile {
    classes: Vec<ClassRecord>,
}

pub fn parse_records(text: &str) -> Result<Vec<ClassRecord>, String> {
    serde_json::from_str::<RecordFile>(text)
        .map(|file| file.classes)
        .map_err(|e| format!("invalid records: {}", e))
}

/// Read a records file and build its hierarchy.
pub fn load_hierarchy(path: &str) -> Result<ClassHierarchy, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("reading {}: {}", output::file_path(path), e))?;
    let records = parse_records(&text).map_err(|e| format!("{}: {}", path, e))?;
    tracing::debug!(target: "vcloud::cli", path, classes = records.len(), "records loaded");
    ClassHierarchy::ingest(records).map_err(|e| format!("{}: {}", path, e))
}
