// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `vcloud ranges`: valid-address ranges of every sub-vtable.

use serde::Serialize;
use vcloud_layout::{Precision, RangeEntry, RangeTuple, VtableLayouts};
use vcloud_meta::SubVtableKey;

use super::CommandArgs;
use crate::{input, output};

#[derive(Serialize)]
struct KeyRanges<'a> {
    key: &'a SubVtableKey,
    table: String,
    /// `None` when no check through this key can pass.
    tuples: Option<Vec<RangeTuple>>,
}

#[derive(Serialize)]
struct RangesReport<'a> {
    precision: String,
    ranges: Vec<KeyRanges<'a>>,
    runtime_table: Vec<RangeEntry>,
}

pub fn cmd_ranges(args: &[String]) -> Result<(), String> {
    let args = CommandArgs::parse(args)?;
    let path = args.positional(0, "records file")?;
    args.expect_positionals(1)?;

    let precision = if args.precise {
        Precision::Precise
    } else {
        Precision::Single
    };

    let cha = input::load_hierarchy(path)?;
    let layouts = VtableLayouts::build(&cha, args.layout_options()).map_err(|e| e.to_string())?;

    let mut ranges = Vec::new();
    for layout in layouts.clouds() {
        for &id in layout.preorder() {
            let key = cha.node(id).key();
            let set = layouts.range_for(key, precision).map_err(|e| e.to_string())?;
            ranges.push(KeyRanges {
                key,
                table: layout.table_name(),
                tuples: set.map(|s| s.tuples().to_vec()),
            });
        }
    }
    let runtime_table = layouts.runtime_table().map_err(|e| e.to_string())?;

    if args.json {
        let report = RangesReport {
            precision: precision.to_string(),
            ranges,
            runtime_table,
        };
        let text = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{}", text);
        return Ok(());
    }

    println!("{}", output::section_header(&format!("Ranges ({}):", precision)));
    for entry in &ranges {
        let key = output::key(&entry.key.to_string());
        match &entry.tuples {
            None => println!("  {}  {}", key, output::none()),
            Some(tuples) => {
                for tuple in tuples {
                    println!("  {}  {}  {}", key, entry.table, describe(tuple));
                }
            }
        }
    }

    println!();
    println!("{}", output::section_header("Runtime table:"));
    for entry in &runtime_table {
        println!(
            "  {}  {}  start {} width {} align {}",
            output::key(&entry.class),
            entry.table,
            entry.start,
            entry.width,
            entry.alignment
        );
    }
    Ok(())
}

fn describe(tuple: &RangeTuple) -> String {
    format!(
        "[{}, {}) align {}",
        tuple.start,
        tuple.start + tuple.width,
        tuple.alignment
    )
}
