// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `vcloud layout`: print the new table of every cloud.

use std::collections::HashSet;

use serde::Serialize;
use vcloud_cha::ClassHierarchy;
use vcloud_layout::{materialize, CloudLayout, MaterializedTable, Slot, Strategy, VtableLayouts};
use vcloud_meta::SubVtableKey;

use super::CommandArgs;
use crate::{input, output};

#[derive(Serialize)]
struct CloudReport<'a> {
    root: &'a str,
    strategy: Strategy,
    word_width: u64,
    slots: &'a [Slot],
    address_points: Vec<AddressPoint<'a>>,
    table: MaterializedTable,
}

#[derive(Serialize)]
struct AddressPoint<'a> {
    key: &'a SubVtableKey,
    /// Byte offset from the start of the table.
    offset: u64,
}

pub fn cmd_layout(args: &[String]) -> Result<(), String> {
    let args = CommandArgs::parse(args)?;
    let path = args.positional(0, "records file")?;
    args.expect_positionals(1)?;

    let cha = input::load_hierarchy(path)?;
    let layouts = VtableLayouts::build(&cha, args.layout_options()).map_err(|e| e.to_string())?;

    if args.json {
        let mut clouds = Vec::new();
        for layout in layouts.clouds() {
            clouds.push(report(&cha, layout)?);
        }
        let out = serde_json::json!({ "clouds": clouds });
        let text = serde_json::to_string_pretty(&out).map_err(|e| e.to_string())?;
        println!("{}", text);
        return Ok(());
    }

    let mut count = 0;
    for layout in layouts.clouds() {
        print_cloud(&cha, layout);
        count += 1;
    }
    println!(
        "{}",
        output::banner_ok(&format!("Layout: {} cloud{}", count, if count == 1 { "" } else { "s" }))
    );
    Ok(())
}

fn report<'a>(cha: &'a ClassHierarchy, layout: &'a CloudLayout) -> Result<CloudReport<'a>, String> {
    let address_points = layout
        .placements()
        .filter_map(|(key, _)| {
            layout
                .address_point_offset(cha, key)
                .map(|offset| AddressPoint { key, offset })
        })
        .collect();
    Ok(CloudReport {
        root: layout.root(),
        strategy: layout.strategy(),
        word_width: layout.word_width(),
        slots: layout.slots(),
        address_points,
        table: materialize(cha, layout).map_err(|e| e.to_string())?,
    })
}

fn print_cloud(cha: &ClassHierarchy, layout: &CloudLayout) {
    let address_points: HashSet<usize> = layout
        .placements()
        .filter_map(|(key, _)| layout.address_point_position(cha, key))
        .collect();

    println!(
        "{}  {}, {} slots, align {} bytes",
        output::table_name(&layout.table_name()),
        layout.strategy(),
        layout.len(),
        layout.alignment_bytes()
    );
    println!("{}", output::separator(40));
    for (pos, slot) in layout.slots().iter().enumerate() {
        match slot {
            Slot::Dummy => println!("{:5} : {}", pos, output::dummy()),
            Slot::Entry { key, index } => {
                let entry = format!("{}[{}]", output::key(&key.to_string()), index);
                if address_points.contains(&pos) {
                    println!("{:5} : {}  {}", pos, entry, output::address_point());
                } else {
                    println!("{:5} : {}", pos, entry);
                }
            }
        }
    }
    println!();
}
