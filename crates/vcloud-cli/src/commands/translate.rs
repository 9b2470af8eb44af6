// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `vcloud translate`: map one old vtable index to its new position.

use vcloud_layout::VtableLayouts;
use vcloud_meta::SubVtableKey;

use super::CommandArgs;
use crate::input;

pub fn cmd_translate(args: &[String]) -> Result<(), String> {
    let args = CommandArgs::parse(args)?;
    let path = args.positional(0, "records file")?;
    let class = args.positional(1, "class")?;
    let order = args.positional(2, "sub-vtable order")?;
    let offset = args.positional(3, "offset")?;
    args.expect_positionals(4)?;

    let order: usize = order
        .parse()
        .map_err(|_| format!("sub-vtable order must be a non-negative number, got `{}`", order))?;
    let offset: i64 = offset
        .parse()
        .map_err(|_| format!("offset must be a number, got `{}`", offset))?;

    let cha = input::load_hierarchy(path)?;
    let layouts = VtableLayouts::build(&cha, args.layout_options()).map_err(|e| e.to_string())?;
    let key = SubVtableKey::new(class, order);
    let translated = layouts
        .translate(&key, offset, !args.absolute)
        .map_err(|e| e.to_string())?;

    if args.json {
        let out = serde_json::json!({
            "key": key,
            "offset": offset,
            "relative": !args.absolute,
            "translated": translated,
        });
        println!("{}", out);
    } else {
        println!("{}", translated);
    }
    Ok(())
}
