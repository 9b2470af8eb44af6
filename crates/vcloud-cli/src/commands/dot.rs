// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `vcloud dot`: Graphviz rendering of one cloud.

use super::CommandArgs;
use crate::input;

pub fn cmd_dot(args: &[String]) -> Result<(), String> {
    let args = CommandArgs::parse(args)?;
    let path = args.positional(0, "records file")?;
    let root = args.positional(1, "root class")?;
    args.expect_positionals(2)?;

    let cha = input::load_hierarchy(path)?;
    let dot = cha.to_dot(root).map_err(|e| e.to_string())?;
    print!("{}", dot);
    Ok(())
}
