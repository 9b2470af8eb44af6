// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Help text for CLI commands.

use colored::Colorize;

use crate::output;

pub fn print_usage() {
    println!(
        "{} {} - vtable cloud layout for virtual call checks",
        output::title("vcloud"),
        output::version(env!("CARGO_PKG_VERSION"))
    );
    println!();
    println!(
        "{}: {} {} {}",
        output::section_header("Usage"),
        output::command("vcloud"),
        output::arg("<command>"),
        output::arg("[args]")
    );
    println!();
    println!("{}", output::section_header("Commands:"));
    println!("  {} {}          Lay out every cloud and print the new tables", output::command("layout"), output::arg("<records>"));
    println!("  {} {}          Print valid-address ranges and the runtime range table", output::command("ranges"), output::arg("<records>"));
    println!(
        "  {} {} Translate an old vtable index",
        output::command("translate"),
        output::arg("<records> <class> <order> <offset>")
    );
    println!("  {} {}      Render one cloud as a Graphviz graph", output::command("dot"), output::arg("<records> <root>"));
    println!("  {}                    Show this help", output::command("help"));
    println!("  {}                 Show version", output::command("version"));

    println!();
    println!("{}", output::section_header("Layout options:"));
    println!("  {}         Interleave sub-vtables instead of ordering them", output::arg("--interleave"));
    println!("  {} {}    Bytes per vtable slot (default 8)", output::arg("--word-width"), output::arg("<n>"));
    println!("  {}               Output as structured JSON", output::arg("--json"));

    println!();
    println!("{}", output::section_header("Logging:"));
    println!(
        "  {} {}   off, error, warn, info, debug or trace (env {})",
        output::arg("--log-level"),
        output::arg("<level>"),
        "VCLOUD_LOG_LEVEL".dimmed()
    );
    println!(
        "  {} {}  text, json, or auto: json unless stderr is a terminal (env {})",
        output::arg("--log-format"),
        output::arg("<format>"),
        "VCLOUD_LOG_FORMAT".dimmed()
    );
    println!();
    println!(
        "Records are read from a JSON file of the form {}.",
        r#"{ "classes": [ ... ] }"#.dimmed()
    );
}

/// Help for `vcloud <command> --help`. Unknown commands get the general
/// usage.
pub fn print_command_help(command: &str) {
    match command {
        "layout" => print_layout_help(),
        "ranges" => print_ranges_help(),
        "translate" => print_translate_help(),
        "dot" => print_dot_help(),
        _ => print_usage(),
    }
}

fn print_layout_help() {
    println!("{}", output::section_header("Layout"));
    println!();
    println!("Lay out every cloud of the hierarchy and print each new table slot by");
    println!("slot. Address points are marked. With --json the materialized tables");
    println!("and thunk clones are included.");
    println!();
    println!(
        "{}: {} {} {} {}",
        "Usage".yellow(),
        output::command("vcloud"),
        output::command("layout"),
        output::arg("<records>"),
        output::arg("[--interleave] [--word-width <n>] [--json]")
    );
}

fn print_ranges_help() {
    println!("{}", output::section_header("Ranges"));
    println!();
    println!("Print, for every sub-vtable, the addresses a vtable pointer may hold");
    println!("at a call through it, followed by the runtime range table.");
    println!();
    println!(
        "{}: {} {} {} {}",
        "Usage".yellow(),
        output::command("vcloud"),
        output::command("ranges"),
        output::arg("<records>"),
        output::arg("[--precise] [--interleave] [--word-width <n>] [--json]")
    );
    println!();
    println!("{}", output::section_header("Options:"));
    println!("  {}  One range per run of descendants instead of a single range", output::arg("--precise"));
}

fn print_translate_help() {
    println!("{}", output::section_header("Translate"));
    println!();
    println!("Map an index into a sub-vtable's original layout to the new layout.");
    println!("By default the offset counts from the address point and so does the");
    println!("result.");
    println!();
    println!(
        "{}: {} {} {} {}",
        "Usage".yellow(),
        output::command("vcloud"),
        output::command("translate"),
        output::arg("<records> <class> <order> <offset>"),
        output::arg("[--absolute] [--interleave] [--word-width <n>] [--json]")
    );
    println!();
    println!("{}", output::section_header("Options:"));
    println!(
        "  {}  Offset counts from the sub-vtable start; result is a table position",
        output::arg("--absolute")
    );
}

fn print_dot_help() {
    println!("{}", output::section_header("Dot"));
    println!();
    println!("Render the cloud rooted at a class as a Graphviz digraph.");
    println!();
    println!(
        "{}: {} {} {}",
        "Usage".yellow(),
        output::command("vcloud"),
        output::command("dot"),
        output::arg("<records> <root>")
    );
}
