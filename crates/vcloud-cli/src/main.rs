// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! vcloud CLI - lay out vtable clouds from class records.

mod commands;
mod help;
mod input;
mod logging;
mod output;

use std::env;
use std::process;

use logging::LogSettings;

fn main() {
    output::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (args, log_settings) = match LogSettings::extract(args) {
        Ok(split) => split,
        Err(e) => {
            eprintln!("{}: {}", output::error_label(), e);
            process::exit(1);
        }
    };
    logging::init_logging(log_settings.merged_with_env());

    let Some(command) = args.first() else {
        help::print_usage();
        return;
    };
    let rest = &args[1..];
    if rest.iter().any(|a| a == "--help" || a == "-h") {
        help::print_command_help(command);
        return;
    }

    let result = match command.as_str() {
        "layout" => commands::layout::cmd_layout(rest),
        "ranges" => commands::ranges::cmd_ranges(rest),
        "translate" => commands::translate::cmd_translate(rest),
        "dot" => commands::dot::cmd_dot(rest),
        "help" | "--help" | "-h" => {
            match rest.first() {
                Some(topic) => help::print_command_help(topic),
                None => help::print_usage(),
            }
            Ok(())
        }
        "version" | "--version" | "-V" => {
            println!("vcloud {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            eprintln!("{}: unknown command `{}`", output::error_label(), other);
            eprintln!(
                "{}: run `{}` to list commands",
                output::hint_label(),
                output::command("vcloud help")
            );
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", output::error_label(), e);
        process::exit(1);
    }
}
