// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Integration tests for the `vcloud` binary, run against JSON fixtures.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn vcloud_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("vcloud");
    path
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn vcloud(args: &[&str]) -> Output {
    Command::new(vcloud_binary())
        .args(args)
        .env("NO_COLOR", "1")
        .env("VCLOUD_LOG_LEVEL", "error")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run vcloud")
}

fn vcloud_on(command: &str, extra: &[&str]) -> Output {
    let path = fixture("diamond.json");
    let mut args = vec![command, path.to_str().unwrap()];
    args.extend_from_slice(extra);
    vcloud(&args)
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

#[test]
fn layout_prints_every_slot() {
    let out = vcloud_on("layout", &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("_SDA  ordered, 17 slots, align 32 bytes"), "{text}");
    assert!(text.contains("    4 : (A,0)[2]  <- address point"), "{text}");
    assert!(text.contains("    0 : <dummy>"), "{text}");
    assert!(text.contains("Layout: 1 cloud OK"), "{text}");
}

#[test]
fn layout_json_includes_the_materialized_table() {
    let out = vcloud_on("layout", &["--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();

    let cloud = &json["clouds"][0];
    assert_eq!(cloud["root"], "A");
    assert_eq!(cloud["strategy"], "ordered");
    assert_eq!(cloud["slots"].as_array().unwrap().len(), 17);
    assert_eq!(cloud["table"]["name"], "_SDA");
    assert_eq!(cloud["table"]["elements"][0], "null");
    assert_eq!(cloud["table"]["elements"][4]["function"], "_ZN1A1fEv");
    assert_eq!(cloud["address_points"].as_array().unwrap().len(), 4);
}

#[test]
fn ranges_json_lists_the_runtime_table() {
    let out = vcloud_on("ranges", &["--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();

    assert_eq!(json["precision"], "single");
    let table = json["runtime_table"].as_array().unwrap();
    assert_eq!(table.len(), 4);
    assert_eq!(table[0]["class"], "A");
    assert_eq!(table[0]["table"], "_SDA");
    assert_eq!(table[0]["start"], 32);
    assert_eq!(table[0]["width"], 128);
    assert_eq!(table[0]["alignment"], 32);
}

#[test]
fn precise_ranges_print_per_key() {
    let out = vcloud_on("ranges", &["--precise"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("Ranges (precise):"), "{text}");
    // D has no descendants: just its own address point at slot 12.
    assert!(text.contains("(D,0)  _SDA  [96, 128) align 32"), "{text}");
}

#[test]
fn translate_relative_and_absolute() {
    let out = vcloud_on("translate", &["D", "0", "-2"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out).trim(), "-2");

    let out = vcloud_on("translate", &["D", "0", "0", "--absolute"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out).trim(), "10");

    let out = vcloud_on("translate", &["B", "0", "0", "--interleave", "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json["translated"], 0);
    assert_eq!(json["key"]["class"], "B");
}

#[test]
fn translate_out_of_range_fails() {
    let out = vcloud_on("translate", &["D", "0", "1"]);
    assert!(!out.status.success());
    let err = stderr(&out);
    assert!(err.contains("error: offset 1 is outside the 3 slots of (D,0)"), "{err}");
}

#[test]
fn dot_renders_the_cloud() {
    let out = vcloud_on("dot", &["A"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("digraph \"A\" {\n"), "{text}");
    assert!(text.contains("\t \"(B,0)\" -> \"(D,0)\";\n"), "{text}");

    let out = vcloud_on("dot", &["D"]);
    assert!(!out.status.success());
}

#[test]
fn bad_arguments_fail() {
    let out = vcloud_on("layout", &["--word-width", "0"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("must be positive"));

    let out = vcloud(&["layout", "no/such/file.json"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("reading"));

    let out = vcloud(&["shuffle"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("unknown command `shuffle`"));

    let out = vcloud(&["layout", "--log-level", "loud"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("unknown log level"));
}

#[test]
fn version_and_help() {
    let out = vcloud(&["version"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), format!("vcloud {}", env!("CARGO_PKG_VERSION")));

    let out = vcloud(&["translate", "--help"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("--absolute"));
}
