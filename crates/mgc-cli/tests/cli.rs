use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn mgc(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mgc"))
        .args(args)
        .env_remove("MGC_CONFIG")
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run mgc")
}

fn path(p: &Path) -> &str {
    p.to_str().unwrap()
}

fn setup() -> TempDir {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("must-gather");
    fs::create_dir_all(input.join("nodes")).unwrap();
    fs::write(
        input.join("nodes/kubelet.log"),
        "received request from 192.168.1.10\nlink 29-7E-8C-8C-60-C9 up\n",
    )
    .unwrap();
    fs::write(input.join("nodes/journal.log"), "skip me\n").unwrap();
    fs::write(
        temp.path().join("mgc.toml"),
        r#"
workers = 2

[[obfuscate]]
type = "ip"

[[obfuscate]]
type = "mac"

[[omit]]
type = "file"
pattern = "**/journal.log"
"#,
    )
    .unwrap();
    temp
}

#[test]
fn test_clean_writes_output_and_report() {
    let temp = setup();
    let out = temp.path().join("cleaned");
    let result = mgc(&[
        "clean",
        "--input",
        path(&temp.path().join("must-gather")),
        "--output",
        path(&out),
        "--config",
        path(&temp.path().join("mgc.toml")),
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    assert_eq!(
        fs::read_to_string(out.join("nodes/kubelet.log")).unwrap(),
        "received request from xxx.xxx.xxx.xxx\nlink xx:xx:xx:xx:xx:xx up\n"
    );
    assert!(!out.join("nodes/journal.log").exists());

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(report["omissions"], serde_json::json!(["nodes/journal.log"]));
    assert_eq!(report["replacements"][0]["kind"], "ip");
    assert_eq!(report["replacements"][1]["kind"], "mac");
    assert_eq!(
        report["replacements"][0]["replacements"][0]["canonical"],
        "192.168.1.10"
    );
    assert!(report["generated_at"].is_number());
}

#[test]
fn test_non_empty_output_needs_overwrite() {
    let temp = setup();
    let out = temp.path().join("cleaned");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("stale"), "x").unwrap();
    let input = temp.path().join("must-gather");
    let report = temp.path().join("r.json");

    let refused = mgc(&["clean", "-i", path(&input), "-o", path(&out), "--report", path(&report)]);
    assert_eq!(refused.status.code(), Some(1));
    assert!(out.join("stale").exists());

    let replaced = mgc(&[
        "clean",
        "-i",
        path(&input),
        "-o",
        path(&out),
        "--report",
        path(&report),
        "--overwrite",
    ]);
    assert!(replaced.status.success());
    assert!(!out.join("stale").exists());
    assert!(out.join("nodes/journal.log").exists());
    assert!(report.exists());
}

#[test]
fn test_fatal_error_exit_code() {
    let temp = setup();
    fs::write(
        temp.path().join("tight.toml"),
        "[[obfuscate]]\ntype = \"ip\"\nreplacement_type = \"consistent\"\nmax_replacements = 1\n",
    )
    .unwrap();
    fs::write(
        temp.path().join("must-gather/nodes/more.log"),
        "10.0.0.1 10.0.0.2\n",
    )
    .unwrap();

    let result = mgc(&[
        "clean",
        "-i",
        path(&temp.path().join("must-gather")),
        "-o",
        path(&temp.path().join("cleaned")),
        "-c",
        path(&temp.path().join("tight.toml")),
    ]);
    assert_eq!(result.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&result.stderr).contains("exhausted"));
    assert!(!temp.path().join("report.json").exists());
}

#[test]
fn test_seed_report_keeps_tokens() {
    let temp = setup();
    let config = temp.path().join("consistent.toml");
    fs::write(&config, "[[obfuscate]]\ntype = \"ip\"\nreplacement_type = \"consistent\"\n").unwrap();
    let input = temp.path().join("must-gather");

    let first = mgc(&[
        "clean", "-i", path(&input), "-o", path(&temp.path().join("one")), "-c", path(&config),
    ]);
    assert!(first.status.success());

    fs::write(input.join("nodes/later.log"), "10.9.9.9 then 192.168.1.10\n").unwrap();
    let second = mgc(&[
        "clean",
        "-i",
        path(&input),
        "-o",
        path(&temp.path().join("two")),
        "-c",
        path(&config),
        "--report",
        path(&temp.path().join("second.json")),
        "--seed-report",
        path(&temp.path().join("report.json")),
    ]);
    assert!(second.status.success(), "{}", String::from_utf8_lossy(&second.stderr));
    assert_eq!(
        fs::read_to_string(temp.path().join("two/nodes/later.log")).unwrap(),
        "x-ipv4-0000000002-x then x-ipv4-0000000001-x\n"
    );
}

#[test]
fn test_check_command() {
    let temp = setup();
    let ok = mgc(&["check", path(&temp.path().join("mgc.toml"))]);
    assert!(ok.status.success());
    assert!(String::from_utf8_lossy(&ok.stdout).contains("Obfuscators (2)"));

    let bad = temp.path().join("bad.toml");
    fs::write(&bad, "[[obfuscate]]\ntype = \"domain\"\n").unwrap();
    let failed = mgc(&["check", path(&bad)]);
    assert_eq!(failed.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&failed.stderr).contains("domain_names"));
}
