use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use mgc_config::Config;
use mgc_core::Report;
use mgc_engine::{Pipeline, RunOutcome, obfuscators, omitters};
use mgc_obfuscate::{Obfuscator, ReplacementTracker, ReportingObfuscator, Sequence};
use mgc_sources::FsWriter;
use tempfile::TempDir;

const CONFIG: &str = r#"
[[obfuscate]]
type = "keywords"
replacement = { acme = "customer-a" }

[[obfuscate]]
type = "ip"

[[obfuscate]]
type = "mac"

[[obfuscate]]
type = "domain"
replacement_type = "consistent"
domain_names = ["example.com"]

[[omit]]
type = "file"
pattern = "**/*.secret"

[[omit]]
type = "kubernetes"
[omit.kubernetes_resource]
api_version = "v1"
kind = "Secret"
"#;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A small must-gather with a few files per directory.
fn must_gather(root: &Path) {
    for ns in ["default", "openshift-ingress", "acme-prod"] {
        for i in 0..5 {
            write(
                root,
                &format!("namespaces/{}/pods/pod-{}/current.log", ns, i),
                &format!(
                    "connecting to 10.0.{}.{} via api.example.com\nmac 29-7E-8C-8C-60-C{}\nacme tenant\n",
                    i, i + 1, i
                ),
            );
        }
        write(
            root,
            &format!("namespaces/{}/core/secrets.yaml", ns),
            "apiVersion: v1\nkind: List\nitems:\n- apiVersion: v1\n  kind: Secret\n  metadata: {name: s}\n",
        );
        write(
            root,
            &format!("namespaces/{}/core/configmaps.yaml", ns),
            "apiVersion: v1\nkind: ConfigMap\ndata:\n  url: https://console.example.com\n",
        );
    }
    write(root, "cluster/token.secret", "do not ship");
}

fn run(config: &str, input: &Path, output: &Path, workers: usize) -> mgc_core::Result<RunOutcome> {
    let config = Config::from_toml(config).unwrap();
    let pipeline = Pipeline::new(
        obfuscators(&config)?,
        omitters(&config)?,
        Box::new(FsWriter::prepare(output, false)?),
        workers,
    )?;
    pipeline.run(input)
}

fn canonicals(report: &Report) -> Vec<BTreeSet<String>> {
    report
        .replacements
        .iter()
        .map(|r| r.replacements.to_map().into_keys().collect())
        .collect()
}

fn tree(root: &Path) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    mgc_sources::walk(root, |entry| {
        if let mgc_sources::Entry::File(f) = entry {
            files.insert(f.relative.clone(), fs::read_to_string(&f.path).unwrap());
        }
        Ok(true)
    })
    .unwrap();
    files
}

#[test]
fn test_worker_count_does_not_change_the_result() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in");
    must_gather(&input);

    let one = run(CONFIG, &input, &temp.path().join("out1"), 1).unwrap();
    let four = run(CONFIG, &input, &temp.path().join("out4"), 4).unwrap();

    assert_eq!(one.report.omissions, four.report.omissions);
    assert_eq!(canonicals(&one.report), canonicals(&four.report));
    // Static obfuscators map identically regardless of order.
    for idx in 0..3 {
        assert_eq!(
            one.report.replacements[idx].replacements,
            four.report.replacements[idx].replacements
        );
    }
    assert_eq!(one.stats, four.stats);
    assert_eq!(one.stats.files_obfuscated, 18);
    assert_eq!(one.stats.files_omitted, 4);
    assert_eq!(
        tree(&temp.path().join("out1")).keys().collect::<Vec<_>>(),
        tree(&temp.path().join("out4")).keys().collect::<Vec<_>>()
    );
}

#[test]
fn test_output_is_clean_and_omissions_are_reported() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in");
    must_gather(&input);

    let outcome = run(CONFIG, &input, &temp.path().join("out"), 3).unwrap();
    assert_eq!(
        outcome.report.omissions,
        vec![
            "cluster/token.secret",
            "namespaces/acme-prod/core/secrets.yaml",
            "namespaces/default/core/secrets.yaml",
            "namespaces/openshift-ingress/core/secrets.yaml",
        ]
    );

    let out = tree(&temp.path().join("out"));
    assert!(!out.keys().any(|k| k.contains("secret")));
    // Paths go through the chain too.
    assert!(out.contains_key("namespaces/customer-a-prod/pods/pod-0/current.log"));
    assert!(!out.keys().any(|k| k.contains("acme")));

    for content in out.values() {
        assert!(!content.contains("10.0."));
        assert!(!content.contains("example.com"));
        assert!(!content.contains("29-7E"));
        assert!(!content.contains("acme"));
    }
    assert_eq!(
        out["namespaces/default/pods/pod-2/current.log"],
        "connecting to xxx.xxx.xxx.xxx via api.domain0000001\nmac xx:xx:xx:xx:xx:xx\ncustomer-a tenant\n"
    );
    assert_eq!(
        out["namespaces/default/core/configmaps.yaml"],
        "apiVersion: v1\nkind: ConfigMap\ndata:\n  url: https://console.domain0000001\n"
    );
}

#[test]
fn test_same_secret_gets_one_token_across_workers() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in");
    for i in 0..40 {
        write(&input, &format!("f{:02}.txt", i), "token-abc token-def\n");
    }
    let config = "[[obfuscate]]\ntype = \"regex\"\nreplacement_type = \"consistent\"\nregex = \"token-[a-z]+\"\n";

    let outcome = run(config, &input, &temp.path().join("out"), 8).unwrap();
    let table = &outcome.report.replacements[0].replacements;
    assert_eq!(table.len(), 2);
    assert!(table.replacements.iter().all(|r| r.total_occurrences() == 40));

    let out = tree(&temp.path().join("out"));
    let distinct: BTreeSet<&String> = out.values().collect();
    assert_eq!(distinct.len(), 1);
}

#[test]
fn test_exhausted_generator_aborts_the_run() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in");
    write(&input, "a.txt", "token-one\ntoken-two\ntoken-three\n");
    let config = "[[obfuscate]]\ntype = \"regex\"\nreplacement_type = \"consistent\"\nregex = \"token-[a-z]+\"\nmax_replacements = 2\n";

    let err = run(config, &input, &temp.path().join("out"), 2).unwrap_err();
    assert!(err.is_fatal(), "unexpected error: {}", err);
    assert!(err.to_string().contains("a.txt"));
}

/// Panics on any line containing `boom`.
struct Explosive {
    tracker: ReplacementTracker,
}

impl Obfuscator for Explosive {
    fn path(&self, input: &str) -> mgc_core::Result<String> {
        Ok(input.to_string())
    }

    fn contents(&self, input: &str) -> mgc_core::Result<String> {
        if input.contains("boom") {
            panic!("cannot handle {}", input);
        }
        Ok(input.to_string())
    }
}

impl ReportingObfuscator for Explosive {
    fn kind(&self) -> &'static str {
        "explosive"
    }

    fn tracker(&self) -> &ReplacementTracker {
        &self.tracker
    }
}

#[test]
fn test_panicking_obfuscator_stops_the_run_with_the_file_path() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in");
    write(&input, "f00.txt", "boom\n");
    for i in 1..20 {
        write(&input, &format!("f{:02}.txt", i), "fine\n");
    }

    let chain = Sequence::new(vec![Box::new(Explosive {
        tracker: ReplacementTracker::new(),
    })]);
    let pipeline = Pipeline::new(
        chain,
        Vec::new(),
        Box::new(FsWriter::prepare(&temp.path().join("out"), false).unwrap()),
        1,
    )
    .unwrap();

    let err = pipeline.run(&input).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("f00.txt"), "unexpected error: {}", message);
    assert!(message.contains("panicked"), "unexpected error: {}", message);
    for i in 1..20 {
        assert!(!temp.path().join(format!("out/f{:02}.txt", i)).exists());
    }
}

#[test]
fn test_colliding_output_names_are_numbered() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in");
    write(&input, "nodes/10.0.0.1.log", "first\n");
    write(&input, "nodes/10.0.0.2.log", "second\n");

    let outcome = run("[[obfuscate]]\ntype = \"ip\"\n", &input, &temp.path().join("out"), 2).unwrap();
    assert_eq!(outcome.stats.files_obfuscated, 2);

    let out = tree(&temp.path().join("out"));
    let names: Vec<&String> = out.keys().collect();
    assert_eq!(
        names,
        vec!["nodes/xxx.xxx.xxx.xxx-1.log", "nodes/xxx.xxx.xxx.xxx.log"]
    );
    let contents: BTreeSet<&str> = out.values().map(String::as_str).collect();
    assert_eq!(contents, BTreeSet::from(["first\n", "second\n"]));
}

#[test]
fn test_seeded_run_reuses_tokens_and_second_pass_is_clean() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in");
    write(&input, "a.txt", "host db.example.com at 10.0.0.7\n");
    let config = r#"
[[obfuscate]]
type = "domain"
replacement_type = "consistent"
domain_names = ["example.com"]

[[obfuscate]]
type = "ip"
replacement_type = "consistent"
"#;

    let first = run(config, &input, &temp.path().join("out1"), 1).unwrap();

    write(&input, "b.txt", "new.example.com and 10.0.0.8 and 10.0.0.7\n");
    let parsed = Config::from_toml(config).unwrap();
    let chain = obfuscators(&parsed).unwrap();
    chain.initialize(&first.report.replacements).unwrap();
    let pipeline = Pipeline::new(
        chain,
        Vec::new(),
        Box::new(FsWriter::prepare(&temp.path().join("out2"), false).unwrap()),
        2,
    )
    .unwrap();
    pipeline.run(&input).unwrap();

    let out = tree(&temp.path().join("out2"));
    assert_eq!(out["a.txt"], "host db.domain0000001 at x-ipv4-0000000001-x\n");
    assert_eq!(
        out["b.txt"],
        "new.domain0000001 and x-ipv4-0000000002-x and x-ipv4-0000000001-x\n"
    );

    // Cleaning the cleaned tree changes nothing.
    let again = run(config, &temp.path().join("out2"), &temp.path().join("out3"), 2).unwrap();
    assert_eq!(tree(&temp.path().join("out3")), out);
    assert!(again.report.to_map().is_empty());
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_omitted_not_followed() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in");
    write(&input, "real/data.txt", "10.1.1.1\n");
    std::os::unix::fs::symlink(input.join("real"), input.join("linked-dir")).unwrap();
    std::os::unix::fs::symlink(input.join("real/data.txt"), input.join("linked.txt")).unwrap();

    let outcome = run("[[obfuscate]]\ntype = \"ip\"\n", &input, &temp.path().join("out"), 2).unwrap();
    assert_eq!(outcome.report.omissions, vec!["linked-dir", "linked.txt"]);

    let out = tree(&temp.path().join("out"));
    assert_eq!(out.len(), 1);
    assert_eq!(out["real/data.txt"], "xxx.xxx.xxx.xxx\n");
}
