use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn schemagen() -> Command {
    Command::cargo_bin("schemagen").expect("schemagen binary")
}

fn write(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, body).unwrap();
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "src/user.schema.json",
        r#"{"definitions":{"IUser":{"type":"object","required":["id"]}}}"#,
    );
    write(
        dir.path(),
        "src/order.schema.json",
        r#"{"$schema":"http://json-schema.org/draft-07/schema#","definitions":{"IOrder":{"type":"object"}}}"#,
    );
    dir
}

#[test]
fn init_writes_config_and_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    schemagen()
        .args(["init", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("schemagen.yaml"));
    assert!(dir.path().join("schemagen.yaml").exists());

    schemagen()
        .args(["init", "--root"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E_CONFIG]"));
}

#[test]
fn generate_writes_sorted_canonical_schema() {
    let dir = project();
    schemagen()
        .args(["generate", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 symbol(s) from 2 artifact(s)"));

    let out = fs::read_to_string(dir.path().join("schema.json")).unwrap();
    let order = out.find("IOrder").unwrap();
    let user = out.find("IUser").unwrap();
    assert!(order < user, "definitions must be sorted:\n{out}");
    assert!(out.ends_with('\n'));
}

#[test]
fn second_generate_is_unchanged_and_uses_cache() {
    let dir = project();
    schemagen().args(["generate", "--root"]).arg(dir.path()).assert().success();

    let output = schemagen()
        .args(["generate", "--json", "--root"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["state"], "done");
    assert_eq!(report["reused_from_cache"], 2);
    assert_eq!(report["extracted"], 0);
    assert_eq!(report["writes"][0]["status"], "unchanged");
}

#[test]
fn dry_run_writes_nothing() {
    let dir = project();
    schemagen()
        .args(["generate", "--dry-run", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry-run]"));
    assert!(!dir.path().join("schema.json").exists());
    assert!(!dir.path().join(".schemagen").exists());
}

#[test]
fn conflicting_duplicate_fails_with_code_and_diff() {
    let dir = project();
    write(
        dir.path(),
        "src/user2.schema.json",
        r#"{"definitions":{"IUser":{"type":"object","required":["id","email"]}}}"#,
    );

    schemagen()
        .args(["generate", "--verbose", "--root"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E_DUPLICATE_SYMBOL]"))
        .stderr(predicate::str::contains("IUser"))
        .stderr(predicate::str::contains("user.schema.json"))
        .stderr(predicate::str::contains("user2.schema.json"))
        .stderr(predicate::str::contains("+    \"email\""));
    assert!(!dir.path().join("schema.json").exists());
}

#[test]
fn no_matches_is_a_discovery_error() {
    let dir = TempDir::new().unwrap();
    schemagen()
        .args(["generate", "--root"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E_DISCOVERY]"));
}

#[test]
fn all_malformed_fails_and_lists_each_artifact() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.schema.json", "{ not json");
    write(dir.path(), "b.schema.json", "[]");

    schemagen()
        .args(["generate", "--root"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E_ALL_EXTRACTIONS_FAILED]"))
        .stderr(predicate::str::contains("a.schema.json"))
        .stderr(predicate::str::contains("b.schema.json"));
}

#[test]
fn out_and_pattern_flags_override_config() {
    let dir = project();
    write(dir.path(), "extra/thing.types.json", r#"{"definitions":{"Thing":{}}}"#);
    let out = dir.path().join("build").join("types.json");

    schemagen()
        .args(["generate", "--pattern", "extra/*.types.json", "--out"])
        .arg(&out)
        .arg("--root")
        .arg(dir.path())
        .assert()
        .success();

    let schema: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let keys: Vec<_> = schema["definitions"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["Thing"]);
}

#[test]
fn emit_dir_produces_helper_modules() {
    let dir = project();
    write(dir.path(), "schemagen.yaml", "emit_dir: generated\n");

    schemagen().args(["generate", "--root"]).arg(dir.path()).assert().success();

    let ts = fs::read_to_string(dir.path().join("generated").join("schema-index.ts")).unwrap();
    assert!(ts.contains("\"IOrder\""));
    assert!(dir.path().join("generated").join("schema_symbols.rs").exists());
}

#[test]
fn cache_show_and_clear() {
    let dir = project();
    schemagen().args(["generate", "--root"]).arg(dir.path()).assert().success();

    let output = schemagen()
        .args(["cache", "show", "--json", "--root"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["records"].as_array().unwrap().len(), 2);

    schemagen()
        .args(["cache", "clear", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared"));
    assert!(!dir.path().join(".schemagen").join("cache.json").exists());

    schemagen()
        .args(["cache", "show", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache is empty"));
}
