use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|err| panic!("clock should be >= UNIX_EPOCH: {err}"))
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{}-{now}", std::process::id()));
    fs::create_dir_all(&dir)
        .unwrap_or_else(|err| panic!("failed to create temp dir {}: {err}", dir.display()));
    dir
}

fn run_catalog<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_catalog"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|err| panic!("failed to execute catalog binary: {err}"))
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    serde_json::from_str(&stdout)
        .unwrap_or_else(|err| panic!("stdout is not valid JSON: {err}\nstdout:\n{stdout}"))
}

fn path_str(path: &Path) -> &str {
    path.to_str()
        .unwrap_or_else(|| panic!("path should be valid UTF-8: {}", path.display()))
}

fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body)
        .unwrap_or_else(|err| panic!("failed to write {}: {err}", path.display()));
    path
}

#[test]
fn filter_show_prints_expression_for_valid_yaml() {
    let dir = unique_temp_dir("catalog-filter-show");
    let filter = write_file(
        &dir,
        "unprocessed.yaml",
        r"
node: combinator
operator: and
children:
  - node: comparison
    field: level
    operator: equals
    literal: collection
  - node: comparison
    field: ead_id
    operator: empty
",
    );

    let output = run_catalog(["filter", "show", "--filter", path_str(&filter)]);
    assert!(
        output.status.success(),
        "stderr:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let payload = stdout_json(&output);
    assert_eq!(payload["valid"], Value::Bool(true));
    assert_eq!(
        payload["serialized"],
        Value::String(r#"AND{[level] <equals> "collection"}{[ead_id] <empty>}"#.to_string())
    );
}

#[test]
fn filter_show_reports_invalid_arity() {
    let dir = unique_temp_dir("catalog-filter-arity");
    let filter = write_file(
        &dir,
        "single.json",
        r#"{
  "node": "combinator",
  "operator": "and",
  "children": [
    {"node": "comparison", "field": "title", "operator": "not_empty"}
  ]
}"#,
    );

    let output = run_catalog(["filter", "show", "--filter", path_str(&filter)]);
    assert!(!output.status.success());
    let payload = stdout_json(&output);
    assert_eq!(payload["valid"], Value::Bool(false));
    assert_eq!(
        payload["serialized"],
        Value::String("AND{[title] <not_empty>}".to_string())
    );
}

#[test]
fn filter_show_rejects_missing_literal() {
    let dir = unique_temp_dir("catalog-filter-literal");
    let filter = write_file(
        &dir,
        "broken.yaml",
        "node: comparison\nfield: title\noperator: contains\n",
    );

    let output = run_catalog(["filter", "show", "--filter", path_str(&filter)]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid filter"), "stderr:\n{stderr}");
    assert!(stderr.contains("requires a literal"), "stderr:\n{stderr}");
}

#[test]
fn check_without_address_is_a_configuration_error() {
    let output = run_catalog(["check", "--username", "admin"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("configuration error"), "stderr:\n{stderr}");
    assert!(stderr.contains("hint (configuration)"), "stderr:\n{stderr}");
}

#[test]
fn select_refuses_invalid_filter_before_connecting() {
    let dir = unique_temp_dir("catalog-select-invalid");
    let filter = write_file(
        &dir,
        "not.yaml",
        r"
node: combinator
operator: not
children: []
",
    );

    // unroutable address; the filter check must fail first
    let output = run_catalog([
        "select",
        "--url",
        "http://192.0.2.1:9",
        "--repo",
        "2",
        "--ids",
        "1,2,3",
        "--filter",
        path_str(&filter),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("is not well formed"), "stderr:\n{stderr}");
}

#[test]
fn config_file_supplies_the_address() {
    let dir = unique_temp_dir("catalog-config");
    let config = write_file(
        &dir,
        "catalog.yaml",
        "base_url: ftp://catalog.example.org\nusername: admin\n",
    );
    let password = write_file(&dir, "password", "secret\n");

    let output = run_catalog([
        "check",
        "--config",
        path_str(&config),
        "--password-file",
        path_str(&password),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("configuration error"), "stderr:\n{stderr}");
    assert!(!stderr.contains("secret"), "stderr:\n{stderr}");
}

#[test]
fn refused_connection_is_reported_as_transient() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap_or_else(|err| panic!("failed to bind loopback port: {err}"));
        listener
            .local_addr()
            .unwrap_or_else(|err| panic!("listener should have an address: {err}"))
            .port()
    };
    let dir = unique_temp_dir("catalog-refused");
    let config = write_file(
        &dir,
        "catalog.yaml",
        &format!(
            "base_url: http://127.0.0.1:{port}\nusername: admin\nrequest:\n  timeout_secs: 2\n  backoff_base_secs: 0\n"
        ),
    );
    let password = write_file(&dir, "password", "secret\n");

    let output = run_catalog([
        "check",
        "--config",
        path_str(&config),
        "--password-file",
        path_str(&password),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed after 3 attempts"), "stderr:\n{stderr}");
    assert!(stderr.contains("hint (network)"), "stderr:\n{stderr}");
    assert!(stderr.contains("looks transient"), "stderr:\n{stderr}");
}
