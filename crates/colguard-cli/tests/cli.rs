use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const SCHEMA: &str = r#"
[[enums]]
name = "Status"
cases = [{ name = "Draft", value = "draft" }, { name = "Live", value = "live" }]

[[entities]]
name = "Product"

[[entities.fields]]
name = "id"
column = { type = "integer", id = true }

[[entities.fields]]
name = "barcode"
column = { type = "string", length = 10, fixed = true }

[[entities.fields]]
name = "price"
column = { type = "decimal", precision = 10, scale = 2, unsigned = true }

[[entities.fields]]
name = "status"
column = { type = "enum", enum_type = "Status" }

[[entities.fields]]
name = "slug"
column = { type = "string", length = 64, nullable = true }
rules = [{ rule = "slug" }]
"#;

fn colguard(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_colguard"))
        .current_dir(dir)
        .env_remove("COLGUARD_LOG")
        .args(args)
        .output()
        .expect("run colguard")
}

fn workspace(records: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("schema.toml"), SCHEMA).unwrap();
    fs::write(dir.path().join("records.json"), records).unwrap();
    dir
}

fn stdout_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn validate_passes_clean_records() {
    let dir = workspace(
        r#"[
            { "barcode": "0123456789", "price": 12.5, "status": "live" },
            { "barcode": "9876543210", "price": "3.10", "status": "Draft", "slug": "blue-mug" }
        ]"#,
    );
    let output = colguard(
        dir.path(),
        &["validate", "--schema", "schema.toml", "--entity", "Product", "--records", "records.json"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| line["ok"] == serde_json::json!(true)));
}

#[test]
fn validate_fails_when_any_record_fails() {
    let dir = workspace(
        r#"[
            { "barcode": "0123456789", "price": 12.5, "status": "live" },
            { "barcode": "0123456789", "price": 12.5, "status": "x" }
        ]"#,
    );
    let output = colguard(
        dir.path(),
        &[
            "validate", "--schema", "schema.toml", "--entity", "Product", "--records",
            "records.json", "--log-format", "json",
        ],
    );
    assert!(!output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines[1]["ok"], serde_json::json!(false));
    assert_eq!(lines[1]["field"], serde_json::json!("status"));
    assert_eq!(lines[1]["message"], serde_json::json!("status has invalid enum value"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("\"run_finished\""));
}

#[test]
fn update_mode_requires_the_identifier() {
    let dir = workspace(r#"{ "barcode": "0123456789", "price": 1, "status": "live" }"#);
    fs::write(dir.path().join("colguard.toml"), "[validator]\nmode = \"update\"\n").unwrap();
    let args = ["validate", "--schema", "schema.toml", "--entity", "Product", "--records", "records.json"];

    let output = colguard(dir.path(), &args);
    assert!(!output.status.success());
    assert_eq!(stdout_lines(&output)[0]["message"], serde_json::json!("id is empty"));

    let mut insert = args.to_vec();
    insert.extend(["--mode", "insert"]);
    assert!(colguard(dir.path(), &insert).status.success());
}

#[test]
fn check_schema_reports_problems() {
    let dir = workspace("[]");
    let ok = colguard(dir.path(), &["check-schema", "--schema", "schema.toml"]);
    assert!(ok.status.success());
    let report: serde_json::Value = serde_json::from_slice(&ok.stdout).unwrap();
    assert_eq!(report["errors"], serde_json::json!([]));

    fs::write(
        dir.path().join("broken.json"),
        r#"{ "entities": [{ "name": "A", "fields": [{ "name": "x", "column": { "type": "string", "enum_type": "Nope" } }] }] }"#,
    )
    .unwrap();
    let broken = colguard(dir.path(), &["check-schema", "--schema", "broken.json"]);
    assert!(!broken.status.success());
    let report: serde_json::Value = serde_json::from_slice(&broken.stdout).unwrap();
    assert_eq!(report["errors"][0]["code"], serde_json::json!("invalid_metadata"));
}

#[test]
fn json_schema_describes_documents() {
    let dir = TempDir::new().unwrap();
    let output = colguard(dir.path(), &["json-schema"]);
    assert!(output.status.success());
    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(schema["title"], serde_json::json!("SchemaDocument"));
    assert!(schema["properties"]["entities"].is_object());
}
