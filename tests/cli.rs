use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn prints_help_without_command() {
	let bin = assert_cmd::cargo::cargo_bin!("bordereaux");
	let mut cmd = Command::new(bin);
	cmd.assert()
		.failure()
		.stderr(predicate::str::contains("Usage:").or(predicate::str::contains("Commands:")));
}

#[test]
fn migrate_creates_database_file() {
	let dir = tempfile::tempdir().unwrap();
	let db_path = dir.path().join("bordereaux.db");

	let bin = assert_cmd::cargo::cargo_bin!("bordereaux");
	let mut cmd = Command::new(bin);
	cmd.arg("--database-url").arg(db_path.to_str().unwrap()).arg("migrate");
	cmd.assert().success();

	assert!(db_path.exists());
}

#[test]
fn seed_templates_loads_sidecar_files() {
	let dir = tempfile::tempdir().unwrap();
	let db_path = dir.path().join("bordereaux.db");
	let templates_dir = dir.path().join("templates");
	std::fs::create_dir_all(&templates_dir).unwrap();
	std::fs::write(
		templates_dir.join("sample.json"),
		r#"{
			"id": 0,
			"template_id": "sample",
			"name": "Sample",
			"carrier": null,
			"file_type": "premium",
			"column_mappings": {"Policy Number": "policy_number"},
			"version": "1",
			"active_flag": true,
			"pattern": null,
			"json_file_path": null,
			"created_at": "2024-01-01T00:00:00Z",
			"updated_at": "2024-01-01T00:00:00Z"
		}"#,
	)
	.unwrap();

	let bin = assert_cmd::cargo::cargo_bin!("bordereaux");
	let mut cmd = Command::new(bin);
	cmd.arg("--database-url")
		.arg(db_path.to_str().unwrap())
		.arg("seed-templates")
		.arg(templates_dir.to_str().unwrap());
	cmd.assert().success();
}

#[test]
fn process_batch_with_no_files_succeeds() {
	let dir = tempfile::tempdir().unwrap();
	let db_path = dir.path().join("bordereaux.db");

	let bin = assert_cmd::cargo::cargo_bin!("bordereaux");
	let mut cmd = Command::new(bin);
	cmd.arg("--database-url").arg(db_path.to_str().unwrap()).arg("process-batch");
	cmd.assert().success().stdout(predicate::str::contains("processed_count"));
}
