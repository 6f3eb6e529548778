//! Command wiring and end-to-end runs against a SQLite file

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn webapp(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("webapp").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("WEBAPP_DB_DRIVER", "sqlite")
        .env("WEBAPP_DB_NAME", dir.path().join("webapp.db"))
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).unwrap()
}

// === Help ===

#[test]
fn test_users_help() {
    let mut cmd = Command::cargo_bin("webapp").unwrap();
    cmd.arg("users").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Count users"));
}

#[test]
fn test_list_help() {
    let mut cmd = Command::cargo_bin("webapp").unwrap();
    cmd.arg("users").arg("list").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("OFFSET,COUNT"));
}

// === Schema ===

#[test]
fn test_schema_needs_no_database() {
    let mut cmd = Command::cargo_bin("webapp").unwrap();
    cmd.arg("schema").env("WEBAPP_DB_DRIVER", "oracle");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("create table if not exists `users`"))
        .stdout(predicate::str::contains("`email` varchar(50)"))
        .stdout(predicate::str::contains("primary key (`id`)"));
}

#[test]
fn test_schema_renders_driver_column_types() {
    Command::cargo_bin("webapp")
        .unwrap()
        .args(["schema", "--driver", "sqlite"])
        .assert()
        .success()
        .stdout(predicate::str::contains("`admin` integer"))
        .stdout(predicate::str::contains("`created_at` real"));

    Command::cargo_bin("webapp")
        .unwrap()
        .args(["schema", "--driver", "postgres"])
        .assert()
        .success()
        .stdout(predicate::str::contains("create table if not exists \"users\""))
        .stdout(predicate::str::contains("\"admin\" boolean"))
        .stdout(predicate::str::contains("\"created_at\" double precision"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    webapp(&dir)
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_missing_credentials_fail() {
    let dir = TempDir::new().unwrap();
    webapp(&dir)
        .env("WEBAPP_DB_DRIVER", "mysql")
        .env_remove("WEBAPP_DB_USER")
        .env_remove("WEBAPP_DB_PASSWORD")
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required key 'user'"));
}

#[test]
fn test_invalid_limit_rejected() {
    let dir = TempDir::new().unwrap();
    webapp(&dir)
        .args(["users", "list", "--limit", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid limit"));
}

// === End to end ===

#[test]
fn test_user_lifecycle() {
    let dir = TempDir::new().unwrap();

    webapp(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("users"));

    let output = webapp(&dir)
        .args(["users", "add", "--id", "1", "--name", "Ada", "--email", "ada@example.com"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let added = stdout_json(&output.stdout);
    assert_eq!(added["name"], "Ada");
    assert_eq!(added["admin"], false);
    assert!(added["created_at"].as_f64().unwrap() > 0.0);

    webapp(&dir)
        .args(["users", "add", "--id", "2", "--name", "Bob", "--email", "bob@example.com", "--admin"])
        .assert()
        .success();

    let output = webapp(&dir).args(["users", "count"]).output().unwrap();
    assert_eq!(stdout_json(&output.stdout)["count"], 2);

    let output = webapp(&dir)
        .args(["users", "count", "--filter", "`admin` = ?", "--arg", "1"])
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output.stdout)["count"], 1);

    let output = webapp(&dir)
        .args(["users", "list", "--order-by", "`id` desc", "--limit", "1"])
        .output()
        .unwrap();
    let listed = stdout_json(&output.stdout);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], 2);

    let output = webapp(&dir)
        .args(["users", "update", "1", "--email", "ada@lovelace.org"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let output = webapp(&dir).args(["users", "get", "1"]).output().unwrap();
    let fetched = stdout_json(&output.stdout);
    assert_eq!(fetched["email"], "ada@lovelace.org");
    assert_eq!(fetched["created_at"], added["created_at"]);

    webapp(&dir)
        .args(["users", "remove", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"removed\": 1"));

    webapp(&dir)
        .args(["users", "get", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("User 1 not found"));
}

#[test]
fn test_duplicate_add_fails() {
    let dir = TempDir::new().unwrap();
    webapp(&dir).arg("init").assert().success();

    let add = ["users", "add", "--id", "5", "--name", "Eve", "--email", "eve@example.com"];
    webapp(&dir).args(add).assert().success();
    webapp(&dir)
        .args(add)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to add user"));
}
