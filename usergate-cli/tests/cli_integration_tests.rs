//! Integration tests for usergate CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn usergate() -> Command {
    let mut cmd = Command::cargo_bin("usergate").unwrap();
    cmd.env_remove("USERGATE_AUTH_TOKEN")
        .env_remove("USERGATE_BIND_ADDRESS")
        .env_remove("USERGATE_DEBUG");
    cmd
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

/// Test the version command
#[test]
fn test_cli_version() {
    usergate()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("usergate"));
}

/// Test the help command
#[test]
fn test_cli_help() {
    usergate()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bearer token"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("routes"))
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_routes_text() {
    usergate()
        .arg("routes")
        .assert()
        .success()
        .stdout(predicate::str::contains("/api/rest/users/{userId}"))
        .stdout(predicate::str::contains("get-one"))
        .stdout(predicate::str::contains("DELETE"));
}

#[test]
fn test_routes_json() {
    let output = usergate()
        .args(["routes", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let routes: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let routes = routes.as_array().unwrap();
    assert_eq!(routes.len(), 5);
    assert_eq!(routes[0]["method"], "GET");
    assert_eq!(routes[0]["template"], "/api/rest/users");
    assert_eq!(routes[0]["operation"], "list");
}

#[test]
fn test_routes_custom_prefix() {
    usergate()
        .args(["routes", "--prefix", "/v2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/v2/users/{userId}"));
}

#[test]
fn test_resolve_get_one() {
    usergate()
        .args(["resolve", "GET", "/api/rest/users/42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("get-one"))
        .stdout(predicate::str::contains("userId = 42"));
}

#[test]
fn test_resolve_collection_is_list() {
    usergate()
        .args(["resolve", "get", "/api/rest/users"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("get-one").not());
}

#[test]
fn test_resolve_json() {
    let output = usergate()
        .args(["resolve", "DELETE", "/api/rest/users/42", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let resolution: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(resolution["operation"], "delete");
    assert_eq!(resolution["params"]["userId"], "42");
    assert_eq!(resolution["protected"], true);
}

#[test]
fn test_resolve_unbound_method_fails() {
    usergate()
        .args(["resolve", "PUT", "/api/rest/users/42"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("405"))
        .stdout(predicate::str::contains("PATCH"));
}

#[test]
fn test_resolve_unknown_path_fails() {
    usergate()
        .args(["resolve", "GET", "/api/rest/orders"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("404"));
}

#[test]
fn test_resolve_rejects_unknown_method() {
    usergate()
        .args(["resolve", "BREW", "/api/rest/users"])
        .assert()
        .failure();
}

#[test]
fn test_check_allowed() {
    usergate()
        .args(["check", "--token", "your_valid_token", "Bearer your_valid_token"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ALLOWED"));
}

#[test]
fn test_check_invalid_token() {
    usergate()
        .args(["check", "--token", "your_valid_token", "Bearer your_valid_toke"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("DENIED"))
        .stdout(predicate::str::contains("invalid_token"));
}

#[test]
fn test_check_malformed_header() {
    usergate()
        .args(["check", "--token", "your_valid_token", "your_valid_token"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("malformed_header"));
}

#[test]
fn test_check_missing_header() {
    usergate()
        .args(["check", "--token", "your_valid_token"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("missing_header"));
}

#[test]
fn test_check_token_from_environment() {
    usergate()
        .env("USERGATE_AUTH_TOKEN", "from-env")
        .args(["check", "Bearer from-env"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ALLOWED"));
}

#[test]
fn test_check_token_from_config_file() {
    let file = config_file("[auth]\ntoken = \"from-file\"\n");
    usergate()
        .arg("check")
        .arg("--config")
        .arg(file.path())
        .arg("Bearer from-file")
        .assert()
        .success()
        .stdout(predicate::str::contains("ALLOWED"));
}

#[test]
fn test_check_without_token_fails() {
    usergate()
        .args(["check", "Bearer anything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no auth token configured"));
}

#[test]
fn test_validate_valid_config() {
    let file = config_file(
        r#"
[server]
bind_address = "127.0.0.1:7002"

[auth]
token = "change-me"
protected_prefix = "/api/rest"
"#,
    );

    usergate()
        .arg("validate")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("127.0.0.1:7002"));
}

#[test]
fn test_validate_missing_token() {
    let file = config_file("[server]\nbind_address = \"127.0.0.1:7002\"\n");

    usergate()
        .arg("validate")
        .arg(file.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Configuration is invalid"));
}

#[test]
fn test_validate_token_from_environment() {
    let file = config_file("[server]\nbind_address = \"127.0.0.1:7002\"\n");

    usergate()
        .env("USERGATE_AUTH_TOKEN", "from-env")
        .arg("validate")
        .arg(file.path())
        .assert()
        .success();
}

#[test]
fn test_validate_bad_prefix() {
    let file = config_file("[auth]\ntoken = \"t\"\nprotected_prefix = \"api/rest/\"\n");

    usergate()
        .arg("validate")
        .arg(file.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("protected_prefix"));
}

#[test]
fn test_validate_unknown_field() {
    let file = config_file("[auth]\ntoken = \"t\"\nport = 7002\n");

    usergate()
        .arg("validate")
        .arg(file.path())
        .assert()
        .failure();
}

#[test]
fn test_validate_missing_file() {
    usergate()
        .args(["validate", "/nonexistent/usergate.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read configuration"));
}

#[test]
fn test_serve_refuses_to_start_without_token() {
    usergate()
        .args(["serve", "--bind", "127.0.0.1:0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no auth token configured"));
}

#[test]
fn test_verbose_flag() {
    usergate()
        .args(["--verbose", "routes"])
        .assert()
        .success();
}
