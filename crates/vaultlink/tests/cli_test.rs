//! Integration tests for the `vaultlink` CLI binary.
//!
//! Argument parsing, local commands, and exit codes run without a router;
//! the roster tests stand up a wiremock JSON-RPC endpoint.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `vaultlink` binary with env isolation.
///
/// Clears all `VAULTLINK_*` env vars and points config directories at an
/// empty temp dir so tests never touch the user's real configuration.
fn vaultlink_cmd(home: &tempfile::TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("vaultlink");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("RUST_LOG")
        .env_remove("VAULTLINK_PROFILE")
        .env_remove("VAULTLINK_ROUTER")
        .env_remove("VAULTLINK_USERNAME")
        .env_remove("VAULTLINK_OUTPUT")
        .env_remove("VAULTLINK_INSECURE")
        .env_remove("VAULTLINK_TIMEOUT")
        .env_remove("VAULTLINK_PASSWORD");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Matches a JSON-RPC POST by method name, and for `call` by module.
struct Rpc(&'static str, Option<&'static str>);

impl Match for Rpc {
    fn matches(&self, request: &Request) -> bool {
        let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
            return false;
        };
        body["method"] == self.0 && self.1.is_none_or(|module| body["params"][1] == module)
    }
}

fn ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 0, "result": result }))
}

async fn mount(server: &MockServer, matcher: Rpc, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .and(matcher)
        .respond_with(response)
        .mount(server)
        .await;
}

/// A router that accepts any login and reports two clients.
async fn router_with_clients(alg: &str) -> MockServer {
    let server = MockServer::start().await;
    mount(
        &server,
        Rpc("challenge", None),
        ok(json!({ "alg": alg, "salt": "saltsalt", "nonce": "nonce123" })),
    )
    .await;
    mount(&server, Rpc("login", None), ok(json!({ "sid": "S1" }))).await;
    mount(&server, Rpc("alive", None), ok(json!({}))).await;
    mount(&server, Rpc("logout", None), ok(json!({}))).await;
    mount(
        &server,
        Rpc("call", Some("clients")),
        ok(json!({ "clients": [
            {
                "mac": "AA:BB:CC:DD:EE:01",
                "ip": "192.168.8.100",
                "name": "laptop",
                "online": true,
                "iface": "5G WiFi",
                "total_rx": 2048,
                "total_tx": 1024
            },
            {
                "mac": "aa-bb-cc-dd-ee-02",
                "ip": "192.168.8.101",
                "name": "printer",
                "online": false,
                "iface": "cable"
            }
        ]})),
    )
    .await;
    server
}

/// Run the binary off the async runtime so wiremock keeps serving.
async fn run_blocking(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = vaultlink_cmd(&home).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    vaultlink_cmd(&home).arg("--help").assert().success().stdout(
        predicate::str::contains("roster")
            .and(predicate::str::contains("run"))
            .and(predicate::str::contains("hash")),
    );
}

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    vaultlink_cmd(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_invalid_output_format() {
    let home = tempfile::tempdir().unwrap();
    vaultlink_cmd(&home)
        .args(["-o", "xml", "hash", "pw", "--salt", "s"])
        .assert()
        .code(2);
}

// ── hash ────────────────────────────────────────────────────────────

#[test]
fn test_hash_matches_md5_crypt_vector() {
    let home = tempfile::tempdir().unwrap();
    vaultlink_cmd(&home)
        .args(["hash", "password", "--salt", "saltsalt", "-o", "plain"])
        .assert()
        .success()
        .stdout("$1$saltsalt$qjXMvbEw8oaL.CzflDtaK/\n");
}

#[test]
fn test_hash_with_nonce_prints_login_hash() {
    let home = tempfile::tempdir().unwrap();
    let output = vaultlink_cmd(&home)
        .args([
            "hash", "password", "--salt", "saltsalt", "--nonce", "nonce123", "-o", "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["alg"], "1");
    assert_eq!(body["hash"], "$1$saltsalt$qjXMvbEw8oaL.CzflDtaK/");
    assert_eq!(body["login_hash"], "1263d18c53c0b1073df65b415f044977");
}

#[test]
fn test_hash_rejects_unsupported_algorithm() {
    let home = tempfile::tempdir().unwrap();
    let output = vaultlink_cmd(&home)
        .args(["hash", "password", "--salt", "saltsalt", "--alg", "5"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("Unsupported crypt algorithm"));
}

// ── config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_points_into_config_dir() {
    let home = tempfile::tempdir().unwrap();
    vaultlink_cmd(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_without_file_prints_defaults() {
    let home = tempfile::tempdir().unwrap();
    vaultlink_cmd(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[defaults]")
                .and(predicate::str::contains("cache_key = \"router_clients:\"")),
        );
}

#[test]
fn test_unknown_profile_is_a_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = vaultlink_cmd(&home)
        .args(["-p", "office", "roster"])
        .env("VAULTLINK_PASSWORD", "password")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("office"));
}

#[test]
fn test_invalid_router_url_is_a_usage_error() {
    let home = tempfile::tempdir().unwrap();
    vaultlink_cmd(&home)
        .args(["--router", "not a url", "roster"])
        .env("VAULTLINK_PASSWORD", "password")
        .assert()
        .code(2);
}

// ── Router-backed commands ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_roster_json_lists_normalized_clients() {
    let server = router_with_clients("1").await;
    let home = tempfile::tempdir().unwrap();
    let mut cmd = vaultlink_cmd(&home);
    cmd.args(["--router", &format!("{}/rpc", server.uri()), "roster", "-o", "json"])
        .env("VAULTLINK_PASSWORD", "password");

    let output = run_blocking(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let devices: Value = serde_json::from_slice(&output.stdout).unwrap();
    let devices = devices.as_array().unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0]["mac"], "aa:bb:cc:dd:ee:01");
    assert_eq!(devices[0]["total_rx"], 2048);
    assert_eq!(devices[1]["mac"], "aa:bb:cc:dd:ee:02");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_roster_online_filter_and_plain_output() {
    let server = router_with_clients("1").await;
    let home = tempfile::tempdir().unwrap();
    let mut cmd = vaultlink_cmd(&home);
    cmd.args([
        "--router",
        &format!("{}/rpc", server.uri()),
        "roster",
        "--online",
        "-o",
        "plain",
    ])
    .env("VAULTLINK_PASSWORD", "password");

    let output = run_blocking(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "aa:bb:cc:dd:ee:01\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_roster_login_with_unsupported_algorithm_exits_auth() {
    let server = router_with_clients("6").await;
    let home = tempfile::tempdir().unwrap();
    let mut cmd = vaultlink_cmd(&home);
    cmd.args(["--router", &format!("{}/rpc", server.uri()), "roster"])
        .env("VAULTLINK_PASSWORD", "password");

    let output = run_blocking(cmd).await;
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_alias_sends_set_info() {
    let server = router_with_clients("1").await;
    let home = tempfile::tempdir().unwrap();
    let mut cmd = vaultlink_cmd(&home);
    cmd.args([
        "--router",
        &format!("{}/rpc", server.uri()),
        "alias",
        "AA-BB-CC-DD-EE-01",
        "Living room TV",
    ])
    .env("VAULTLINK_PASSWORD", "password");

    let output = run_blocking(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("aa:bb:cc:dd:ee:01"));

    let requests = server.received_requests().await.unwrap();
    let set_info = requests
        .iter()
        .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
        .find(|body| body["params"][2] == "set_info")
        .unwrap();
    assert_eq!(set_info["params"][0], "S1");
    assert_eq!(
        set_info["params"][3],
        json!({ "mac": "aa:bb:cc:dd:ee:01", "alias": "Living room TV" })
    );
}
