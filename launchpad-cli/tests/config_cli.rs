use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use predicates::str::contains;

fn launchpad_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("launchpad").expect("launchpad binary");
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("LAUNCHPAD_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn init(home: &TempDir, token: Option<&str>) {
    let mut cmd = launchpad_cmd(home.path());
    cmd.args([
        "config",
        "init",
        "--api-url",
        "http://127.0.0.1:9/api/",
        "--live-url",
        "ws://127.0.0.1:9/live",
    ]);
    if let Some(token) = token {
        cmd.args(["--token", token]);
    }
    cmd.assert().success().stdout(contains("Settings written"));
}

#[test]
fn init_writes_settings_file() {
    let home = TempDir::new().expect("home");
    init(&home, Some("secret-token"));

    let file = home.child(".launchpad/config.yaml");
    file.assert(predicate::path::exists());
    file.assert(contains("api_url: http://127.0.0.1:9/api"));
    file.assert(contains("secret-token"));
}

#[test]
fn show_masks_token() {
    let home = TempDir::new().expect("home");
    init(&home, Some("secret-token"));

    launchpad_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("http://127.0.0.1:9/api"))
        .stdout(contains("stored"))
        .stdout(contains("secret-token").not());
}

#[test]
fn show_json_reports_token_source() {
    let home = TempDir::new().expect("home");
    init(&home, None);

    let output = launchpad_cmd(home.path())
        .args(["config", "show", "--json"])
        .env("LAUNCHPAD_TOKEN", "from-env")
        .output()
        .expect("run");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["token"], "environment");
    assert_eq!(value["live_url"], "ws://127.0.0.1:9/live");
    assert_eq!(value["default_web_root"], "public_html");
}

#[test]
fn show_without_settings_points_to_init() {
    let home = TempDir::new().expect("home");
    launchpad_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(contains("launchpad config init"));
}

#[test]
fn commands_need_a_token() {
    let home = TempDir::new().expect("home");
    init(&home, None);

    launchpad_cmd(home.path())
        .args(["hosting", "list"])
        .assert()
        .failure()
        .stderr(contains("LAUNCHPAD_TOKEN"));
}

#[test]
fn deploy_requires_a_target() {
    let home = TempDir::new().expect("home");
    launchpad_cmd(home.path())
        .args(["deploy", "proj-1"])
        .assert()
        .failure()
        .stderr(contains("--hosting").or(contains("--managed")));

    launchpad_cmd(home.path())
        .args(["deploy", "proj-1", "--managed", "--hosting", "h1"])
        .assert()
        .failure();
}

#[test]
fn blank_domain_is_rejected_before_any_request() {
    let home = TempDir::new().expect("home");
    launchpad_cmd(home.path())
        .args(["domain", "check", "  www. "])
        .assert()
        .failure()
        .stderr(contains("please enter a domain name"));
}
