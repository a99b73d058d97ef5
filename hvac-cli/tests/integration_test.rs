//! End-to-end tests for the `hvac` binary
//!
//! These run the compiled binary against a proxy URL nobody listens on,
//! covering argument handling and the offline paths.

use std::net::TcpListener;
use std::process::Command;

fn hvac() -> Command {
    Command::new(env!("CARGO_BIN_EXE_hvac"))
}

/// A loopback URL with nothing behind it
fn dead_proxy_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    drop(listener);
    format!("http://{}", addr)
}

#[test]
fn test_help_lists_commands() {
    let output = hvac().arg("--help").output().expect("Failed to run hvac");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for command in ["serve", "read", "info", "set"] {
        assert!(stdout.contains(command), "Missing {} command", command);
    }
}

#[test]
fn test_info_falls_back_to_unknown() {
    let output = hvac()
        .args(["info", "--proxy-url", &dead_proxy_url()])
        .output()
        .expect("Failed to run hvac info");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Serial number: Unknown"), "stdout: {}", stdout);
}

#[test]
fn test_read_fails_when_offline() {
    let output = hvac()
        .args(["read", "--proxy-url", &dead_proxy_url()])
        .output()
        .expect("Failed to run hvac read");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Device is offline"), "stderr: {}", stderr);
}

#[test]
fn test_set_without_changes_is_rejected() {
    let output = hvac()
        .args(["set", "--proxy-url", &dead_proxy_url()])
        .output()
        .expect("Failed to run hvac set");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Nothing to change"), "stderr: {}", stderr);
}

#[test]
fn test_set_rejects_unknown_fan() {
    let output = hvac()
        .args(["set", "--fan", "turbo"])
        .output()
        .expect("Failed to run hvac set");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("turbo"), "stderr: {}", stderr);
}
