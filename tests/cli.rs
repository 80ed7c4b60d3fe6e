use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Command pointed at a config path that does not exist, so defaults apply
fn netprobe(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("netprobe").unwrap();
    let config: PathBuf = dir.path().join("absent.toml");
    cmd.arg("--config").arg(config);
    cmd
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("netprobe").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("netprobe 0.1.0"));
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("netprobe").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Port scanning, IP lookup, DNS"));
}

#[test]
fn test_cli_scan_missing_host() {
    let dir = TempDir::new().unwrap();
    netprobe(&dir)
        .arg("scan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required arguments were not provided"));
}

#[test]
fn test_cli_scan_local_listener() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let dir = TempDir::new().unwrap();
    netprobe(&dir)
        .args(["scan", "127.0.0.1", "--timeout-ms", "500", "--ports"])
        .arg(format!("{},1", port))
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("\"port\": {}", port)))
        .stdout(predicate::str::contains("\"total_scanned\": 2"));
}

#[test]
fn test_cli_scan_rejects_bad_port() {
    let dir = TempDir::new().unwrap();
    netprobe(&dir)
        .args(["scan", "127.0.0.1", "--ports", "22,70000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn test_cli_exec_rejects_unlisted_command() {
    let dir = TempDir::new().unwrap();
    netprobe(&dir)
        .args(["exec", "rm -rf /"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in the allowlist"));
}

#[cfg(unix)]
#[test]
fn test_cli_exec_runs_allowlisted_command() {
    let dir = TempDir::new().unwrap();
    netprobe(&dir)
        .args(["exec", "echo \"a; rm -rf /\""])
        .assert()
        .success()
        .stdout(predicate::str::contains("a; rm -rf /"))
        .stdout(predicate::str::contains("\"exit_code\": 0"));
}

#[test]
fn test_cli_commands_lists_allowlist() {
    let dir = TempDir::new().unwrap();
    netprobe(&dir)
        .arg("commands")
        .assert()
        .success()
        .stdout(predicate::str::contains("ping"))
        .stdout(predicate::str::contains("DNS lookup utility"));
}

#[test]
fn test_cli_tools() {
    let dir = TempDir::new().unwrap();
    netprobe(&dir)
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("Port Scanner"));

    netprobe(&dir)
        .args(["tools", "--category", "web"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dns_lookup"))
        .stdout(predicate::str::contains("port_scanner").not());
}

#[test]
fn test_cli_invalid_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[logging]\nlevel = \"loud\"\n").unwrap();

    let mut cmd = Command::cargo_bin("netprobe").unwrap();
    cmd.arg("--config")
        .arg(&path)
        .arg("tools")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log level"));
}
