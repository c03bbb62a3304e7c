use std::fs;
use std::net::TcpListener;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const SESSION_LOG: &str = concat!(
    r#"{"timestamp":"2026-02-23T00:00:00Z","type":"session_meta","payload":{"id":"s1","cwd":"/work"}}"#,
    "\n",
    r#"{"timestamp":"2026-02-23T00:00:01Z","type":"event_msg","payload":{"type":"user_message","kind":"plain","message":"hello"}}"#,
    "\n",
);

fn codexview() -> Command {
    let mut cmd = Command::cargo_bin("codexview").expect("binary");
    cmd.env_remove("CODEXVIEW_HOST")
        .env_remove("CODEXVIEW_PORT")
        .env_remove("CODEXVIEW_GIT")
        .env_remove("CODEXVIEW_UPLOAD_FN")
        .env("CODEXVIEW_LOG", "off");
    cmd
}

#[test]
fn log_flag_is_required() {
    codexview()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--log"));
}

#[test]
fn help_lists_flags() {
    codexview()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--port"))
        .stdout(predicate::str::contains("--upload-fn"));
}

#[test]
fn missing_log_file_fails() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("absent.jsonl");

    codexview()
        .arg("--log")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error: log file not found"));
}

#[test]
fn blank_log_file_fails() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("blank.jsonl");
    fs::write(&path, "\n   \n").expect("write");

    codexview()
        .arg("-l")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no entries were parsed"));
}

#[test]
fn non_utf8_log_file_fails() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("binary.jsonl");
    fs::write(&path, [0xff_u8, 0xfe, 0xfd]).expect("write");

    codexview()
        .arg("--log")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not valid UTF-8"));
}

#[test]
fn invalid_port_is_rejected() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("session.jsonl");
    fs::write(&path, SESSION_LOG).expect("write");

    codexview()
        .arg("--log")
        .arg(&path)
        .args(["--port", "not-a-port"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn occupied_port_reports_bind_failure() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("session.jsonl");
    fs::write(&path, SESSION_LOG).expect("write");

    let holder = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = holder.local_addr().expect("addr").port();

    codexview()
        .arg("--log")
        .arg(&path)
        .args(["--host", "127.0.0.1", "--port", &port.to_string()])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Serving log on").not())
        .stderr(predicate::str::contains("error: failed to bind 127.0.0.1:"));
}

#[test]
fn unparseable_port_env_is_rejected() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("session.jsonl");
    fs::write(&path, SESSION_LOG).expect("write");

    codexview()
        .arg("--log")
        .arg(&path)
        .env("CODEXVIEW_PORT", "eighty")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "error: invalid value for CODEXVIEW_PORT: eighty",
        ));
}
