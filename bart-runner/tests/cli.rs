use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "bart-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn run_with_stdin(args: &[&str], input: &str) -> Output {
    let exe = env!("CARGO_BIN_EXE_bart-runner");
    let mut child = Command::new(exe)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn cli");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("run cli")
}

#[test]
fn cli_simulation_writes_json_report() {
    let exe = env!("CARGO_BIN_EXE_bart-runner");
    let output_path = temp_path("simulate.json");
    let status = Command::new(exe)
        .args([
            "--mode",
            "simulate",
            "--variant",
            "risk",
            "--rounds",
            "30",
            "--strategies",
            "fixed:2,cautious",
            "--seeds",
            "7",
            "--iterations",
            "3",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());

    let content = std::fs::read_to_string(output_path).expect("read output");
    let value: serde_json::Value = serde_json::from_str(&content).expect("json report");
    assert_eq!(value["aggregates"].as_array().unwrap().len(), 2);
    let sessions = value["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 6);
    assert_eq!(sessions[2]["seed"], 9);
    assert_eq!(sessions[0]["report"]["summary"]["rounds"], 30);
}

#[test]
fn cli_table_mode_prints_bundled_curve() {
    let exe = env!("CARGO_BIN_EXE_bart-runner");
    let output = Command::new(exe)
        .args(["--mode", "table", "--report", "csv"])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "size,standard");
    assert_eq!(lines.len(), 11);
    assert_eq!(lines[10], "10,1");
}

#[test]
fn cli_interactive_session_exports_data() {
    let export_dir = temp_path("export");
    let output = run_with_stdin(
        &[
            "--rounds",
            "2",
            "--participant",
            "0042",
            "--seed",
            "5",
            "--report",
            "csv",
            "--export-dir",
            export_dir.to_str().unwrap(),
        ],
        "b\n\nb\n",
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let export = std::fs::read_to_string(export_dir.join("BART_basic_data_0042.csv"))
        .expect("read export");
    let lines: Vec<&str> = export.lines().collect();
    assert_eq!(lines[0], "round,balloon_type,final_size,outcome,earnings,bank_total");
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[3], "bank_total,0");
}

#[test]
fn cli_quit_keeps_completed_rounds() {
    let export_dir = temp_path("quit");
    let output = run_with_stdin(
        &[
            "--rounds",
            "5",
            "--participant",
            "0100",
            "--export-dir",
            export_dir.to_str().unwrap(),
        ],
        "b\nq\n",
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Session ended early"));

    let export = std::fs::read_to_string(export_dir.join("BART_basic_data_0100.csv"))
        .expect("read export");
    assert_eq!(export.lines().count(), 3);
}

#[test]
fn cli_rejects_bad_participant_id() {
    let exe = env!("CARGO_BIN_EXE_bart-runner");
    let output = Command::new(exe)
        .args(["--mode", "table", "--participant", "42"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("participant id"));
}

#[test]
fn cli_rejects_malformed_table_file() {
    let table = temp_path("bad-table.csv");
    std::fs::write(&table, "size,probability\n1,0.5\n2,2.0\n").expect("write table");
    let exe = env!("CARGO_BIN_EXE_bart-runner");
    let output = Command::new(exe)
        .args(["--mode", "table", "--table"])
        .arg(&table)
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("could not load probability table"));
}

#[test]
fn cli_sends_trigger_on_bank() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    let export_dir = temp_path("trigger");
    let output = run_with_stdin(
        &[
            "--rounds",
            "1",
            "--trigger-addr",
            &addr,
            "--export-dir",
            export_dir.to_str().unwrap(),
        ],
        "b\n",
    );
    assert!(output.status.success());

    let (mut peer, _) = listener.accept().expect("accept");
    let mut received = String::new();
    peer.read_to_string(&mut received).expect("read triggers");
    assert_eq!(received, "<TRIGGER>7</TRIGGER>");
}
