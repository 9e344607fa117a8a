use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "drillhall-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn tester() -> Command {
    Command::new(env!("CARGO_BIN_EXE_drillhall-tester"))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let output_path = temp_path("list");
    let status = tester()
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("smoke"));
    let _ = std::fs::remove_file(output_path);
}

#[test]
fn cli_runs_smoke_with_json_report() {
    let output_path = temp_path("json");
    let output = tester()
        .args([
            "--report",
            "json",
            "--scenarios",
            "smoke,nonexistent",
            "--iterations",
            "1",
            "--seeds",
            "1,phrase:parade",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("Drillhall Automated Tester"));
    assert!(stderr.contains("Unknown scenario"));

    let content = std::fs::read_to_string(&output_path).expect("read output");
    let value: serde_json::Value = serde_json::from_str(&content).expect("json report");
    let rows = value.as_array().expect("array");
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row["passed"] == true));
    let _ = std::fs::remove_file(output_path);
}

#[test]
fn cli_csv_report_covers_every_strategy() {
    let output_path = temp_path("csv");
    let status = tester()
        .args([
            "--report",
            "csv",
            "--scenarios",
            "smoke",
            "--iterations",
            "1",
            "--seeds",
            "7",
            "--max-turns",
            "50",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    let mut lines = content.lines();
    assert!(lines.next().is_some_and(|header| header.starts_with("strategy,seed")));
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 4);
    for strategy in ["Cautious", "Balanced", "Aggressive", "Random"] {
        assert!(rows.iter().any(|row| row.starts_with(strategy)));
    }
    let _ = std::fs::remove_file(output_path);
}

#[test]
fn cli_rejects_unparseable_seeds() {
    let output = tester()
        .args(["--seeds", "not-a-seed", "--report", "json"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unrecognized seed token"));
}

#[test]
fn cli_rejects_unreadable_data_dir_files() {
    let dir = temp_path("data");
    std::fs::create_dir_all(&dir).expect("create data dir");
    std::fs::write(dir.join("rules.json"), "{ not json").expect("write rules");
    let output = tester()
        .args(["--report", "json", "--data-dir"])
        .arg(&dir)
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load assets"));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn cli_watch_mode_plays_a_short_run() {
    let output_path = temp_path("watch");
    let status = tester()
        .args([
            "--mode",
            "watch",
            "--strategy",
            "cautious",
            "--max-turns",
            "5",
            "--tick-ms",
            "0",
            "--turn-delay-ms",
            "0",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    assert!(content.contains("Turn 1"));
    assert!(content.contains("Stopped at turn cap 5"));
    let _ = std::fs::remove_file(output_path);
}
