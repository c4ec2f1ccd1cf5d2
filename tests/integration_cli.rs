use std::path::PathBuf;
use std::process::Command;

fn get_cli_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_airdrop-cli"))
}

fn write_config(name: &str, json: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("airdrop-cli-{}-{name}.json", std::process::id()));
    std::fs::write(&path, json).expect("Failed to write config");
    path
}

#[test]
fn test_cli_evaluate_table() {
    let output = Command::new(get_cli_binary())
        .args(["evaluate", "--samples", "60"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("DROP EVALUATION"), "Should contain evaluation table: {stdout}");
    assert!(stdout.contains("Decision"), "Should contain the decision");
}

#[test]
fn test_cli_evaluate_json() {
    let output = Command::new(get_cli_binary())
        .args(["evaluate", "--samples", "60", "--seed", "7", "--doctrine", "strict", "-o", "json"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("Should be JSON");
    assert_eq!(value["n_samples"], 60);
    assert_eq!(value["random_seed"], 7);
    assert_eq!(value["doctrine"], "STRICT");
    let p_hit = value["p_hit"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&p_hit));
}

#[test]
fn test_cli_small_sample_forces_no_drop() {
    let output = Command::new(get_cli_binary())
        .args(["evaluate", "--samples", "10", "--threshold", "0", "-o", "json"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command should succeed");
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["decision"], "NO DROP");
    assert_eq!(value["sample_guard"], true);
}

#[test]
fn test_cli_evaluate_with_analysis() {
    let output = Command::new(get_cli_binary())
        .args(["evaluate", "--samples", "60", "--analysis", "fast", "-o", "json"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command should succeed");
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["analyses"]["mode"], "fast");
    assert!(value["analyses"]["fragility"].is_object());
}

#[test]
fn test_cli_evaluate_from_config_file() {
    let path = write_config(
        "calm",
        r#"{
            "environment": { "wind_mean": [0.0, 0.0, 0.0], "wind_std": 0.0 },
            "simulation": { "n_samples": 40, "random_seed": 1 }
        }"#,
    );
    let output = Command::new(get_cli_binary())
        .args(["evaluate", "-o", "json", "--config"])
        .arg(&path)
        .output()
        .expect("Failed to execute command");
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success(), "Command should succeed");
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["n_samples"], 40);
    // No wind noise: every trial lands on the same point
    let points = value["impact_points"].as_array().unwrap();
    assert!(points.iter().all(|p| p == &points[0]));
}

#[test]
fn test_cli_monte_carlo_csv() {
    let output = Command::new(get_cli_binary())
        .args(["monte-carlo", "--samples", "25"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("x,y,speed"));
    assert_eq!(lines.count(), 25);
}

#[test]
fn test_cli_monte_carlo_is_reproducible() {
    let run = || {
        Command::new(get_cli_binary())
            .args(["monte-carlo", "--samples", "20", "--seed", "99", "-o", "json"])
            .output()
            .expect("Failed to execute command")
    };
    let first = run();
    let second = run();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn test_cli_thread_count_does_not_change_results() {
    let run = |extra: &[&str]| {
        Command::new(get_cli_binary())
            .args(["monte-carlo", "--samples", "20", "--seed", "99", "-o", "json"])
            .args(extra)
            .output()
            .expect("Failed to execute command")
    };
    let default_pool = run(&[]);
    let two_threads = run(&["--threads", "2"]);
    assert!(two_threads.status.success());
    assert_eq!(default_pool.stdout, two_threads.stdout);

    let evaluated = Command::new(get_cli_binary())
        .args(["evaluate", "--samples", "40", "--threads", "1", "-o", "json"])
        .output()
        .expect("Failed to execute command");
    assert!(evaluated.status.success());

    assert!(!run(&["--threads", "0"]).status.success(), "Zero threads should fail");
}

#[test]
fn test_cli_rejects_misspelled_config_key() {
    let path = write_config("typo", r#"{ "payload": { "mass": 2.0, "drag_coeficient": 5.0 } }"#);
    let output = Command::new(get_cli_binary())
        .args(["evaluate", "--config"])
        .arg(&path)
        .output()
        .expect("Failed to execute command");
    let _ = std::fs::remove_file(&path);

    assert!(!output.status.success(), "Misspelled key should fail");
    assert!(String::from_utf8_lossy(&output.stderr).contains("drag_coeficient"));
}

#[test]
fn test_cli_stability_check() {
    let output = Command::new(get_cli_binary())
        .args(["stability-check", "--samples", "5"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Explicit Euler"));
    assert!(stdout.contains("PASS") || stdout.contains("CAUTION"));
}

#[test]
fn test_cli_help() {
    let output = Command::new(get_cli_binary())
        .args(["--help"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Help command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("evaluate"), "Should list evaluate command");
    assert!(stdout.contains("monte-carlo"), "Should list monte-carlo command");
    assert!(stdout.contains("stability-check"), "Should list stability-check command");
    assert!(stdout.contains("info"), "Should list info command");
}

#[test]
fn test_cli_info() {
    let output = Command::new(get_cli_binary())
        .args(["info"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("AIRDROP ENGINE"));
}

#[test]
fn test_cli_invalid_command() {
    let output = Command::new(get_cli_binary())
        .args(["invalid-command"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Invalid command should fail");
}

#[test]
fn test_cli_rejects_unknown_doctrine() {
    let output = Command::new(get_cli_binary())
        .args(["evaluate", "--samples", "30", "--doctrine", "reckless"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Unknown doctrine should fail");
    assert!(String::from_utf8_lossy(&output.stderr).contains("reckless"));
}

#[test]
fn test_cli_rejects_zero_samples() {
    let output = Command::new(get_cli_binary())
        .args(["monte-carlo", "--samples", "0"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Zero samples should fail");
}

#[test]
fn test_cli_threshold_conflicts_with_policy() {
    let output = Command::new(get_cli_binary())
        .args(["evaluate", "--threshold", "80", "--policy", "balanced"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
}
