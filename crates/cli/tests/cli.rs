use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_init_writes_config() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("model.json");

    let mut cmd = Command::cargo_bin("shoal").unwrap();
    cmd.arg("init")
        .arg("--output")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Example configuration written"));

    assert!(config.exists());
}

#[test]
fn test_init_refuses_to_overwrite() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("model.json");
    std::fs::write(&config, "{}").unwrap();

    let mut cmd = Command::cargo_bin("shoal").unwrap();
    cmd.arg("init")
        .arg("--output")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_validate_example() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("model.json");

    Command::cargo_bin("shoal")
        .unwrap()
        .arg("init")
        .arg("--output")
        .arg(&config)
        .assert()
        .success();

    Command::cargo_bin("shoal")
        .unwrap()
        .arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid: 2 categories"));
}

#[test]
fn test_validate_lists_errors() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("broken.json");
    std::fs::write(
        &config,
        r#"{
            "model": {"start_year": 2000, "final_year": 2005, "min_age": 1, "max_age": 10,
                      "time_steps": [{"label": "annual", "processes": ["ageing", "missing"]}]},
            "categories": {"names": ["stock"]},
            "processes": [{"label": "ageing", "type": "ageing", "categories": ["nobody"]}]
        }"#,
    )
    .unwrap();

    Command::cargo_bin("shoal")
        .unwrap()
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stdout(predicate::str::contains("error(s):"))
        .stdout(predicate::str::contains("process 'missing' has not been defined"));
}

#[test]
fn test_run_writes_report() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("model.json");
    let report = temp.path().join("report.json");

    Command::cargo_bin("shoal")
        .unwrap()
        .arg("init")
        .arg("--output")
        .arg(&config)
        .assert()
        .success();

    Command::cargo_bin("shoal")
        .unwrap()
        .arg("run")
        .arg(&config)
        .arg("--output")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("Objective Function"))
        .stdout(predicate::str::contains("equilibrium"));

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert!(json["objective"]["total"].is_number());
    assert_eq!(json["partition"].as_array().unwrap().len(), 2);
}

#[test]
fn test_sample_is_reproducible() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("model.json");

    Command::cargo_bin("shoal")
        .unwrap()
        .arg("init")
        .arg("--output")
        .arg(&config)
        .assert()
        .success();

    let run = || {
        Command::cargo_bin("shoal")
            .unwrap()
            .args(["sample", "--count", "4", "--seed", "7"])
            .arg(&config)
            .output()
            .unwrap()
    };
    let first = run();
    let second = run();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);

    let stdout = String::from_utf8(first.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "process[recruitment].r0,objective");
    assert_eq!(lines.len(), 5);
}
