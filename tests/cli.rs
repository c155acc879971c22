use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn write_config(xml: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp config");
    tmp.write_all(xml.as_bytes()).expect("write config");
    tmp
}

#[test]
fn headless_run_prints_summary() {
    let mut cmd = Command::cargo_bin("neon-city").expect("binary exists");
    cmd.args(["--headless", "--seed", "7", "--frames", "30"]);
    cmd.assert()
        .success()
        .stdout(contains("Generated 100 buildings"))
        .stdout(contains("Rendered 30 frames"))
        .stdout(contains("Camera ended at ("))
        .stdout(contains("Final score: 0"));
}

#[test]
fn scripted_clicks_score_points() {
    let mut cmd = Command::cargo_bin("neon-city").expect("binary exists");
    cmd.args(["--headless", "--seed", "3", "--frames", "120", "--clicks", "2"]);
    cmd.assert()
        .success()
        .stdout(contains("Clicks registered: 2"))
        .stdout(contains("Final score:"));
}

#[test]
fn config_file_overrides_grid_size() {
    let config = write_config(
        r#"<city>
  <grid_size>4</grid_size>
  <spacing>12</spacing>
  <palette>
    <color>1 0 1</color>
  </palette>
</city>
"#,
    );
    let mut cmd = Command::cargo_bin("neon-city").expect("binary exists");
    cmd.arg("--config")
        .arg(config.path())
        .args(["--headless", "--frames", "1"]);
    cmd.assert()
        .success()
        .stdout(contains("Generated 16 buildings"));
}

#[test]
fn invalid_config_fails() {
    let config = write_config("<city><grid_size>0</grid_size></city>");
    let mut cmd = Command::cargo_bin("neon-city").expect("binary exists");
    cmd.arg("--config").arg(config.path()).arg("--headless");
    cmd.assert().failure().stderr(contains("invalid config"));
}
