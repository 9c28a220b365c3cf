//! Tests for the airtrend command line

mod common;

use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::Arc;

use common::{FakeRasterHost, FakeSearch, spawn_rasters, spawn_search, yearly_files};
use serde_json::json;

fn write_config(name: &str, search_url: &str, raster_base: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "airtrend-cli-{name}-{}.toml",
        std::process::id()
    ));
    let contents = format!(
        r#"
active_dataset = "so2"

[geocoder]
base_url = "{search_url}"
axis_order = "easting_northing"

[logging]
level = "info"
format = "json"

[datasets.so2]
name = "Sulfur dioxide"
url_template = "{raster_base}/so2_{{year}}.tif"
first_year = 1980
last_year = 1984
threshold = 30.0
units = "ug/m3"
overlay_tiles = "https://tiles.invalid/{{z}}/{{x}}/{{y}}.png"
"#
    );
    std::fs::write(&path, contents).unwrap();
    path
}

async fn run_cli(args: Vec<String>) -> Output {
    tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_airtrend"))
            .args(&args)
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute command")
    })
    .await
    .unwrap()
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_airtrend"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("query"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_query_with_json_logs_keeps_stdout_clean() {
    let search = Arc::new(FakeSearch::new().with_place(
        "Luzern",
        json!({ "x": 2600000.0, "y": 1200000.0, "lat": 47.0, "lon": 8.3 }),
    ));
    let host = Arc::new(FakeRasterHost::new(yearly_files(&[
        (1980, 12.1),
        (1981, 10.4),
        (1983, 8.2),
        (1984, 7.9),
    ])));
    let path = write_config(
        "json",
        &spawn_search(search).await,
        &spawn_rasters(host).await,
    );

    let output = run_cli(vec![
        "--config".to_string(),
        path.to_string_lossy().into_owned(),
        "query".to_string(),
        "Luzern".to_string(),
    ])
    .await;
    std::fs::remove_file(&path).ok();

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {stderr}");

    assert!(stdout.contains("12.1"));
    assert!(stdout.contains("no data"));
    assert!(
        stdout.lines().all(|line| !line.trim_start().starts_with('{')),
        "log lines on stdout: {stdout}"
    );
    assert!(stderr.contains("Geocoding place"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_query_unknown_place_fails() {
    let search = Arc::new(FakeSearch::new());
    let host = Arc::new(FakeRasterHost::new(yearly_files(&[(1980, 12.1)])));
    let path = write_config(
        "unknown",
        &spawn_search(search).await,
        &spawn_rasters(host.clone()).await,
    );

    let output = run_cli(vec![
        "--config".to_string(),
        path.to_string_lossy().into_owned(),
        "query".to_string(),
        "Nonexistentville".to_string(),
    ])
    .await;
    std::fs::remove_file(&path).ok();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Nonexistentville"));
    assert_eq!(host.requests(), 0);
}
