use std::io::Write;
use std::time::Duration;

use campus::config::{self, CliArgs};
use clap::Parser;
use serial_test::serial;
use tempfile::NamedTempFile;

const BASE_URL_VAR: &str = "CAMPUS__API__BASE_URL";
const MAX_ENTRIES_VAR: &str = "CAMPUS__CACHE__MAX_ENTRIES";

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tmp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

fn clear_env() {
    // SAFETY: tests touching the environment are serialized.
    unsafe {
        std::env::remove_var(BASE_URL_VAR);
        std::env::remove_var(MAX_ENTRIES_VAR);
    }
}

#[test]
#[serial]
fn file_then_env_then_cli() {
    clear_env();
    let file = config_file(
        r#"
[api]
base_url = "https://file.example/api"
timeout_seconds = 30

[cache]
max_entries = 16
deduping_interval_ms = 500

[list]
per_page = 25
"#,
    );
    // SAFETY: serialized with the other env tests.
    unsafe { std::env::set_var(MAX_ENTRIES_VAR, "32") };

    let path = file.path().to_string_lossy().into_owned();
    let args = CliArgs::parse_from(["campus", "--config-file", &path, "list", "tags"]);
    let settings = config::load(&args).expect("settings");

    assert_eq!(
        settings.api.require_base_url().expect("url").as_str(),
        "https://file.example/api"
    );
    assert_eq!(settings.api.timeout, Duration::from_secs(30));
    assert_eq!(settings.cache.max_entries, 32);
    assert_eq!(settings.cache.deduping_interval_ms, 500);
    assert_eq!(settings.list.per_page, 25);

    let args = CliArgs::parse_from([
        "campus",
        "--config-file",
        &path,
        "--api-url",
        "https://cli.example/api",
        "list",
        "tags",
    ]);
    let settings = config::load(&args).expect("settings");
    assert_eq!(
        settings.api.require_base_url().expect("url").as_str(),
        "https://cli.example/api"
    );
    clear_env();
}

#[test]
#[serial]
fn env_base_url_is_validated() {
    clear_env();
    // SAFETY: serialized with the other env tests.
    unsafe { std::env::set_var(BASE_URL_VAR, "file:///etc/passwd") };

    let args = CliArgs::parse_from(["campus", "list", "tags"]);
    let err = config::load(&args).expect_err("unsupported scheme");
    assert!(err.to_string().contains("api.base_url"), "{err}");
    clear_env();
}

#[test]
#[serial]
fn missing_explicit_config_file_is_an_error() {
    clear_env();
    let args = CliArgs::parse_from([
        "campus",
        "--config-file",
        "/nonexistent/campus.toml",
        "list",
        "tags",
    ]);
    assert!(matches!(
        config::load(&args),
        Err(config::LoadError::Build(_))
    ));
}
