//! Configuration loading against real files

use std::fs;
use tmon_monitor::{ConfigError, MonitorConfig};

#[test]
fn load_reads_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tmon.toml");
    fs::write(&path, "print_task_tree = false\nlog_filename = \"\"\nlog_level = \"debug\"\n").unwrap();

    let config = MonitorConfig::load(&path).unwrap();
    assert!(!config.print_task_tree);
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.log_path(), None);
}

#[test]
fn existing_log_without_overwrite_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("logs.json");
    fs::write(&log, "{}\n").unwrap();

    let config = MonitorConfig {
        log_overwrite_if_exists: false,
        log_filename: log.display().to_string(),
        ..MonitorConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::LogFileExists { .. })));

    let overwriting = MonitorConfig {
        log_overwrite_if_exists: true,
        ..config
    };
    overwriting.validate().unwrap();
}

#[test]
fn missing_log_file_is_fine_without_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let config = MonitorConfig {
        log_overwrite_if_exists: false,
        log_filename: dir.path().join("fresh.json").display().to_string(),
        ..MonitorConfig::default()
    };
    config.validate().unwrap();
}

#[test]
fn missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = MonitorConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.toml"));
}
