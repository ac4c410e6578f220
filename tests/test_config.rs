use std::fs;

use cantstop_sim::config::*;

#[test]
fn test_defaults_are_valid() {
    let config = SimConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.trials, 2500);
    assert_eq!(config.contract, ContractMode::Strict);
}

#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join("cantstop_sim_test_config.json");
    fs::write(&path, r#"{ "trials": 100, "contract": "lenient", "target_columns": 2 }"#).unwrap();
    let config = SimConfig::load(&path).unwrap();
    fs::remove_file(&path).ok();
    assert_eq!(config.trials, 100);
    assert_eq!(config.contract, ContractMode::Lenient);
    assert_eq!(config.target_columns, 2);
    assert_eq!(config.max_turns, SimConfig::default().max_turns);
}

#[test]
fn test_load_rejects_invalid_values() {
    let path = std::env::temp_dir().join("cantstop_sim_test_bad_config.json");
    fs::write(&path, r#"{ "trials": 0 }"#).unwrap();
    let result = SimConfig::load(&path);
    fs::remove_file(&path).ok();
    assert!(result.is_err());
}

#[test]
fn test_load_missing_file() {
    let path = std::env::temp_dir().join("cantstop_sim_no_such_config.json");
    assert!(SimConfig::load(&path).is_err());
}
