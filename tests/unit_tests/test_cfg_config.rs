// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use spdu_safety_mapper::cfg::Config;

mod temp_yaml {
    use std::{fs::File, io::Write, path::PathBuf};

    /// Writes `contents` to a unique file under the system temp dir and
    /// returns its path; no fixture crate needed for one throwaway file per
    /// test.
    pub fn write(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("spdu-safety-mapper-test-{name}-{}.yaml", std::process::id()));
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        path
    }
}

const DOC: &str = r#"
providers:
  - NumericId: 1
    SafetyProviderLevel: 2
    SpduId: [1, 2, 3]
    Identity:
      SafetyBaseId: "550e8400-e29b-41d4-a716-446655440000"
      SafetyProviderId: 1
    SafetyDataLength: 4
    NonSafetyDataLength: 0
consumers: []
runtime:
  CyclePeriodMs: 20
  BridgeBindAddr: "127.0.0.1:19000"
  BridgePeerAddr: "127.0.0.1:19001"
"#;

#[test]
fn load_from_file_round_trips_a_real_document() {
    let path = temp_yaml::write("load", DOC);
    let cfg = Config::load_from_file(&path).unwrap();
    assert_eq!(cfg.providers.len(), 1);
    assert_eq!(cfg.providers[0].numeric_id, 1);
    assert_eq!(cfg.runtime.cycle_period_ms, 20);
    std::fs::remove_file(&path).ok();
}

#[test]
fn load_from_file_rejects_missing_file() {
    assert!(Config::load_from_file("/nonexistent/path/to/config.yaml").is_err());
}

#[test]
fn load_from_file_rejects_empty_instance_lists() {
    let empty = r#"
providers: []
consumers: []
runtime:
  CyclePeriodMs: 20
  BridgeBindAddr: "127.0.0.1:19000"
  BridgePeerAddr: "127.0.0.1:19001"
"#;
    let path = temp_yaml::write("empty", empty);
    assert!(Config::load_from_file(&path).is_err());
    std::fs::remove_file(&path).ok();
}
