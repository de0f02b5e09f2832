//! ---
//! mgw_section: "15-testing-qa-runbook"
//! mgw_subsection: "integration-tests"
//! mgw_type: "source"
//! mgw_scope: "code"
//! mgw_description: "Validation of the shipped example configurations."
//! mgw_version: "v0.1.0"
//! mgw_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;

use mgw_common::config::AppConfig;
use mgw_common::logging::LogFormat;

fn read(path: &str) -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let full = Path::new(manifest_dir).join("..").join(path);
    fs::read_to_string(&full)
        .unwrap_or_else(|err| panic!("failed to read {}: {}", full.display(), err))
}

#[test]
fn prod_example_parses_and_hardens_tls() {
    let config: AppConfig = read("configs/example.prod.toml").parse().unwrap();
    assert!(
        config.controller.verify_tls,
        "production example must enable TLS verification"
    );
    assert!(
        config.api.static_dir.is_some(),
        "production example should host the UI bundle"
    );
    assert_eq!(config.logging.format, LogFormat::StructuredJson);
}

#[test]
fn dev_example_parses_with_local_posture() {
    let config: AppConfig = read("configs/example.dev.toml").parse().unwrap();
    assert!(!config.controller.verify_tls);
    assert_eq!(config.controller.base_url, "https://localhost");
    assert!(config.api.listen.ip().is_loopback());
    assert_eq!(config.logging.format, LogFormat::Pretty);
}
