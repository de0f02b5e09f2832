//! ---
//! mgw_section: "15-testing-qa-runbook"
//! mgw_subsection: "integration-tests"
//! mgw_type: "source"
//! mgw_scope: "code"
//! mgw_description: "Workspace manifest convention checks."
//! mgw_version: "v0.1.0"
//! mgw_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;

fn read(path: &str) -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let full = Path::new(manifest_dir).join("..").join(path);
    fs::read_to_string(&full)
        .unwrap_or_else(|err| panic!("failed to read {}: {}", full.display(), err))
}

#[test]
fn manifests_carry_frontmatter_headers() {
    for manifest in [
        "Cargo.toml",
        "crates/mgw-common/Cargo.toml",
        "crates/mgw-datalayer/Cargo.toml",
        "crates/mgw-api/Cargo.toml",
        "bin/mgwd/Cargo.toml",
        "tests/Cargo.toml",
    ] {
        let content = read(manifest);
        assert!(
            content.starts_with("# ---"),
            "{manifest} must include frontmatter header"
        );
        assert!(
            content.contains("mgw_section"),
            "{manifest} frontmatter missing mgw_section"
        );
    }
}

#[test]
fn example_configs_carry_frontmatter_headers() {
    for config in ["configs/example.prod.toml", "configs/example.dev.toml"] {
        let content = read(config);
        assert!(
            content.starts_with("# ---"),
            "{config} must include frontmatter header"
        );
    }
}
