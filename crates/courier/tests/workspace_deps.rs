// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared dependencies are versioned once, in the workspace manifest.

use std::path::Path;

const WORKSPACE_PINNED: &[&str] = &["serde_json", "tempfile", "tokio", "tracing"];

#[test]
fn member_crates_inherit_shared_dependency_versions() {
    let crates_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("..");
    let mut checked = 0;

    for entry in std::fs::read_dir(&crates_dir).unwrap() {
        let manifest = entry.unwrap().path().join("Cargo.toml");
        if !manifest.exists() {
            continue;
        }
        let text = std::fs::read_to_string(&manifest).unwrap();
        let parsed: toml::Table = toml::from_str(&text).unwrap();

        for section in ["dependencies", "dev-dependencies"] {
            let Some(deps) = parsed.get(section).and_then(|d| d.as_table()) else {
                continue;
            };
            for &name in WORKSPACE_PINNED {
                let Some(dep) = deps.get(name) else {
                    continue;
                };
                let inherited = dep
                    .as_table()
                    .and_then(|t| t.get("workspace"))
                    .and_then(|w| w.as_bool())
                    .unwrap_or(false);
                assert!(
                    inherited,
                    "{}: [{section}] {name} must use `workspace = true`",
                    manifest.display()
                );
                checked += 1;
            }
        }
    }
    assert!(checked > 0, "no member manifests found under {}", crates_dir.display());
}
