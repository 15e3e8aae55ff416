#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Manifest policy tests for Matchday Client.
//!
//! These tests parse `Cargo.toml` and check the settings the crate relies on:
//! the panic-free lint set, the default WebSocket feature and the demo
//! targets. All checks are synchronous filesystem reads.

use std::path::PathBuf;

fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn manifest() -> toml::Table {
    let path = project_root().join("Cargo.toml");
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read '{}': {e}", path.display()));
    toml::from_str(&text).expect("Cargo.toml must be valid TOML")
}

// ─────────────────────────────────────────────────────────────────────────────
// Module: panic_policy
// ─────────────────────────────────────────────────────────────────────────────

mod panic_policy {
    use super::*;

    const REQUIRED_DENY_LINTS: &[&str] = &[
        "unwrap_used",
        "expect_used",
        "panic",
        "todo",
        "unimplemented",
        "indexing_slicing",
    ];

    #[test]
    fn all_panic_prone_lints_are_denied() {
        let manifest = manifest();
        let clippy = manifest["lints"]["clippy"]
            .as_table()
            .expect("Cargo.toml is missing [lints.clippy]");

        for lint in REQUIRED_DENY_LINTS {
            assert_eq!(
                clippy.get(*lint).and_then(toml::Value::as_str),
                Some("deny"),
                "[lints.clippy] must set `{lint} = \"deny\"` to keep library code panic-free."
            );
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Module: feature_policy
// ─────────────────────────────────────────────────────────────────────────────

mod feature_policy {
    use super::*;

    #[test]
    fn websocket_transport_is_default() {
        let manifest = manifest();
        let default = manifest["features"]["default"]
            .as_array()
            .expect("[features] must declare `default`");
        assert!(
            default.iter().any(|f| f.as_str() == Some("transport-websocket")),
            "the WebSocket transport must stay enabled by default"
        );
    }

    #[test]
    fn websocket_dependencies_are_optional() {
        let manifest = manifest();
        let deps = manifest["dependencies"].as_table().unwrap();
        for name in ["tokio-tungstenite", "futures-util"] {
            assert_eq!(
                deps[name].get("optional").and_then(toml::Value::as_bool),
                Some(true),
                "`{name}` must be optional so the core builds without a WebSocket stack"
            );
        }
    }

    #[test]
    fn core_runtime_features_stay_minimal() {
        let manifest = manifest();
        let tokio = manifest["dependencies"]["tokio"]["features"]
            .as_array()
            .unwrap();
        let features: Vec<&str> = tokio.iter().filter_map(toml::Value::as_str).collect();
        assert!(
            !features.contains(&"full"),
            "library builds must not pull tokio's `full` feature set"
        );
        for needed in ["sync", "time", "macros", "rt"] {
            assert!(features.contains(&needed), "tokio feature `{needed}` is required");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Module: demo_targets
// ─────────────────────────────────────────────────────────────────────────────

mod demo_targets {
    use super::*;

    #[test]
    fn every_demo_target_points_at_an_existing_file() {
        let manifest = manifest();
        let targets = manifest["example"]
            .as_array()
            .expect("demos are declared as [[example]] targets");
        assert!(!targets.is_empty());

        for target in targets {
            let path = target["path"].as_str().unwrap();
            assert!(
                project_root().join(path).is_file(),
                "demo target '{}' points at missing file '{path}'",
                target["name"]
            );
        }
    }
}
