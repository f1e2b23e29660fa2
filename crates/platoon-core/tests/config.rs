use platoon_core::config::{dirs_path, GlobalConfig, ResolutionConfig, ResolutionOverrides};
use platoon_core::version::VersionSchemeKind;

#[test]
fn test_global_config_defaults() {
    let config = GlobalConfig::default();
    assert_eq!(config.resolution.max_iterations, 16);
    assert_eq!(config.resolution.max_concurrent_lookups, 8);
    assert_eq!(config.resolution.version_scheme, VersionSchemeKind::Maven);
}

#[test]
fn test_global_config_empty_toml_uses_defaults() {
    let config: GlobalConfig = toml::from_str("").unwrap();
    assert_eq!(config.resolution, ResolutionConfig::default());
}

#[test]
fn test_global_config_parse_from_toml() {
    let toml = r#"
[resolution]
max-iterations = 4
max-concurrent-lookups = 2
version-scheme = "semver"
"#;
    let config: GlobalConfig = toml::from_str(toml).unwrap();
    assert_eq!(config.resolution.max_iterations, 4);
    assert_eq!(config.resolution.max_concurrent_lookups, 2);
    assert_eq!(config.resolution.version_scheme, VersionSchemeKind::Semver);
}

#[test]
fn test_overrides_win_over_global() {
    let base = ResolutionConfig::default();
    let overrides = ResolutionOverrides {
        max_iterations: Some(3),
        max_concurrent_lookups: Some(0),
        version_scheme: None,
    };
    let merged = base.with_overrides(&overrides);
    assert_eq!(merged.max_iterations, 3);
    // Zero concurrency would deadlock the builder; it is clamped.
    assert_eq!(merged.max_concurrent_lookups, 1);
    assert_eq!(merged.version_scheme, VersionSchemeKind::Maven);
}

#[test]
fn test_load_from_missing_file_returns_defaults() {
    let tmp = tempfile::TempDir::new().unwrap();
    let config = GlobalConfig::load_from(&tmp.path().join("nope.toml")).unwrap();
    assert_eq!(config.resolution, ResolutionConfig::default());
}

#[test]
fn test_load_from_invalid_file_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[resolution]\nmax-iterations = \"many\"\n").unwrap();
    let err = GlobalConfig::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse global config"));
}

#[test]
fn test_dirs_path_contains_platoon() {
    assert!(dirs_path().ends_with(".platoon"));
    assert!(GlobalConfig::default_path().ends_with(".platoon/config.toml"));
}
