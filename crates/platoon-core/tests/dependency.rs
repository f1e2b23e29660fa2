use std::collections::BTreeSet;

use platoon_core::dependency::{excludes, Category, Dependency, Exclusion};
use platoon_core::identity::{ModuleIdentity, ModuleVersion};
use platoon_core::requirement::VersionRequirement;

#[derive(serde::Deserialize)]
struct Deps {
    dependency: Vec<Dependency>,
}

fn parse(toml: &str) -> Result<Vec<Dependency>, toml::de::Error> {
    toml::from_str::<Deps>(toml).map(|d| d.dependency)
}

#[test]
fn module_identity_parse_valid() {
    let id = ModuleIdentity::parse("com.example:my-lib").unwrap();
    assert_eq!(id.group, "com.example");
    assert_eq!(id.name, "my-lib");
    assert_eq!(id.to_string(), "com.example:my-lib");
}

#[test]
fn module_identity_parse_rejects_versions_and_blanks() {
    assert!(ModuleIdentity::parse("group:artifact:1.0").is_none());
    assert!(ModuleIdentity::parse("group").is_none());
    assert!(ModuleIdentity::parse(":name").is_none());
}

#[test]
fn module_version_parse_and_display() {
    let mv = ModuleVersion::parse("com.example:my-lib:1.0.0").unwrap();
    assert_eq!(mv.id, ModuleIdentity::new("com.example", "my-lib"));
    assert_eq!(mv.version, "1.0.0");
    assert_eq!(mv.to_string(), "com.example:my-lib:1.0.0");
    assert!(ModuleVersion::parse("com.example:my-lib").is_none());
}

#[test]
fn dependency_exact_from_toml() {
    let deps = parse(
        r#"
[[dependency]]
module = "org.example:db"
version = "1.0"
"#,
    )
    .unwrap();
    assert_eq!(deps[0].target, ModuleIdentity::new("org.example", "db"));
    assert_eq!(deps[0].requirement, VersionRequirement::Exact("1.0".into()));
    assert!(!deps[0].forced);
    assert!(deps[0].category.is_none());
}

#[test]
fn dependency_full_form_from_toml() {
    let deps = parse(
        r#"
[[dependency]]
module = "org.example:bom"
version = "[1.0,2.0)"
force = true
category = "enforced-platform"
exclude = ["org.slf4j", "commons-logging:commons-logging"]
"#,
    )
    .unwrap();
    let dep = &deps[0];
    assert!(matches!(dep.requirement, VersionRequirement::Range(_)));
    assert!(dep.forced);
    assert_eq!(dep.category, Some(Category::EnforcedPlatform));
    assert!(dep.targets_platform());
    assert!(dep.exclusions.contains(&Exclusion::group("org.slf4j")));
    assert!(dep
        .exclusions
        .contains(&Exclusion::module(&ModuleIdentity::new("commons-logging", "commons-logging"))));
}

#[test]
fn dependency_prefer_from_toml() {
    let deps = parse(
        r#"
[[dependency]]
module = "org.example:db"
prefer = "1.2"
"#,
    )
    .unwrap();
    assert_eq!(deps[0].requirement, VersionRequirement::Prefer("1.2".into()));
}

#[test]
fn dependency_requires_exactly_one_version_kind() {
    assert!(parse("[[dependency]]\nmodule = \"a:b\"\n").is_err());
    assert!(parse("[[dependency]]\nmodule = \"a:b\"\nversion = \"1\"\nprefer = \"2\"\n").is_err());
    assert!(parse("[[dependency]]\nmodule = \"a:b\"\nprefer = \"2\"\nforce = true\n").is_err());
}

#[test]
fn exclusion_matching() {
    let id = ModuleIdentity::new("org.slf4j", "slf4j-api");
    assert!(Exclusion::group("org.slf4j").matches(&id));
    assert!(Exclusion::module(&id).matches(&id));
    assert!(!Exclusion::module(&ModuleIdentity::new("org.slf4j", "other")).matches(&id));

    let set: BTreeSet<Exclusion> = [Exclusion::group("org.slf4j")].into_iter().collect();
    assert!(excludes(&set, &id));
    assert!(!excludes(&BTreeSet::new(), &id));
}

#[test]
fn dependency_builders() {
    let dep = Dependency::exact("org:lib", "2.0")
        .unwrap()
        .forced()
        .with_category(Category::Platform)
        .excluding(Exclusion::group("org.other"));
    assert!(dep.forced);
    assert!(dep.targets_platform());
    assert_eq!(dep.to_string(), "org:lib:2.0 (forced)");
    assert!(Dependency::exact("not-an-id", "1.0").is_err());
}
