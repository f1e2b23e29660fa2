use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const CATALOG: &str = r#"
[[module]]
id = "org.example:db:1.0"

[[module]]
id = "org.example:db:2.0"

[[module]]
id = "org.example:a:1.0"
dependencies = [{ module = "org.example:lib", version = "2.0" }]

[[module]]
id = "org.example:lib:2.0"

[[module]]
id = "com.fasterxml.jackson.core:jackson-core:2.9.0"

[[module]]
id = "com.fasterxml.jackson.core:jackson-core:2.9.5"
"#;

const REQUEST: &str = r#"
[root]
id = "com.example:app:1.0"

[[dependency]]
module = "org.example:db"
version = "1.0"

[[dependency]]
module = "org.example:a"
version = "1.0"

[[platform-rule]]
group = "org.example"
platform = "org.example:platform"
"#;

const CONFLICTING_REQUEST: &str = r#"
[root]
id = "com.example:app:1.0"

[[dependency]]
module = "com.fasterxml.jackson.core:jackson-core"
version = "2.9.0"
force = true

[[dependency]]
module = "com.fasterxml.jackson.core:jackson-core"
version = "2.9.5"
force = true
"#;

/// A `platoon` command with HOME pointed at an empty temp directory.
#[allow(deprecated)]
fn platoon_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("platoon").unwrap();
    cmd.env("HOME", home.path()).env_remove("RUST_LOG");
    cmd
}

fn setup(request: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("request.toml"), request).unwrap();
    fs::write(tmp.path().join("catalog.toml"), CATALOG).unwrap();
    tmp
}

#[test]
fn test_resolve_prints_aligned_tree() {
    let tmp = setup(REQUEST);

    platoon_cmd(&tmp)
        .current_dir(tmp.path())
        .args(["resolve", "--request", "request.toml", "--catalog", "catalog.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("com.example:app:1.0"))
        .stdout(predicate::str::contains("org.example:db:1.0 -> 2.0"))
        .stderr(predicate::str::contains("Resolved"));
}

#[test]
fn test_resolve_list_format() {
    let tmp = setup(REQUEST);

    platoon_cmd(&tmp)
        .current_dir(tmp.path())
        .args(["resolve", "-r", "request.toml", "-c", "catalog.toml", "--format", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("org.example:db:2.0 (by-constraint)"))
        .stdout(predicate::str::contains("org.example:lib:2.0"));
}

#[test]
fn test_resolve_json_format() {
    let tmp = setup(REQUEST);

    platoon_cmd(&tmp)
        .current_dir(tmp.path())
        .args(["resolve", "-r", "request.toml", "-c", "catalog.toml", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"platforms\""))
        .stdout(predicate::str::contains("\"by-constraint\""));
}

#[test]
fn test_resolve_why() {
    let tmp = setup(REQUEST);

    platoon_cmd(&tmp)
        .current_dir(tmp.path())
        .args(["resolve", "-r", "request.toml", "-c", "catalog.toml", "--why", "org.example:lib"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Path to org.example:lib:"))
        .stdout(predicate::str::contains("  org.example:a:1.0"));
}

#[test]
fn test_resolve_conflicting_forced_versions_fails() {
    let tmp = setup(CONFLICTING_REQUEST);

    platoon_cmd(&tmp)
        .current_dir(tmp.path())
        .args(["resolve", "-r", "request.toml", "-c", "catalog.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("2.9.0"))
        .stderr(predicate::str::contains("2.9.5"));
}

#[test]
fn test_resolve_honors_global_config() {
    let tmp = setup(REQUEST);
    let config_dir = tmp.path().join(".platoon");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        "[resolution]\nmax-iterations = 1\n",
    )
    .unwrap();

    platoon_cmd(&tmp)
        .current_dir(tmp.path())
        .args(["resolve", "-r", "request.toml", "-c", "catalog.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("converge"));
}

#[test]
fn test_resolve_missing_request_file() {
    let tmp = TempDir::new().unwrap();

    platoon_cmd(&tmp)
        .current_dir(tmp.path())
        .args(["resolve", "-r", "nope.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No request file"));
}

#[test]
fn test_resolve_rejects_unknown_format() {
    let tmp = setup(REQUEST);

    platoon_cmd(&tmp)
        .current_dir(tmp.path())
        .args(["resolve", "-r", "request.toml", "-f", "xml"])
        .assert()
        .failure();
}
