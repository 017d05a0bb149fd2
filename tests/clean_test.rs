//! Integration tests for `stagecraft clean`

mod common;

use common::TestProject;

const MANIFEST: &str = "[project]\nname = \"demo\"\n";

fn with_build_output() -> TestProject {
    let project = TestProject::with_manifest(MANIFEST);
    project.create_file("_build/default/lib/base/ebin/base.app", "{}");
    project.create_file("_build/test/lib/base/ebin/base.app", "{}");
    project
}

#[test]
fn test_clean_removes_default_profile() {
    let project = with_build_output();

    let output = project.run(&["clean"]);

    assert!(output.status.success());
    assert!(!project.file_exists("_build/default"));
    assert!(project.file_exists("_build/test"));
}

#[test]
fn test_clean_named_profile() {
    let project = with_build_output();

    let output = project.run(&["clean", "--profile", "test"]);

    assert!(output.status.success());
    assert!(project.file_exists("_build/default"));
    assert!(!project.file_exists("_build/test"));
}

#[test]
fn test_clean_all_removes_build_directory() {
    let project = with_build_output();

    let output = project.run(&["clean", "--all"]);

    assert!(output.status.success());
    assert!(!project.file_exists("_build"));
}

#[test]
fn test_clean_nothing_to_clean() {
    let project = TestProject::with_manifest(MANIFEST);

    let output = project.run(&["clean"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Nothing to clean"));
}

#[test]
fn test_clean_requires_manifest() {
    let project = TestProject::new();

    let output = project.run(&["clean"]);

    assert!(!output.status.success());
}
