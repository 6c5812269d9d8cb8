//! End-to-end tests invoking the compiled `archive` binary.

use archive_test_utils::TestArchive;
use assert_cmd::Command;
use predicates::prelude::*;

/// Get a Command for the archive binary with a clean environment
fn archive_cmd() -> Command {
    let mut cmd = Command::cargo_bin("archive").expect("Failed to find archive binary");
    cmd.env("NO_COLOR", "1")
        .env("CLICOLOR", "0")
        .env_remove("CLICOLOR_FORCE")
        .env_remove("RUST_LOG")
        .env_remove("ARCHIVE_CONFIG");
    cmd
}

fn sync_cmd(base: &TestArchive, other: &TestArchive, flags: &[&str]) -> Command {
    let mut cmd = archive_cmd();
    cmd.arg("sync").arg(base.root()).arg(other.root()).args(flags);
    cmd
}

/// A base holding `photos/a.jpg` and `notes.txt`; the other holds the photo
/// under an old name.
fn relocated_pair() -> (TestArchive, TestArchive) {
    let base = TestArchive::new();
    base.write("photos/a.jpg", "jpeg");
    base.write("notes.txt", "notes");
    let other = TestArchive::new();
    other.write("unsorted/a.jpg", "jpeg");
    (base, other)
}

// ============================================================================
// General
// ============================================================================

#[test]
fn help_exits_zero() {
    archive_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compare"))
        .stdout(predicate::str::contains("sync"));
}

#[test]
fn no_command_prints_hint() {
    archive_cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("archive --help"));
}

#[test]
fn missing_repository_is_an_error() {
    let other = TestArchive::new();
    archive_cmd()
        .arg("compare")
        .arg(other.root().join("does-not-exist"))
        .arg(other.root())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error"))
        .stderr(predicate::str::contains("Repository not found"));
}

#[test]
fn duplicate_flags_require_resolve_moves() {
    let (base, other) = relocated_pair();
    sync_cmd(&base, &other, &["--allow-duplicate-increase"])
        .assert()
        .failure();
}

// ============================================================================
// compare
// ============================================================================

#[test]
fn compare_lists_differences() {
    let (base, other) = relocated_pair();
    other.write("only-here.txt", "mine");

    archive_cmd()
        .arg("compare")
        .arg(base.root())
        .arg(other.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("Only in base:"))
        .stdout(predicate::str::contains("notes.txt"))
        .stdout(predicate::str::contains("Only in other:"))
        .stdout(predicate::str::contains("only-here.txt"))
        .stdout(predicate::str::contains("unsorted/a.jpg -> photos/a.jpg"));
}

#[test]
fn compare_does_not_create_metadata() {
    let (base, other) = relocated_pair();
    archive_cmd()
        .arg("compare")
        .arg(base.root())
        .arg(other.root())
        .assert()
        .success();

    other.assert_file_not_exists(".archive");
}

#[test]
fn compare_json_lists_relocations() {
    let (base, other) = relocated_pair();

    let output = archive_cmd()
        .arg("compare")
        .arg(base.root())
        .arg(other.root())
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let relocation = &result["relocations"][0];
    assert_eq!(relocation["base_paths"][0], "photos/a.jpg");
    assert_eq!(relocation["other_paths"][0], "unsorted/a.jpg");
    assert_eq!(relocation["size"], 4);
    assert_eq!(result["unmatched_base_extras"][0]["path"], "notes.txt");
}

// ============================================================================
// sync
// ============================================================================

#[test]
fn sync_copies_new_files() {
    let base = TestArchive::new();
    base.write("docs/a.txt", "alpha");
    base.write("b.txt", "beta");
    let other = TestArchive::new();

    sync_cmd(&base, &other, &["--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sync complete"))
        .stdout(predicate::str::contains("copied 2 of 2 files"));

    other.assert_file_content("docs/a.txt", "alpha");
    other.assert_file_content("b.txt", "beta");
}

#[test]
fn second_sync_has_nothing_to_do() {
    let base = TestArchive::new();
    base.write("a.txt", "alpha");
    let other = TestArchive::new();

    sync_cmd(&base, &other, &["--yes"]).assert().success();
    sync_cmd(&base, &other, &["--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes to"));
}

#[test]
fn relocations_are_blocked_by_default() {
    let (base, other) = relocated_pair();

    sync_cmd(&base, &other, &["--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Relocations disabled but present"))
        .stderr(predicate::str::contains("--resolve-moves"));

    other.assert_file_exists("unsorted/a.jpg");
    other.assert_file_not_exists("notes.txt");
}

#[test]
fn resolve_moves_renames_in_destination() {
    let (base, other) = relocated_pair();

    sync_cmd(&base, &other, &["--resolve-moves", "--yes"])
        .assert()
        .success();

    other.assert_file_content("photos/a.jpg", "jpeg");
    other.assert_file_not_exists("unsorted");
    other.assert_file_content("notes.txt", "notes");
}

#[test]
fn duplicate_increase_needs_its_flag() {
    let base = TestArchive::new();
    base.write("a.jpg", "jpeg");
    base.write("copy/a.jpg", "jpeg");
    let other = TestArchive::new();
    other.write("old.jpg", "jpeg");

    sync_cmd(&base, &other, &["--resolve-moves", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--allow-duplicate-increase"));
    other.assert_file_exists("old.jpg");

    sync_cmd(
        &base,
        &other,
        &["--resolve-moves", "--allow-duplicate-increase", "--yes"],
    )
    .assert()
    .success();
    other.assert_file_content("a.jpg", "jpeg");
    other.assert_file_content("copy/a.jpg", "jpeg");
}

#[test]
fn duplicate_reduction_keeps_surplus_copies() {
    let base = TestArchive::new();
    base.write("a.jpg", "jpeg");
    let other = TestArchive::new();
    other.write("x.jpg", "jpeg");
    other.write("y.jpg", "jpeg");

    sync_cmd(&base, &other, &["--resolve-moves", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--allow-duplicate-reduction"));

    sync_cmd(
        &base,
        &other,
        &["--resolve-moves", "--allow-duplicate-reduction", "--yes"],
    )
    .assert()
    .success();
    other.assert_file_content("a.jpg", "jpeg");
    other.assert_file_content("y.jpg", "jpeg");
}

#[test]
fn additive_duplicating_keeps_old_paths() {
    let (base, other) = relocated_pair();

    sync_cmd(&base, &other, &["--additive-duplicating", "--yes"])
        .assert()
        .success();

    other.assert_file_content("photos/a.jpg", "jpeg");
    other.assert_file_content("unsorted/a.jpg", "jpeg");
}

#[test]
fn dry_run_writes_nothing() {
    let (base, other) = relocated_pair();

    sync_cmd(&base, &other, &["--resolve-moves", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("move unsorted/a.jpg -> photos/a.jpg"))
        .stdout(predicate::str::contains("store notes.txt"))
        .stdout(predicate::str::contains("Dry run"));

    other.assert_file_exists("unsorted/a.jpg");
    other.assert_file_not_exists("photos");
    other.assert_file_not_exists("notes.txt");
}

#[test]
fn declined_without_terminal_abandons() {
    let base = TestArchive::new();
    base.write("a.txt", "alpha");
    let other = TestArchive::new();

    sync_cmd(&base, &other, &[])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("abandoned"));

    other.assert_file_not_exists("a.txt");
}

#[test]
fn config_can_disable_confirmation() {
    let base = TestArchive::new();
    base.write("a.txt", "alpha");
    base.write(
        ".archive/config.toml",
        "[sync]\nconfirm = false\nshow_comparison = false\n",
    );
    let other = TestArchive::new();

    sync_cmd(&base, &other, &[])
        .assert()
        .success()
        .stdout(predicate::str::contains("Only in base:").not());

    other.assert_file_content("a.txt", "alpha");
    other.assert_file_not_exists(".archive/config.toml");
}

#[test]
fn explicit_config_file_is_used() {
    let base = TestArchive::new();
    base.write("a.txt", "alpha");
    let other = TestArchive::new();
    let settings = TestArchive::new();
    settings.write("settings.json", r#"{ "sync": { "confirm": false } }"#);

    sync_cmd(&base, &other, &[])
        .arg("--config")
        .arg(settings.root().join("settings.json"))
        .assert()
        .success();

    other.assert_file_content("a.txt", "alpha");
}

#[test]
fn corrupt_source_fails_with_exit_code_two() {
    let base = TestArchive::new();
    base.write("good.txt", "good");
    base.write("bad.txt", "bad");
    // Sidecar written after the file, so it is trusted, but it is wrong.
    base.write(".archive/checksums/bad.txt.sha256", &"0".repeat(64));
    let other = TestArchive::new();

    sync_cmd(&base, &other, &["--yes"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("1 of 2 operations failed"));

    other.assert_file_content("good.txt", "good");
    other.assert_file_not_exists("bad.txt");
}

#[test]
fn dry_run_json_prints_the_plan() {
    let (base, other) = relocated_pair();

    let output = sync_cmd(&base, &other, &["--resolve-moves", "--dry-run", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let groups = plan["groups"].as_array().unwrap();
    let moves = &groups[0];
    assert_eq!(moves["group"], "relocations_move_apply");
    assert_eq!(moves["to_apply"][0]["op"], "move");
    assert_eq!(moves["to_apply"][0]["from"], "unsorted/a.jpg");
    assert_eq!(moves["to_apply"][0]["to"], "photos/a.jpg");
    assert!(groups.iter().any(|g| g["group"] == "new_files"
        && g["operations"][0]["op"] == "store"
        && g["operations"][0]["path"] == "notes.txt"));

    other.assert_file_exists("unsorted/a.jpg");
    other.assert_file_not_exists(".archive");
}

#[test]
fn dry_run_json_reports_blocked_relocations() {
    let (base, other) = relocated_pair();

    let output = sync_cmd(&base, &other, &["--dry-run", "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let blocked = &plan["groups"][0]["to_ignore"][0];
    assert_eq!(blocked["reason"], "relocations_disabled");
    assert_eq!(blocked["relocation"]["base_paths"][0], "photos/a.jpg");
}
