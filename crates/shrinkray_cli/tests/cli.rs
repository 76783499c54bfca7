use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn shrinkray_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("shrinkray"));
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

/// Writes a config whose encoders copy stdin to stdout.
fn write_copy_config(dir: &Path) {
    fs::write(
        dir.join("shrinkray.toml"),
        r#"
[encoders]
jpeg = "cat"
png = "cat"
svg = "cat"
webp = "cat"
"#,
    )
    .unwrap();
}

fn write_source(dir: &Path, rel: &str, bytes: &[u8]) {
    let path = dir.join("src/images").join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

#[test]
fn empty_project_has_nothing_to_do() {
    let tmp = TempDir::new().unwrap();

    shrinkray_cmd(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No images to process."));

    let manifest = fs::read_to_string(tmp.path().join(".image-cache.json")).unwrap();
    assert!(manifest.contains("\"files\""));
}

#[test]
fn quiet_suppresses_summary() {
    let tmp = TempDir::new().unwrap();
    shrinkray_cmd(tmp.path())
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn traversal_arguments_are_ignored() {
    let tmp = TempDir::new().unwrap();
    write_source(tmp.path(), "a.svg", b"<svg/>");
    fs::write(tmp.path().join("secret.png"), b"secret").unwrap();

    shrinkray_cmd(tmp.path())
        .args(["../../etc/passwd", "src/images/../secret.png"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No images to process."));

    assert!(!tmp.path().join("images").exists());
}

#[test]
fn invalid_config_exits_with_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("shrinkray.toml"), "[run]\njobs = 0\n").unwrap();

    shrinkray_cmd(tmp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("error: "));
}

#[test]
fn zero_jobs_flag_is_rejected() {
    let tmp = TempDir::new().unwrap();
    shrinkray_cmd(tmp.path())
        .args(["--jobs", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--jobs must be at least 1"));
}

#[cfg(unix)]
#[test]
fn processes_tree_then_reuses_cache() {
    let tmp = TempDir::new().unwrap();
    write_copy_config(tmp.path());
    write_source(tmp.path(), "hero.jpg", b"jpeg data");
    write_source(tmp.path(), "icons/arrow.svg", b"<svg/>");
    write_source(tmp.path(), "notes.txt", b"ignored");

    shrinkray_cmd(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "✓ Image processing complete! Updated 2 file(s).",
        ));

    assert_eq!(fs::read(tmp.path().join("images/hero.jpg")).unwrap(), b"jpeg data");
    assert_eq!(fs::read(tmp.path().join("images/hero.webp")).unwrap(), b"jpeg data");
    assert!(tmp.path().join("images/icons/arrow.svg").is_file());
    assert!(!tmp.path().join("images/icons/arrow.webp").exists());
    assert!(!tmp.path().join("images/notes.txt").exists());

    shrinkray_cmd(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated 0 file(s)."));
}

#[cfg(unix)]
#[test]
fn runs_from_a_subdirectory() {
    let tmp = TempDir::new().unwrap();
    write_copy_config(tmp.path());
    write_source(tmp.path(), "photos/a.png", b"png");
    write_source(tmp.path(), "photos/b.png", b"png too");

    shrinkray_cmd(&tmp.path().join("src/images/photos"))
        .arg("b.png")
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated 1 file(s)."));

    assert!(tmp.path().join("images/photos/b.png").is_file());
    assert!(!tmp.path().join("images/photos/a.png").exists());
    assert!(tmp.path().join(".image-cache.json").is_file());
}

#[cfg(unix)]
#[test]
fn encoder_failure_exits_without_saving() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("shrinkray.toml"), "[encoders]\npng = \"false\"\n").unwrap();
    write_source(tmp.path(), "a.png", b"png");

    shrinkray_cmd(tmp.path())
        .arg("--jobs")
        .arg("2")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error: failed to encode"));

    assert!(!tmp.path().join(".image-cache.json").exists());
}

#[cfg(unix)]
#[test]
fn explicit_config_path_sets_project_root() {
    let tmp = TempDir::new().unwrap();
    let site = tmp.path().join("site");
    fs::create_dir_all(&site).unwrap();
    write_copy_config(&site);
    write_source(&site, "a.svg", b"<svg/>");

    shrinkray_cmd(tmp.path())
        .args(["--config", "site/shrinkray.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated 1 file(s)."));

    assert!(site.join("images/a.svg").is_file());
    assert!(site.join(".image-cache.json").is_file());
}
