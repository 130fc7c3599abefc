use std::path::Path;
use std::process::Output;

use assert_cmd::Command;
use tempfile::TempDir;

fn goweli(config_dir: &Path, database: &str) -> Command {
    let mut cmd = Command::cargo_bin("goweli").unwrap();
    cmd.env("GOWELI_CONFIG_DIR", config_dir)
        .env_remove("GOWELI_ENV")
        .env_remove("RUST_LOG")
        .args(["--database", database]);
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn file_database(dir: &TempDir, name: &str) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join(name).display())
}

#[test]
fn help_lists_commands() {
    let output = Command::cargo_bin("goweli").unwrap().arg("--help").output().unwrap();
    assert!(output.status.success());
    let help = stdout(&output);
    for command in ["serve", "add", "toggle-read", "covers", "export", "import"] {
        assert!(help.contains(command), "missing {command} in help");
    }
}

#[test]
fn add_without_title_fails_with_message() {
    let config = TempDir::new().unwrap();
    let output = goweli(config.path(), "sqlite::memory:")
        .args(["add", "--title", " ", "--author", "Frank Herbert", "--no-cover"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Author and Title are required."));
}

#[test]
fn books_persist_between_invocations() {
    let dir = TempDir::new().unwrap();
    let database = file_database(&dir, "books.db");

    let added = goweli(dir.path(), &database)
        .args(["add", "--title", "Dune", "--author", "Frank Herbert", "--isbn", "0441013597", "--no-cover"])
        .output()
        .unwrap();
    assert!(added.status.success(), "{}", stderr(&added));

    goweli(dir.path(), &database)
        .args(["toggle-read", "1"])
        .assert()
        .success();

    let listed = goweli(dir.path(), &database).args(["list", "--read"]).output().unwrap();
    let listing = stdout(&listed);
    assert!(listing.contains("[x]"));
    assert!(listing.contains("Dune by Frank Herbert"));

    let unread = goweli(dir.path(), &database).args(["list", "--unread"]).output().unwrap();
    assert!(stdout(&unread).contains("No unread books."));

    let by_author = goweli(dir.path(), &database)
        .args(["search", "herb", "--by", "author"])
        .output()
        .unwrap();
    assert!(stdout(&by_author).contains("Dune by Frank Herbert"));
}

#[test]
fn search_rejects_unknown_field() {
    let config = TempDir::new().unwrap();
    let output = goweli(config.path(), "sqlite::memory:")
        .args(["search", "dune", "--by", "genre"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let message = stderr(&output);
    assert!(message.contains("invalid value 'genre'"));
    assert!(message.contains("author"));
}

#[test]
fn export_then_import_into_fresh_database() {
    let dir = TempDir::new().unwrap();
    let source = file_database(&dir, "source.db");
    let target = file_database(&dir, "target.db");
    let backup = dir.path().join("backup.json");

    for (title, author) in [("Dune", "Frank Herbert"), ("Emma", "Jane Austen")] {
        goweli(dir.path(), &source)
            .args(["add", "--title", title, "--author", author, "--no-cover"])
            .assert()
            .success();
    }

    goweli(dir.path(), &source)
        .arg("export")
        .arg("--output")
        .arg(&backup)
        .assert()
        .success();

    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&backup).unwrap()).unwrap();
    assert_eq!(exported.as_array().unwrap().len(), 2);
    assert_eq!(exported[0]["bookTitle"], "Dune");

    let imported = goweli(dir.path(), &target).arg("import").arg(&backup).output().unwrap();
    assert!(stdout(&imported).contains("Imported 2 books."));

    // Re-importing skips books already present
    let again = goweli(dir.path(), &target).arg("import").arg(&backup).output().unwrap();
    assert!(stdout(&again).contains("Imported 0 books."));
}
