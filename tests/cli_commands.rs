// Drives the compiled binary's subcommands against a throwaway database and config.

use assert_cmd::Command;
use std::path::Path;

fn dictate(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dictate").unwrap();
    cmd.arg("--db")
        .arg(dir.join("sentences.db"))
        .arg("--config")
        .arg(dir.join("config.json"))
        .env("RUST_LOG", "off");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

#[test]
fn list_shows_seeded_sentences() {
    let dir = tempfile::tempdir().unwrap();
    let out = stdout_of(dictate(dir.path()).arg("list"));

    let lines: Vec<_> = out.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("s-1"));
    assert!(lines[0].contains("The quick brown fox jumps over the lazy dog."));
}

#[test]
fn add_edit_move_remove_round_trip() {
    let dir = tempfile::tempdir().unwrap();

    let id = stdout_of(dictate(dir.path()).args(["add", "  Fresh sentence here.  ", "--no-audio"]))
        .trim()
        .to_string();
    assert!(id.starts_with("s-"));

    dictate(dir.path())
        .args(["edit", &id, "Edited sentence."])
        .assert()
        .success();
    dictate(dir.path())
        .args(["move", &id, "1"])
        .assert()
        .success();

    let out = stdout_of(dictate(dir.path()).arg("list"));
    let first = out.lines().next().unwrap();
    assert!(first.contains(&id));
    assert!(first.contains("Edited sentence."));

    dictate(dir.path()).args(["remove", &id]).assert().success();
    let out = stdout_of(dictate(dir.path()).arg("list"));
    assert!(!out.contains(&id));
}

#[test]
fn removing_unknown_sentence_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = dictate(dir.path())
        .args(["remove", "nope"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8(output).unwrap().contains("no sentence with id 'nope'"));
}

#[test]
fn export_then_import() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("bank.json");

    dictate(dir.path())
        .arg("export")
        .arg(&export)
        .assert()
        .success();
    let exported = std::fs::read_to_string(&export).unwrap();
    assert!(exported.contains("\"id\": \"s-2\""));

    let import = dir.path().join("import.json");
    std::fs::write(&import, r#"[{"id":"x","text":"Only this."},{"text":5}]"#).unwrap();
    let out = stdout_of(dictate(dir.path()).arg("import").arg(&import));
    assert_eq!(out.trim(), "Imported 1 sentence successfully.");

    let out = stdout_of(dictate(dir.path()).arg("list"));
    assert_eq!(out.lines().count(), 1);
    assert!(out.contains("Only this."));
}

#[test]
fn invalid_import_keeps_bank() {
    let dir = tempfile::tempdir().unwrap();
    let import = dir.path().join("import.json");
    std::fs::write(&import, r#"{"text":"not a list"}"#).unwrap();

    dictate(dir.path())
        .arg("import")
        .arg(&import)
        .assert()
        .failure();

    let out = stdout_of(dictate(dir.path()).arg("list"));
    assert_eq!(out.lines().count(), 3);
}

#[test]
fn export_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let out = stdout_of(dictate(dir.path()).args(["export", "-"]));
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 3);
}

#[test]
fn prefs_update_config() {
    let dir = tempfile::tempdir().unwrap();
    let out = stdout_of(dictate(dir.path()).args(["prefs", "--keypress-sound", "false"]));
    let prefs: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(prefs["keypressSound"], false);
    assert_eq!(prefs["completionSound"], true);

    let config: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("config.json")).unwrap())
            .unwrap();
    assert_eq!(config["preferences"]["keypressSound"], false);
}

#[test]
fn check_reports_alignment() {
    let dir = tempfile::tempdir().unwrap();
    let out = stdout_of(dictate(dir.path()).args(["check", "Hello, world!", "hello wrld"]));
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();

    assert_eq!(report["complete"], false);
    assert_eq!(report["word_states"][0]["status"], "correct");
    assert_eq!(report["word_states"][1]["status"], "error");
    assert_eq!(report["mismatch"]["expected"], "world!");
    assert_eq!(report["mismatch"]["typed"], "wrld");

    let out = stdout_of(dictate(dir.path()).args(["check", "Hello, world!", "hello world"]));
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["complete"], true);
}
