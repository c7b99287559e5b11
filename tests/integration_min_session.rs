// Drives the compiled binary through a PTY to exercise the real event loop
// and crossterm input handling.
//
// Requires a TTY, so it is Unix-only and ignored by default.
// Run with: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn practice_session_types_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let bin = assert_cmd::cargo::cargo_bin("dictate");
    let cmd = format!(
        "{} --db {} --config {}",
        bin.display(),
        dir.path().join("sentences.db").display(),
        dir.path().join("config.json").display()
    );

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(200));

    p.send("the quick brown")?;
    std::thread::sleep(Duration::from_millis(200));

    p.send("\x1b")?;
    p.expect(Eof)?;

    // leaving the session persists the practice position
    assert!(dir.path().join("config.json").exists());
    Ok(())
}
