use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use dictate::app::App;
use dictate::audio::{AudioDevice, AudioError};
use dictate::config::FileConfigStore;
use dictate::playback::{PlaybackError, Speaker};
use dictate::runtime::{AppEvent, ChannelEventSource, Runner};
use dictate::sentences::Sentence;
use dictate::store::{SentenceSource, SqliteSentenceStore};

#[derive(Default)]
struct Transcript {
    spoken: Vec<String>,
}

impl Speaker for Transcript {
    fn speak(&mut self, text: &str, _audio_url: Option<&str>) -> Result<(), PlaybackError> {
        self.spoken.push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct Chimes {
    plays: usize,
}

impl AudioDevice for Chimes {
    fn open(&mut self) -> Result<u32, AudioError> {
        Ok(8000)
    }

    fn play(&mut self, _samples: &[f32], _sample_rate: u32) -> Result<(), AudioError> {
        self.plays += 1;
        Ok(())
    }
}

fn build_app(
    dir: &tempfile::TempDir,
    sentences: &[Sentence],
) -> App<Transcript, Chimes> {
    let mut store = SqliteSentenceStore::open(&dir.path().join("sentences.db")).unwrap();
    store.replace_all(sentences).unwrap();
    App::new(
        Box::new(store),
        Box::new(FileConfigStore::with_path(dir.path().join("config.json"))),
        Transcript::default(),
        Chimes::default(),
        dir.path().join("export.json"),
    )
}

fn send_text(tx: &mpsc::Sender<AppEvent>, text: &str) {
    for c in text.chars() {
        tx.send(AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)))
            .unwrap();
    }
}

// Drives the app the way the terminal loop does, without a TTY.
fn drive(
    app: &mut App<Transcript, Chimes>,
    runner: &Runner<ChannelEventSource>,
    steps: u32,
) {
    for _ in 0..steps {
        let now = Instant::now();
        match runner.step() {
            AppEvent::Tick => app.on_tick(now),
            AppEvent::Resize => {}
            AppEvent::Key(key) => app.handle_key(key, now),
            AppEvent::Paste(text) => app.handle_paste(&text, now),
        }
        if app.should_quit() {
            break;
        }
    }
}

#[test]
fn headless_dictation_flow_advances_through_bank() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = build_app(
        &dir,
        &[
            Sentence::new("a", "Good morning!"),
            Sentence::new("b", "See you, later."),
        ],
    );
    app.start(Instant::now());

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(ChannelEventSource::new(rx), Duration::from_millis(5));

    send_text(&tx, "good morning");
    tx.send(AppEvent::Paste("see you later".into())).unwrap();
    drive(&mut app, &runner, 40);

    // both sentences done, wrapped back to the first
    assert_eq!(app.practice().current_index(), 0);
    assert_eq!(app.practice().input(), "");
    assert_eq!(app.celebrations().bursts().len(), 2);
    assert_eq!(
        app.speaker().spoken,
        vec!["Good morning!", "See you, later.", "Good morning!"]
    );
}

#[test]
fn headless_mismatch_is_reported_until_fixed() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = build_app(&dir, &[Sentence::new("a", "The cat sat")]);

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(ChannelEventSource::new(rx), Duration::from_millis(5));

    send_text(&tx, "the bat");
    drive(&mut app, &runner, 10);

    let mismatch = app.practice().alignment().mismatch.clone().unwrap();
    assert_eq!(mismatch.expected, "cat");
    assert_eq!(mismatch.typed, "bat");

    tx.send(AppEvent::Key(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL)))
        .unwrap();
    send_text(&tx, "cat");
    drive(&mut app, &runner, 10);

    assert_eq!(app.practice().input(), "the cat");
    assert!(app.practice().alignment().mismatch.is_none());
}

#[test]
fn headless_mastered_and_quit_persist_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = build_app(
        &dir,
        &[
            Sentence::new("a", "One."),
            Sentence::new("b", "Two."),
            Sentence::new("c", "Three."),
        ],
    );

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(ChannelEventSource::new(rx), Duration::from_millis(5));

    tx.send(AppEvent::Key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE)))
        .unwrap();
    tx.send(AppEvent::Key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL)))
        .unwrap();
    tx.send(AppEvent::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)))
        .unwrap();
    drive(&mut app, &runner, 20);
    assert!(app.should_quit());
    app.dispose();

    let reopened = SqliteSentenceStore::open(&dir.path().join("sentences.db")).unwrap();
    let ids: Vec<_> = reopened.list().unwrap().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["a", "c"]);

    // the next session resumes on the sentence that slid into place
    let app = build_app(&dir, &reopened.list().unwrap());
    assert_eq!(app.practice().current().unwrap().id, "c");
}

#[test]
fn headless_celebration_finishes_on_ticks() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = build_app(&dir, &[Sentence::new("a", "Yes")]);
    let start = Instant::now();

    app.handle_paste("yes", start);
    assert!(app.is_animating());
    assert_eq!(app.cues().device().plays, 1);

    app.on_tick(start + Duration::from_millis(1600));
    assert!(app.is_animating());
    app.on_tick(start + Duration::from_millis(3300));
    assert!(!app.is_animating());
}
