use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// What the practice screen reacts to. `Tick` drives animations and status timeouts.
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Paste(String),
    Resize,
    Tick,
}

/// Map a raw terminal event to an app event; focus and mouse input are dropped.
pub fn translate(event: CtEvent) -> Option<AppEvent> {
    match event {
        // Windows reports releases as well; typing acts on presses and repeats only
        CtEvent::Key(key) if key.kind == KeyEventKind::Release => None,
        CtEvent::Key(key) => Some(AppEvent::Key(key)),
        CtEvent::Paste(text) => Some(AppEvent::Paste(text)),
        CtEvent::Resize(_, _) => Some(AppEvent::Resize),
        _ => None,
    }
}

pub trait EventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Events arriving over a channel: from the terminal reader thread, or pushed by tests.
pub struct ChannelEventSource {
    rx: Receiver<AppEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }

    /// Spawn a thread that feeds crossterm input into the channel until the
    /// terminal or the receiver goes away.
    pub fn terminal() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(raw) => {
                    let Some(event) = translate(raw) else {
                        continue;
                    };
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::error!("Terminal event reader stopped: {}", e);
                    break;
                }
            }
        });

        Self::new(rx)
    }
}

impl EventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Hands the main loop one event at a time, or a tick once `tick_rate` passes quietly.
pub struct Runner<E: EventSource> {
    source: E,
    tick_rate: Duration,
}

impl<E: EventSource> Runner<E> {
    pub fn new(source: E, tick_rate: Duration) -> Self {
        Self { source, tick_rate }
    }

    pub fn step(&self) -> AppEvent {
        // a closed source keeps ticking so animations and timeouts still finish
        self.source
            .recv_timeout(self.tick_rate)
            .unwrap_or(AppEvent::Tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

    fn runner(rx: Receiver<AppEvent>) -> Runner<ChannelEventSource> {
        Runner::new(ChannelEventSource::new(rx), Duration::from_millis(1))
    }

    #[test]
    fn quiet_source_ticks() {
        let (_tx, rx) = mpsc::channel();
        assert!(matches!(runner(rx).step(), AppEvent::Tick));
    }

    #[test]
    fn queued_events_come_out_in_order() {
        let (tx, rx) = mpsc::channel();
        tx.send(AppEvent::Paste("hello".into())).unwrap();
        tx.send(AppEvent::Resize).unwrap();
        let runner = runner(rx);

        match runner.step() {
            AppEvent::Paste(text) => assert_eq!(text, "hello"),
            other => panic!("expected Paste event, got {other:?}"),
        }
        assert!(matches!(runner.step(), AppEvent::Resize));
        assert!(matches!(runner.step(), AppEvent::Tick));
    }

    #[test]
    fn closed_source_keeps_ticking() {
        let (tx, rx) = mpsc::channel::<AppEvent>();
        drop(tx);
        let runner = runner(rx);
        assert!(matches!(runner.step(), AppEvent::Tick));
        assert!(matches!(runner.step(), AppEvent::Tick));
    }

    #[test]
    fn key_releases_and_focus_are_dropped() {
        let press = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        let release = KeyEvent::new_with_kind_and_state(
            KeyCode::Char('a'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
            KeyEventState::NONE,
        );

        assert!(matches!(translate(CtEvent::Key(press)), Some(AppEvent::Key(_))));
        assert!(translate(CtEvent::Key(release)).is_none());
        assert!(translate(CtEvent::FocusGained).is_none());
        assert!(matches!(
            translate(CtEvent::Paste("the\u{00A0}cat".into())),
            Some(AppEvent::Paste(text)) if text == "the\u{00A0}cat"
        ));
        assert!(matches!(translate(CtEvent::Resize(80, 24)), Some(AppEvent::Resize)));
    }
}
