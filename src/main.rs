use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use dictate::{
    aligner::{align, is_complete, Alignment},
    app::App,
    app_dirs::AppDirs,
    audio::RodioDevice,
    audio_gen::AudioGenerator,
    config::{Config, ConfigStore, FileConfigStore},
    playback::SentenceSpeaker,
    runtime::{AppEvent, ChannelEventSource, Runner},
    sentences::{export_json, parse_import, Sentence, EXPORT_FILENAME},
    store::{add_sentence, move_sentence, SentenceSource, SqliteSentenceStore, StoreError},
};
use log::{error, info};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use serde::Serialize;
use std::{
    error::Error,
    fs::OpenOptions,
    io::{self, stdin, Write},
    path::PathBuf,
    time::{Duration, Instant},
};

const TICK_RATE_MS: u64 = 50;

/// dictation practice in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Listen to a sentence, type what you hear, and get word-by-word feedback. Run without a subcommand to start practicing."
)]
pub struct Cli {
    /// sentence database to use
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// config file to use
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// list sentences in practice order
    List,
    /// add a sentence to the end of the bank
    Add {
        text: String,
        /// skip audio generation even if a generator is configured
        #[clap(long)]
        no_audio: bool,
    },
    /// change the text of a sentence
    Edit { id: String, text: String },
    /// delete a sentence
    Remove { id: String },
    /// move a sentence to a 1-based position
    Move { id: String, position: usize },
    /// replace the bank with sentences from a JSON export
    Import { path: PathBuf },
    /// write the bank as JSON (use - for stdout)
    Export { path: Option<PathBuf> },
    /// show or change sound preferences
    Prefs {
        #[clap(long)]
        completion_sound: Option<bool>,
        #[clap(long)]
        keypress_sound: Option<bool>,
    },
    /// compare typed text against an expected sentence
    Check { expected: String, typed: String },
}

impl Cli {
    fn db_path(&self) -> PathBuf {
        self.db
            .clone()
            .or_else(AppDirs::db_path)
            .unwrap_or_else(|| PathBuf::from("dictate.db"))
    }

    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }
}

#[derive(Serialize)]
struct CheckReport {
    #[serde(flatten)]
    alignment: Alignment,
    complete: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command.clone() {
        Some(command) => {
            init_logger(None, "warn");
            if let Err(e) = run_command(&cli, command) {
                error!("{}", e);
                eprintln!("dictate: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        None => {
            if !stdin().is_tty() {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
            }
            init_logger(AppDirs::log_path(), "info");
            run_tui(&cli)
        }
    }
}

/// Log to `log_path` when given (the TUI owns the terminal), otherwise to stderr.
fn init_logger(log_path: Option<PathBuf>, default_level: &str) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    if let Some(path) = log_path {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            // nowhere safe to write while the alternate screen is up
            Err(_) => {
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }

    let _ = builder.try_init();
}

fn run_command(cli: &Cli, command: Command) -> Result<(), Box<dyn Error>> {
    let config_store = cli.config_store();

    if let Command::Check { expected, typed } = &command {
        let report = CheckReport {
            alignment: align(expected, typed),
            complete: is_complete(expected, typed),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if let Command::Prefs {
        completion_sound,
        keypress_sound,
    } = &command
    {
        let mut config = config_store.load();
        if let Some(value) = completion_sound {
            config.preferences.completion_sound = *value;
        }
        if let Some(value) = keypress_sound {
            config.preferences.keypress_sound = *value;
        }
        if completion_sound.is_some() || keypress_sound.is_some() {
            config_store.save(&config)?;
        }
        println!("{}", serde_json::to_string_pretty(&config.preferences)?);
        return Ok(());
    }

    let mut store = SqliteSentenceStore::open(&cli.db_path())?;
    let mut out = io::stdout().lock();

    match command {
        Command::List => {
            for (idx, sentence) in store.list()?.iter().enumerate() {
                let audio = if sentence.audio_url.is_some() { "  [audio]" } else { "" };
                writeln!(out, "{:>3}. {}  {}{}", idx + 1, sentence.id, sentence.text, audio)?;
            }
        }
        Command::Add { text, no_audio } => {
            let config = config_store.load();
            let generator = if no_audio {
                None
            } else {
                audio_generator(&config)
            };
            match add_sentence(&mut store, generator.as_ref(), &text)? {
                Some(sentence) => writeln!(out, "{}", sentence.id)?,
                None => return Err("sentence text is empty".into()),
            }
        }
        Command::Edit { id, text } => {
            let text = text.trim();
            if text.is_empty() {
                return Err("sentence text is empty".into());
            }
            let existing = store.get(&id)?.ok_or_else(|| StoreError::NotFound(id.clone()))?;
            store.update(&Sentence {
                text: text.to_string(),
                ..existing
            })?;
            info!("Updated sentence {}", id);
        }
        Command::Remove { id } => {
            store.delete(&id)?;
            info!("Deleted sentence {}", id);
        }
        Command::Move { id, position } => {
            move_sentence(&mut store, &id, position.saturating_sub(1))?;
        }
        Command::Import { path } => {
            let raw = std::fs::read_to_string(&path)?;
            let sentences = parse_import(&raw).into_result()?;
            store.replace_all(&sentences)?;

            // the bank starts over, so does the practice position
            let mut config = config_store.load();
            config.current_index = 0;
            config_store.save(&config)?;

            writeln!(
                out,
                "Imported {} sentence{} successfully.",
                sentences.len(),
                if sentences.len() == 1 { "" } else { "s" }
            )?;
        }
        Command::Export { path } => {
            let json = export_json(&store.list()?)?;
            match path {
                Some(path) if path.as_os_str() == "-" => writeln!(out, "{json}")?,
                path => {
                    let path = path.unwrap_or_else(|| PathBuf::from(EXPORT_FILENAME));
                    std::fs::write(&path, json)?;
                    writeln!(out, "{}", path.display())?;
                }
            }
        }
        Command::Prefs { .. } | Command::Check { .. } => {}
    }

    Ok(())
}

fn audio_generator(config: &Config) -> Option<AudioGenerator> {
    let command = config.audio_generator.as_deref()?;
    let out_dir = config
        .audio_dir
        .clone()
        .or_else(AppDirs::audio_dir)
        .unwrap_or_else(|| PathBuf::from("audio"));
    Some(AudioGenerator::new(command, out_dir))
}

fn run_tui(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let config_store = cli.config_store();
    let config = config_store.load();

    let store: Box<dyn SentenceSource> = match SqliteSentenceStore::open(&cli.db_path()) {
        Ok(store) => Box::new(store),
        Err(e) => {
            error!("Unable to open sentence store, starting with an empty bank: {}", e);
            Box::new(SqliteSentenceStore::open_in_memory()?)
        }
    };
    let speaker = SentenceSpeaker::new(
        config.speech_command.clone(),
        config.audio_dir.clone().or_else(AppDirs::audio_dir),
    );
    let device = RodioDevice::new();

    let mut app = App::new(
        store,
        Box::new(config_store),
        speaker,
        device,
        PathBuf::from(EXPORT_FILENAME),
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);
    app.dispose();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App<SentenceSpeaker, RodioDevice>,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        ChannelEventSource::terminal(),
        Duration::from_millis(TICK_RATE_MS),
    );

    app.start(Instant::now());
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    while !app.should_quit() {
        let now = Instant::now();
        let redraw = match runner.step() {
            AppEvent::Tick => {
                let had_status = app.status().is_some();
                app.on_tick(now);
                app.is_animating() || had_status != app.status().is_some()
            }
            AppEvent::Resize => true,
            AppEvent::Key(key) => {
                app.handle_key(key, now);
                true
            }
            AppEvent::Paste(text) => {
                app.handle_paste(&text, now);
                true
            }
        };

        if redraw {
            terminal.draw(|f| f.render_widget(&*app, f.area()))?;
        }
    }

    info!("Exiting");
    Ok(())
}
