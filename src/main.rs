use std::fs::{self, OpenOptions};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use log::{info, warn};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use rereadr::api::ReviewBackend;
use rereadr::api::http::HttpBackend;
use rereadr::api::memory::MemoryBackend;
use rereadr::app::{App, AppScreen, SessionScope};
use rereadr::config::Config;
use rereadr::dispatch::Executor;
use rereadr::event::{AppEvent, EventHandler};
use rereadr::review::clock::ReviewClock;
use rereadr::review::history::HistoryMode;
use rereadr::review::queue::QueueKind;
use rereadr::session::navigation;
use rereadr::ui;

#[derive(Parser)]
#[command(name = "rereadr", version, about = "Spaced review of your reading notes and quotes")]
struct Cli {
    #[arg(long, help = "Review server base URL")]
    api_url: Option<String>,

    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(short, long, help = "Interface language (en, ko)")]
    locale: Option<String>,

    #[arg(long, help = "History pagination (paged, infinite)")]
    history_mode: Option<String>,

    #[arg(long, help = "Review a built-in sample library instead of a server")]
    demo: bool,
}

fn parse_history_mode(value: &str) -> Result<HistoryMode> {
    match value {
        "paged" => Ok(HistoryMode::Paged),
        "infinite" => Ok(HistoryMode::Infinite),
        other => bail!("unknown history mode {other:?} (expected paged or infinite)"),
    }
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_logging() -> Result<()> {
    let path = Config::log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = init_logging() {
        eprintln!("logging disabled: {err:#}");
    }

    let mut config = Config::load().unwrap_or_else(|err| {
        warn!("config unreadable, using defaults: {err:#}");
        Config::default()
    });
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }
    if let Some(mode) = cli.history_mode.as_deref() {
        config.history_mode = parse_history_mode(mode)?;
    }
    config.normalize();
    rust_i18n::set_locale(&config.locale);

    let backend: Arc<dyn ReviewBackend> = if cli.demo {
        info!("starting with the demo library");
        Arc::new(MemoryBackend::demo(&ReviewClock::local()))
    } else {
        info!("starting against {}", config.api_url);
        Arc::new(HttpBackend::new(&config.api_url, config.token())?)
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend_term = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend_term)?;

    let events = EventHandler::new(Duration::from_millis(100));
    let mut app = App::new(config, backend, Executor::Threaded(events.sender()))
        .with_config_path(Config::config_path());
    app.start();

    let result = run_app(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::screens::render(frame, app))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Tick => app.tick(),
            AppEvent::Resize(_, _) => {}
            AppEvent::Backend(event) => app.handle_backend(event),
        }

        if app.should_quit {
            info!("quitting");
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    match app.screen {
        AppScreen::Overview => handle_overview_key(app, key),
        AppScreen::Session => handle_session_key(app, key),
        AppScreen::History => handle_history_key(app, key),
    }
}

fn handle_overview_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab => app.overview_next_section(),
        KeyCode::Up | KeyCode::Char('k') => app.overview_move(-1),
        KeyCode::Down | KeyCode::Char('j') => app.overview_move(1),
        KeyCode::Enter | KeyCode::Char('s') => match app.overview_section {
            QueueKind::Today => app.start_session(SessionScope::Today),
            QueueKind::Overdue => app.start_session(SessionScope::Overdue),
            QueueKind::Completed => app.open_history(),
        },
        KeyCode::Char('c') => {
            let outcome = app.complete_selected();
            app.report(outcome);
        }
        KeyCode::Char('p') => {
            let outcome = app.postpone_selected();
            app.report(outcome);
        }
        KeyCode::Char('r') => app.refresh_queues(),
        KeyCode::Char('H') => app.open_history(),
        _ => {}
    }
}

fn handle_session_key(app: &mut App, key: KeyEvent) {
    // While the jump prompt is open it owns every key.
    if app.goto_input.is_some() {
        app.handle_goto_key(key);
        return;
    }
    if let Some(action) = navigation::map_key(&key, &app.key_context()) {
        app.apply_nav(action);
        return;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.leave_session(),
        KeyCode::Char('g') => app.open_goto(),
        KeyCode::Char('p') => {
            let outcome = app.postpone_focused();
            app.report(outcome);
        }
        _ => {}
    }
}

fn handle_history_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.screen = AppScreen::Overview,
        KeyCode::Up | KeyCode::Char('k') => app.history_move(-1),
        KeyCode::Down | KeyCode::Char('j') => app.history_move(1),
        KeyCode::PageUp => app.history_move(-10),
        KeyCode::PageDown => app.history_move(10),
        KeyCode::Enter | KeyCode::Char(' ') => app.history_toggle(),
        KeyCode::Char(']') | KeyCode::Char('l') | KeyCode::Right => app.history_next_page(),
        KeyCode::Char('[') | KeyCode::Char('h') | KeyCode::Left => app.history_prev_page(),
        KeyCode::Char('f') => app.history_cycle_filter(),
        KeyCode::Char('m') => app.history_toggle_mode(),
        KeyCode::Char('r') => app.history_retry(),
        _ => {}
    }
}
