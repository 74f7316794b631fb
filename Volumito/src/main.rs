//! Volumito: terminal remote control for a Volumio player.

mod app;
mod ui;

use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use volconfig::Config;
use volcontrol::{CommandDispatcher, PlayerApi, Poller, StateStore, VolumioClient};

use crate::app::App;

const ENV_LOG_FILE: &str = "VOLUMITO_LOG_FILE";

fn main() -> Result<()> {
    // Restore the terminal even on panic
    std::panic::set_hook(Box::new(|panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        eprintln!("\n\nVolumito panicked: {panic_info}");
    }));

    let config = Config::load_config("").context("Cannot load Volumito configuration")?;
    if config.was_created() {
        println!(
            "Created default configuration at {}.\nSet volumio_host to your player and start volumito again.",
            config.path().display()
        );
        return Ok(());
    }

    init_tracing(&config);

    let host = config.get_volumio_host()?;
    let client = VolumioClient::new(&host, config.get_http_timeout());
    info!(base_url = client.base_url(), "Starting Volumito");

    let api: Arc<dyn PlayerApi> = Arc::new(client);
    let store = StateStore::new();
    let poller = Poller::new(api.clone(), store.clone(), config.get_poll_interval());
    let dispatcher = CommandDispatcher::new(api, store.clone());

    let app = App::new(
        dispatcher,
        store,
        host,
        config.get_volume_step(),
        config.get_seek_step(),
    );

    poller.start();
    let result = run_app(app, config.get_render_interval());
    poller.stop();

    info!("Volumito stopped");
    result
}

fn init_tracing(config: &Config) {
    let _ = tracing_log::LogTracer::init();
    let writer = log_writer(config);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.get_log_min_level()))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
}

/// The terminal belongs to the UI: logs go to a file or nowhere.
fn log_writer(config: &Config) -> BoxMakeWriter {
    let path = env::var(ENV_LOG_FILE)
        .ok()
        .map(PathBuf::from)
        .or_else(|| config.get_log_file());

    if let Some(path) = path {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                let shared = SharedLogWriter::new(file);
                return BoxMakeWriter::new(move || shared.clone());
            }
            Err(err) => {
                eprintln!("Cannot open {} for logging: {err}", path.display());
            }
        }
    }
    BoxMakeWriter::new(io::sink)
}

#[derive(Clone)]
struct SharedLogWriter {
    inner: Arc<Mutex<File>>,
}

impl SharedLogWriter {
    fn new(file: File) -> Self {
        Self {
            inner: Arc::new(Mutex::new(file)),
        }
    }
}

impl Write for SharedLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| io::Error::other(err.to_string()))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| io::Error::other(err.to_string()))?;
        guard.flush()
    }
}

fn run_app(mut app: App, tick_rate: Duration) -> Result<()> {
    let terminal = setup_terminal()?;
    let mut guard = TerminalGuard { terminal };
    let mut last_tick = Instant::now();

    loop {
        guard.terminal.draw(|f| ui::draw(f, &app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if app.handle_key(key) {
                    break;
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}
