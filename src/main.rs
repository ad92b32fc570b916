mod app;
mod config;
mod gesture;
mod palette;
mod pixels;
mod placement;
mod presets;
mod reconciler;
mod remote;
mod session;
mod settings;
mod simulation;
mod ui;

use app::App;
use clap::Parser;
use config::AppConfig;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseButton, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use presets::{FileStorage, PresetStore};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use reconciler::Tab;
use remote::{HttpRemote, MemoryRemote, RemoteSettingsClient};
use session::Session;
use settings::Configuration;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use ui::Hit;

#[derive(Parser, Debug)]
#[command(name = "sparkle-matrix")]
#[command(about = "Preview, tune and sync an LED sparkle matrix from the terminal")]
struct Args {
    /// Base URL of the device API
    #[arg(long = "device-url")]
    device_url: Option<String>,

    /// API key for the device; without one, device sync is disabled
    #[arg(long = "api-key", env = "SPARKLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective configuration to this file and exit
    #[arg(long = "write-config")]
    write_config: Option<PathBuf>,

    /// Directory holding saved presets
    #[arg(long = "presets-dir")]
    presets_dir: Option<PathBuf>,

    /// Talk to an in-process device instead of the network
    #[arg(long = "simulate-device")]
    simulate_device: bool,

    /// Log file (defaults to the user config directory)
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

fn default_log_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sparkle-matrix").join("sparkle-matrix.log"))
}

/// Log to a file; the terminal belongs to the UI
fn init_logging(path: Option<PathBuf>) -> io::Result<()> {
    let Some(path) = path.or_else(default_log_path) else {
        return Ok(());
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Config file values, then CLI overrides
fn load_config(args: &Args) -> Result<AppConfig, String> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => match AppConfig::default_path().filter(|p| p.exists()) {
            Some(path) => AppConfig::load_from_file(&path).unwrap_or_else(|e| {
                log::warn!("{}; using defaults", e);
                AppConfig::default()
            }),
            None => AppConfig::default(),
        },
    };

    if let Some(url) = &args.device_url {
        config.device_url = url.clone();
    }
    if let Some(key) = &args.api_key {
        config.api_key = Some(key.clone());
    }
    if let Some(dir) = &args.presets_dir {
        config.presets_dir = Some(dir.clone());
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_file.clone())?;

    let config = load_config(&args)?;
    if let Some(path) = &args.write_config {
        config.save_to_file(path)?;
        println!("Wrote configuration to {}", path.display());
        return Ok(());
    }

    let remote: Arc<dyn RemoteSettingsClient> = if args.simulate_device {
        log::info!("Using simulated device");
        let initial = Configuration::default();
        let device = if config.api_key.is_some() {
            MemoryRemote::new(&initial)
        } else {
            MemoryRemote::without_key(&initial)
        };
        device.set_suggestion(
            "Aurora",
            &Configuration::from_colors(&[0x00ff00, 0x00ffff, 0x8000ff], 80, 2, 60),
        );
        Arc::new(device)
    } else {
        log::info!("Using device at {}", config.device_url);
        Arc::new(HttpRemote::new(&config.device_url, config.api_key.clone())?)
    };

    let presets_dir = config
        .presets_dir
        .clone()
        .or_else(FileStorage::default_dir)
        .ok_or("No config directory for presets; pass --presets-dir")?;
    let store = PresetStore::open(Box::new(FileStorage::new(presets_dir)));

    let now = Instant::now();
    let mut session = Session::new(
        store,
        remote,
        Configuration::default(),
        config.applied_hold(),
        config.long_press(),
        now,
    );
    session.mount(now);
    let mut app = App::new(session);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Cleanup
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("Terminal loop failed: {}", err);
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    // Upper bound on input latency while nothing is due
    const MAX_WAIT: Duration = Duration::from_millis(16);

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        let wait = app
            .session
            .next_deadline()
            .saturating_duration_since(Instant::now())
            .min(MAX_WAIT);

        if event::poll(wait)? {
            let now = Instant::now();
            match event::read()? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }

                    if key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        return Ok(());
                    }

                    // The delete confirmation takes every key until answered
                    if app.session.confirmation().is_some() {
                        match key.code {
                            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                                app.resolve_confirmation(true, now)
                            }
                            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                                app.resolve_confirmation(false, now)
                            }
                            _ => {}
                        }
                        continue;
                    }

                    if app.show_help {
                        match key.code {
                            KeyCode::Char('j') | KeyCode::Char('J') | KeyCode::Down => {
                                app.scroll_help_down(ui::HELP_CONTENT_LINES)
                            }
                            KeyCode::Char('k') | KeyCode::Char('K') | KeyCode::Up => {
                                app.scroll_help_up()
                            }
                            KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                            KeyCode::Char('h')
                            | KeyCode::Char('H')
                            | KeyCode::Char('?')
                            | KeyCode::Esc => app.toggle_help(),
                            _ => {}
                        }
                        continue;
                    }

                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => {
                            app.toggle_help()
                        }
                        KeyCode::Char('v') | KeyCode::Char('V') => app.toggle_fullscreen(),
                        KeyCode::Tab => app.next_tab(now),
                        KeyCode::BackTab => app.prev_tab(now),
                        KeyCode::Enter => app.press_primary(now),
                        code => match app.session.tab() {
                            Tab::Colors => match code {
                                KeyCode::Up => app.move_color_cursor(-1),
                                KeyCode::Down => app.move_color_cursor(1),
                                KeyCode::Char(' ') => app.toggle_color(app.color_cursor, now),
                                _ => {}
                            },
                            Tab::Values => match code {
                                KeyCode::Up => app.prev_focus(),
                                KeyCode::Down => app.next_focus(),
                                KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => {
                                    app.adjust_focused(true, now)
                                }
                                KeyCode::Left | KeyCode::Char('-') | KeyCode::Char('_') => {
                                    app.adjust_focused(false, now)
                                }
                                _ => {}
                            },
                            Tab::Presets => match code {
                                KeyCode::Up => app.move_preset_cursor(-1),
                                KeyCode::Down => app.move_preset_cursor(1),
                                KeyCode::Char(' ') => app.select_preset_at_cursor(now),
                                KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Delete => {
                                    app.delete_preset_at_cursor(now)
                                }
                                _ => {}
                            },
                        },
                    }
                }
                Event::Mouse(mouse) => {
                    if app.session.confirmation().is_some() || app.show_help {
                        continue;
                    }
                    let size = terminal.size()?;
                    let area = Rect::new(0, 0, size.width, size.height);
                    let hit = ui::hit_test(area, app, mouse.column, mouse.row);

                    match mouse.kind {
                        MouseEventKind::Down(MouseButton::Left) => match hit {
                            Some(Hit::Tab(tab)) => app.session.select_tab(tab, now),
                            Some(Hit::Color(index)) => app.toggle_color(index, now),
                            Some(Hit::Preset(index)) => app.press_preset(index, now),
                            Some(Hit::Button) => app.press_primary(now),
                            None => {}
                        },
                        MouseEventKind::Drag(MouseButton::Left) => {
                            let index = match hit {
                                Some(Hit::Preset(index)) => Some(index),
                                _ => None,
                            };
                            app.drag_to(index);
                        }
                        MouseEventKind::Up(MouseButton::Left) => app.release(now),
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        app.tick(Instant::now());
    }
}
