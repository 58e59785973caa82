use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tomato::app::{self, App, KeyAction};
use tomato::config::{self, Config};
use tomato::notify::DesktopNotifier;
use tomato::persistence::FileStore;
use tomato::runtime::{self, TimerHandle};
use tomato::timer::CountStore;
use tomato::{ipc, ui};
use tomato_ipc::{Command, Response, SOCKET_PATH};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tomato")]
#[command(about = "A Pomodoro timer for the terminal", long_about = None)]
struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long)]
    config: Option<PathBuf>,
    /// Run without the terminal UI; control it with tomatoctl
    #[arg(long)]
    headless: bool,
    /// Do not listen on the control socket
    #[arg(long)]
    no_ipc: bool,
    /// Control socket path
    #[arg(long, default_value = SOCKET_PATH)]
    socket: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.headless)?;

    let cfg = config::load_config(cli.config.as_deref())?;
    let durations = cfg.timer.durations()?;

    let store: Box<dyn CountStore> = match FileStore::open_default() {
        Ok(store) => Box::new(store),
        Err(e) => {
            let fallback = std::env::temp_dir().join("tomato");
            warn!("{}, keeping the count in {:?}", e, fallback);
            Box::new(FileStore::in_dir(fallback))
        }
    };
    let notifier = Box::new(DesktopNotifier::new(cfg.notifications.clone()));
    let timer = runtime::spawn(durations, cfg.timer.auto_start_next, notifier, store);

    if !cli.no_ipc {
        let listener = ipc::server::bind(&cli.socket)?;
        tokio::spawn(ipc::server::serve(listener, timer.clone()));
    }

    let result = if cli.headless {
        run_headless(&timer).await
    } else {
        run_terminal(cfg, &timer).await
    };

    timer.send(Command::Shutdown).await;
    if !cli.no_ipc {
        let _ = fs::remove_file(&cli.socket);
    }
    result
}

fn init_tracing(headless: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tomato=info"));
    if headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
        return Ok(());
    }

    // The terminal belongs to the UI, so logs go to a file.
    let dir = config::project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("tomato"));
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {:?}", dir))?;
    let log_path = dir.join("tomato.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

async fn run_headless(timer: &TimerHandle) -> Result<()> {
    info!("Running headless");
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for ctrl-c")?;
            info!("Interrupted");
        }
        _ = timer.stopped() => info!("Timer shut down"),
    }
    Ok(())
}

async fn run_terminal(cfg: Config, timer: &TimerHandle) -> Result<()> {
    // Restore the terminal even if we panic mid-frame
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        original_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = App::new(cfg, timer.latest());
    let res = run_app(&mut terminal, app, timer).await;

    restore_terminal()?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        eprintln!("Error: {:?}", err);
    }
    res
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    timer: &TimerHandle,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut snapshots = timer.subscribe();
    let mut frames = tokio::time::interval(Duration::from_millis(50));

    loop {
        terminal.draw(|f| ui::draw(f, &mut app))?;

        tokio::select! {
            _ = frames.tick() => {}
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                app.apply_snapshot(*snapshots.borrow_and_update());
            }
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    match app::key_action(key.code) {
                        Some(KeyAction::Quit) => return Ok(()),
                        Some(KeyAction::Send(command)) => {
                            if let Response::Error(e) = timer.send(command).await {
                                warn!("Timer rejected command: {}", e);
                            }
                        }
                        None => {}
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            },
        }
    }
}
