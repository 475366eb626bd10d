use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use statusboard::board::BoardPhase;
use statusboard::events;
use statusboard::proxy::{self, CacheProxy, CacheStorage, HttpUpstream};
use statusboard::settings::Settings;
use statusboard::ui::{self, grid::GridLayout};
use statusboard::{app, App, Board, BoardOptions, FileApi, HttpApi, StatusApi, Theme};

#[derive(Parser, Debug)]
#[command(name = "statusboard")]
#[command(about = "Terminal dashboard for endpoint health monitors")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Settings file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend API base URL
    #[arg(short, long, conflicts_with = "dir")]
    api: Option<String>,

    /// Read config.json and readAll.json from a directory instead of the API
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Fixed refresh interval (e.g. "15s"); defaults to half the backend's
    #[arg(short, long)]
    refresh: Option<String>,

    /// Export the current board to a JSON file and exit
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the caching reverse proxy
    Proxy {
        /// Address to listen on
        #[arg(short, long)]
        listen: Option<String>,

        /// Origin to forward requests to
        #[arg(short, long)]
        upstream: Option<String>,

        /// Keep the cache in this file across restarts
        #[arg(long)]
        cache_file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())
        .context("Failed to load settings")?;

    if let Some(Command::Proxy {
        listen,
        upstream,
        cache_file,
    }) = args.command
    {
        if let Some(listen) = listen {
            settings.proxy.listen = listen;
        }
        if let Some(upstream) = upstream {
            settings.proxy.upstream = upstream;
        }
        if cache_file.is_some() {
            settings.proxy.cache_file = cache_file;
        }
        init_stderr_logging();
        return run_proxy(settings);
    }

    if let Some(api) = args.api {
        settings.api.base = api;
        settings.api.dir = None;
    }
    if args.dir.is_some() {
        settings.api.dir = args.dir;
    }
    if args.refresh.is_some() {
        settings.ui.refresh = args.refresh;
    }
    if args.log_file.is_some() {
        settings.ui.log_file = args.log_file;
    }

    // Build a tokio runtime for the board controller
    let rt = tokio::runtime::Runtime::new()?;
    let (api, description) = build_api(&settings)?;

    if let Some(export_path) = args.export {
        return rt.block_on(export_to_file(api.as_ref(), &export_path));
    }

    init_file_logging(settings.ui.log_file.as_deref())?;
    run_tui(&rt, api, description, &settings)
}

/// Pick the backend: a fixture directory when one is configured, the HTTP API otherwise.
fn build_api(settings: &Settings) -> Result<(Arc<dyn StatusApi>, String)> {
    let api: Arc<dyn StatusApi> = match &settings.api.dir {
        Some(dir) => Arc::new(FileApi::new(dir)),
        None => {
            let mut builder = HttpApi::builder()
                .base(settings.api.base.clone())
                .timeout(settings.api.timeout()?);
            for (name, value) in &settings.api.headers {
                builder = builder.header(name.clone(), value.clone());
            }
            Arc::new(builder.build()?)
        }
    };
    let description = api.description().to_string();
    Ok((api, description))
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("statusboard=info")),
        )
        .with_writer(io::stderr)
        .init();
}

/// The terminal belongs to the UI, so logs only go to a file.
fn init_file_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("statusboard=debug")),
        )
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .init();
    Ok(())
}

/// Run the proxy until Ctrl-C.
fn run_proxy(settings: Settings) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let proxy_settings = &settings.proxy;
        let storage = match &proxy_settings.cache_file {
            Some(path) => CacheStorage::open_or_empty(path),
            None => CacheStorage::in_memory(),
        };
        let upstream = HttpUpstream::new(&proxy_settings.upstream, proxy_settings.timeout()?)?;
        let cache_proxy = Arc::new(CacheProxy::new(
            proxy_settings,
            Arc::new(storage),
            Arc::new(upstream),
        ));

        if let Err(e) = cache_proxy.start().await {
            warn!(error = %e, "Could not cache the shell, serving what is cached");
        }

        tokio::select! {
            result = proxy::serve(cache_proxy.clone(), &proxy_settings.listen) => result?,
            _ = tokio::signal::ctrl_c() => info!("Shutting down proxy"),
        }
        Ok::<_, anyhow::Error>(())
    })
}

/// Run the TUI against the given backend
fn run_tui(
    rt: &tokio::runtime::Runtime,
    api: Arc<dyn StatusApi>,
    description: String,
    settings: &Settings,
) -> Result<()> {
    let options = BoardOptions {
        refresh_override: settings.ui.refresh_override()?,
    };
    let handle = {
        let _guard = rt.enter();
        Board::spawn(api, options)
    };
    let theme = Theme::auto_detect();
    let mut app = App::new(handle, description, settings.ui.app_options(), theme);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    // Run the main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result?;

    // A failed initial load ends the UI; report why.
    let failed = matches!(app.state.phase, BoardPhase::Failed(_));
    let handle = app.into_handle();
    if failed {
        rt.block_on(handle.join())
            .context("Could not load the board")?;
    } else {
        handle.shutdown();
    }
    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 40;
    const MIN_HEIGHT: u16 = 10;

    while app.running {
        app.sync();
        if !app.running {
            break;
        }

        terminal.draw(|frame| {
            let area = frame.area();
            app.viewport = area;

            // Check for minimum terminal size
            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let centered = ratatui::layout::Rect::new(0, (area.height / 2).saturating_sub(2), area.width, 5.min(area.height));
                frame.render_widget(paragraph, centered);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Min(6),    // Tile grid
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0]);

            // Lay out the grid for this frame, then fit titles against it.
            let grid_area = chunks[1];
            let grid = GridLayout::compute(&app.tiles, grid_area.width);
            if let Some(rect) = app.selected_tile().and_then(|id| grid.tile_rect(id)) {
                app.scroll = ui::grid::scroll_to_show(app.scroll, rect, grid_area.height);
            }
            app.scroll = app.scroll.min(grid.height.saturating_sub(grid_area.height));
            app.fit_pass(&grid, area);

            let visible = grid.visible(grid_area, app.scroll);
            app.columns = grid.columns;
            app.tile_areas = visible
                .iter()
                .filter_map(|(item, rect)| match item {
                    ui::grid::GridItem::Tile(id) => Some((*id, *rect)),
                    _ => None,
                })
                .collect();
            ui::grid::render(frame, app, &visible);

            ui::common::render_status_bar(frame, app, chunks[2]);

            if app.detail.is_some() {
                ui::detail::render_overlay(frame, app, area);
            }

            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        // Poll for events with a short timeout
        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => events::handle_mouse_event(app, mouse),
                Event::Resize(_, _) => app.request_fit(),
                _ => {}
            }
        }
    }

    Ok(())
}

/// Fetch the board once and write it as JSON
async fn export_to_file(api: &dyn StatusApi, export_path: &Path) -> Result<()> {
    let (config, snapshot) = tokio::try_join!(api.config(), api.read_all())?;
    let export = app::export_json(&config, &snapshot, Some(chrono::Utc::now()));
    std::fs::write(export_path, serde_json::to_string_pretty(&export)?)?;

    println!("Exported board to: {}", export_path.display());
    Ok(())
}
