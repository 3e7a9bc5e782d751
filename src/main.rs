use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    Terminal,
};
use tokio::runtime::Runtime;
use tracing::info;

use vmiwatch::config::Settings;
use vmiwatch::logging::{init_logging, LogTarget};
use vmiwatch::types::{display_label, MetricKind, WindowHours};
use vmiwatch::ui::{self, Theme};
use vmiwatch::{events, App, BackendClient, Dashboard, QueryOutcome, Selection, View};

#[derive(Parser, Debug)]
#[command(name = "vmiwatch")]
#[command(about = "Terminal dashboard for a Ventilairsec VMI gateway")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides backend.url)
    #[arg(short, long, global = true)]
    url: Option<String>,

    /// Log file for the interactive dashboard (overrides logging.file)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the interactive dashboard (default)
    Watch,
    /// Fetch one snapshot and health probe, write them as JSON and exit
    Export {
        /// Output file
        path: PathBuf,
    },
    /// List the devices configured on the gateway
    Devices,
    /// Print the history of a device
    History {
        /// Device identifier
        device: String,
        /// Only this metric, with derived statistics
        #[arg(short, long)]
        metric: Option<String>,
        /// Window in hours (defaults to history.window_hours)
        #[arg(long)]
        hours: Option<WindowHours>,
    },
    /// Delete old readings on the gateway
    Cleanup {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut overrides = Vec::new();
    if let Some(url) = &args.url {
        overrides.push(("backend.url", url.clone()));
    }
    if let Some(path) = &args.log_file {
        overrides.push(("logging.file", path.display().to_string()));
    }
    let settings = Settings::load(args.config.as_deref(), &overrides)?;

    let command = args.command.unwrap_or(Command::Watch);
    let target = match command {
        Command::Watch => LogTarget::File(&settings.logging.file),
        _ => LogTarget::Stderr,
    };
    init_logging(&settings.logging.level, target)?;

    // One worker drives timers and fetches while the main thread owns the terminal
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;

    match command {
        Command::Watch => run_tui(&rt, &settings),
        Command::Export { path } => rt.block_on(export(&settings, &path)),
        Command::Devices => rt.block_on(list_devices(&settings)),
        Command::History {
            device,
            metric,
            hours,
        } => {
            let window = hours.unwrap_or(settings.history.window);
            rt.block_on(print_history(&settings, &device, metric.as_deref(), window))
        }
        Command::Cleanup { yes } => rt.block_on(cleanup(&settings, yes)),
    }
}

/// Run the interactive dashboard until the user quits
fn run_tui(rt: &Runtime, settings: &Settings) -> Result<()> {
    let _guard = rt.enter();

    let dashboard = Arc::new(Dashboard::from_settings(settings)?);
    info!(url = %settings.backend.url, "starting dashboard");

    // Detect the theme before raw mode so the terminal query does not mix with input
    let theme = Theme::auto_detect();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableFocusChange);
        original_hook(panic);
    }));

    dashboard.start();
    let mut app = App::new(dashboard.clone(), rt.handle().clone(), theme);
    app.load_devices();

    let result = run_app(&mut terminal, &mut app);

    dashboard.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 14;

    while app.running {
        app.sync();

        terminal.draw(|frame| {
            let area = frame.area();

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = Paragraph::new(msg)
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::Yellow));
                let centered = Rect::new(0, (area.height / 2).saturating_sub(2), area.width, 5)
                    .intersection(area);
                frame.render_widget(paragraph, centered);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Length(1), // Tabs
                Constraint::Min(10),   // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0]);
            ui::common::render_tabs(frame, app, chunks[1]);

            match app.current_view {
                View::Current => ui::current::render(frame, app, chunks[2]),
                View::History => ui::history::render(frame, app, chunks[2]),
                View::Devices => ui::devices::render(frame, app, chunks[2]),
            }

            ui::common::render_status_bar(frame, app, chunks[3]);

            if app.show_cleanup_confirm {
                ui::common::render_cleanup_confirm(frame, app, area);
            }
            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            events::handle_event(app, event);
        }
    }

    Ok(())
}

/// Export one fresh snapshot and health probe
async fn export(settings: &Settings, path: &Path) -> Result<()> {
    let dashboard = Dashboard::from_settings(settings)?;
    let (view, connected) =
        tokio::join!(dashboard.snapshots().refresh(), dashboard.health().probe());
    dashboard.export_report(path)?;

    println!(
        "Exported {} devices (gateway {}) to: {}",
        view.len(),
        if connected { "connected" } else { "disconnected" },
        path.display()
    );
    Ok(())
}

async fn list_devices(settings: &Settings) -> Result<()> {
    let dashboard = Dashboard::from_settings(settings)?;
    let devices = dashboard.load_devices().await;
    if devices.is_empty() {
        println!("No configured device.");
        return Ok(());
    }

    println!("{:<24} {:<16} ID", "NAME", "TYPE");
    for device in devices.iter() {
        println!("{:<24} {:<16} {}", device.name, device.kind, device.id);
    }
    Ok(())
}

async fn print_history(
    settings: &Settings,
    device: &str,
    metric: Option<&str>,
    window: WindowHours,
) -> Result<()> {
    let Some(metric) = metric else {
        let client = BackendClient::http(&settings.backend.url, settings.backend.timeout)?;
        let readings = client.history(device, window).await;
        if readings.is_empty() {
            println!("No readings for {} in the last {}.", device, window);
        }
        for r in &readings {
            let value = MetricKind::from_key(&r.metric).format(r.value);
            println!(
                "{}  {:<24} {}",
                r.timestamp.format("%Y-%m-%d %H:%M:%S"),
                display_label(&r.metric),
                value
            );
        }
        return Ok(());
    };

    let dashboard = Dashboard::from_settings(settings)?;
    let selection = Selection::new(device, metric).with_window(window);
    let QueryOutcome::Applied(result) = dashboard.history().query(selection).await else {
        bail!("history query was superseded");
    };

    let kind = MetricKind::from_key(metric);
    for p in &result.points {
        println!("{}  {}", p.timestamp.format("%Y-%m-%d %H:%M:%S"), kind.format(p.value));
    }
    match result.statistics {
        Some(stats) => println!(
            "\n{}: min {:.2}  max {:.2}  mean {:.2}  samples {}",
            result.selection, stats.min, stats.max, stats.mean, stats.sample_count
        ),
        None => println!("No data for {}.", result.selection),
    }
    Ok(())
}

async fn cleanup(settings: &Settings, yes: bool) -> Result<()> {
    if !yes && !confirm("Delete old readings on the gateway? [y/N] ")? {
        println!("Cancelled.");
        return Ok(());
    }

    let dashboard = Dashboard::from_settings(settings)?;
    if dashboard.cleanup().await {
        println!("Old readings removed.");
        Ok(())
    } else {
        bail!("cleanup failed")
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
