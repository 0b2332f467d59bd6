mod app;
mod headless;
mod provider;
mod session;
mod settings;
mod ui;

use anyhow::{Context, Result};
use app::{poll_event, App};
use clap::Parser;
use crossterm::event::Event;
use headless::OutputFormat;
use ratatui::DefaultTerminal;
use session::Controller;
use settings::{load_settings, ProviderKind, Settings};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Settings file (TOML). Defaults to ./speedring.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    provider: Option<ProviderKind>,
    /// Measurement backend URL for the http provider.
    #[arg(long)]
    endpoint: Option<String>,
    /// Run a single test without the terminal UI.
    #[arg(long)]
    headless: bool,
    /// Print the headless report as JSON.
    #[arg(long, requires = "headless")]
    json: bool,
    /// Write logs here while the terminal UI is active.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(provider) = args.provider {
        settings.provider = provider;
    }
    if let Some(endpoint) = args.endpoint.clone() {
        settings.http.endpoint = endpoint;
    }

    let provider = provider::build_provider(&settings)?;
    let controller = Controller::new(provider, settings.controller_config());

    if args.headless {
        let format = if args.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        };
        return headless::run(controller, format).await;
    }

    let mut terminal = ratatui::init();
    terminal.clear()?;

    let result = run_app(&mut terminal, controller, settings).await;

    ratatui::restore();
    result
}

fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if args.headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else if let Some(path) = &args.log_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

async fn run_app(
    terminal: &mut DefaultTerminal,
    controller: Controller,
    settings: Settings,
) -> Result<()> {
    let mut app = App::new(controller, settings);

    loop {
        app.tick();
        terminal.draw(|frame| ui::draw_ui(frame, &app))?;

        if let Some(Event::Key(key)) = poll_event(Duration::from_millis(30))? {
            if let Some(action) = app.handle_key_event(key) {
                app.perform(action);
            }
        }

        if app.should_quit {
            break;
        }
    }

    app.controller.teardown();
    Ok(())
}
