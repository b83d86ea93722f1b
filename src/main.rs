use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use blinken_deck::{
    config::Config,
    exec::{Capabilities, Executor},
    hardware::{
        terminal::{Keyboard, TerminalBuzzer, TerminalGuard, TerminalScreen},
        FrameBuffer, HostLink, NoButtons, Peripherals, SystemClock,
    },
    input::InputMonitor,
    software::{LocalLibrary, SoftwareCatalog, SoftwareItem},
    web, App,
};

#[derive(Parser, Debug)]
#[command(name = "blinken-deck")]
#[command(about = "PIN-gated software manager for a four-button 64x32 handheld")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/blinken-deck/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the remote catalog and exit
    #[arg(long)]
    list: bool,

    /// Print installed packages and exit
    #[arg(long)]
    installed: bool,

    /// Download one package from the catalog and exit
    #[arg(long, value_name = "NAME")]
    fetch: Option<String>,

    /// Run an installed package without the simulator and exit
    #[arg(long, value_name = "NAME")]
    run_package: Option<String>,

    /// Save the last frame of --run-package as a PNG
    #[arg(long, value_name = "PNG", requires = "run_package")]
    snapshot: Option<PathBuf>,

    /// Publish a directory of packages as a catalog server
    #[arg(long, value_name = "DIR")]
    serve: Option<PathBuf>,
}

impl Cli {
    /// The simulator shares the terminal with its frame, so it stays quiet
    /// unless RUST_LOG asks otherwise
    fn default_log_level(&self) -> &'static str {
        let simulator = !(self.list
            || self.installed
            || self.fetch.is_some()
            || self.run_package.is_some()
            || self.serve.is_some());
        if simulator {
            "warn"
        } else {
            "info"
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log to stderr; the simulator owns stdout
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.default_log_level())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(dir) = cli.serve {
        return serve(&config, dir);
    }

    if cli.list {
        return list_catalog(&config);
    }

    if cli.installed {
        return list_installed(&config);
    }

    if let Some(name) = cli.fetch {
        return fetch(&config, &name);
    }

    if let Some(name) = cli.run_package {
        return run_package(&config, &name, cli.snapshot.as_deref());
    }

    run_simulator(&config)
}

/// Run the device in the terminal until the user quits
fn run_simulator(config: &Config) -> Result<()> {
    let _guard = TerminalGuard::enter().context("Failed to set up terminal")?;
    let keyboard = Keyboard::new();

    let peripherals = Peripherals {
        screen: Box::new(TerminalScreen::new(keyboard.clone())),
        buttons: Box::new(keyboard.clone()),
        buzzer: Box::new(TerminalBuzzer),
        clock: Box::new(SystemClock::new()),
        link: Box::new(HostLink),
    };

    info!("Starting blinken-deck simulator");
    let mut app = App::new(config, peripherals);
    app.run(|| !keyboard.quit_requested());
    Ok(())
}

fn serve(config: &Config, dir: PathBuf) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(async {
        tokio::select! {
            result = web::serve(&config.serve.bind, dir) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                Ok(())
            }
        }
    })
}

fn list_catalog(config: &Config) -> Result<()> {
    let mut catalog = SoftwareCatalog::http(&config.server);
    let items = catalog
        .fetch_list()
        .with_context(|| format!("Failed to list {}", config.server.base_url))?;

    for item in items {
        println!("{}", item);
    }
    Ok(())
}

fn list_installed(config: &Config) -> Result<()> {
    let library = LocalLibrary::new(&config.storage.software_dir);
    for item in library.list() {
        println!("{}", item);
    }
    Ok(())
}

fn fetch(config: &Config, name: &str) -> Result<()> {
    let item = SoftwareItem::new(name)?;
    let library = LocalLibrary::new(&config.storage.software_dir);
    let mut catalog = SoftwareCatalog::http(&config.server);

    let bytes = catalog
        .download(&item, &library)
        .with_context(|| format!("Failed to download {}", item))?;
    println!("{}: {} bytes -> {}", item, bytes, library.path_of(&item).display());
    Ok(())
}

fn run_package(config: &Config, name: &str, snapshot: Option<&Path>) -> Result<()> {
    let item = SoftwareItem::new(name)?;
    let library = LocalLibrary::new(&config.storage.software_dir);

    let mut frame = FrameBuffer::new();
    let mut clock = SystemClock::new();
    let mut input = InputMonitor::new(
        Box::new(NoButtons),
        config.timing.input_settle(),
        config.timing.input_debounce(),
    );

    let caps = Capabilities::new(&mut frame, &mut clock, &mut input);
    let report = Executor::new(config.executor.clone())
        .run(&library, &item, caps)
        .with_context(|| format!("Failed to run {}", item))?;
    println!(
        "{}: {} steps, {} frames, {:?} waiting",
        item, report.steps, report.frames, report.waited
    );

    if let Some(path) = snapshot {
        frame
            .save_png(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Last frame saved to {}", path.display());
    }
    Ok(())
}
