#![forbid(unsafe_code)]

mod config;
mod constants;
mod gallery;
mod input;
mod membership;
mod navigation;
mod persistence;
mod site;
mod theme;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::Instant;
use tracing::{error, info, warn, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use config::SiteConfig;
use gallery::display::TerminalDisplay;
use gallery::scheduler::TimerQueue;
use gallery::GalleryController;
use input::InputEvent;
use navigation::ResizeDebouncer;
use persistence::JsonFileStore;
use site::{DirectoryProbe, ImageProbe, Outcome, Site};

type TerminalSite = Site<TerminalDisplay<Stdout>, TimerQueue, JsonFileStore>;

#[derive(Parser, Debug)]
#[command(name = "forum-site", version, about = "Interactive core of the forum website, driven from stdin")]
struct Cli {
    /// Config file (defaults to the user config dir)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Key-value store file (overrides the config)
    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Directory holding img1.jpg..imgN.jpg (overrides the config)
    #[arg(long, value_name = "DIR")]
    images: Option<PathBuf>,

    /// trace, debug, info, warn or error (overrides LOG_LEVEL)
    #[arg(long = "log-level", value_name = "LEVEL")]
    log_level: Option<String>,
}

fn parse_level(raw: &str) -> TraceLevel {
    match raw.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

/// `--log-level` wins over `LOG_LEVEL`; info when neither is set
fn resolve_level(flag: Option<&str>, env: Option<&str>) -> TraceLevel {
    flag.or(env).map(parse_level).unwrap_or(TraceLevel::INFO)
}

#[cfg(unix)]
fn spawn_signal_listener(sender: Sender<InputEvent>) -> Result<()> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;
    std::thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!(signal = signal, "Received termination signal");
                let _ = sender.send(InputEvent::Quit);
            }
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}

#[cfg(not(unix))]
fn spawn_signal_listener(_sender: Sender<InputEvent>) -> Result<()> {
    Ok(())
}

fn report(outcome: &Outcome) -> Result<()> {
    match outcome {
        Outcome::Continue | Outcome::Quit => {}
        Outcome::ThemeChanged(theme) => println!("[theme] {theme}"),
        Outcome::MemberIdIssued(id) => println!("[member-id] {id}"),
        Outcome::NextSequence { category, sequence } => println!("[next] {category} {sequence}"),
        Outcome::Registered(record) => {
            let json = serde_json::to_string_pretty(record).context("Failed to serialize membership record")?;
            println!("[registered] {json}");
        }
        Outcome::Rejected(message) => println!("[error] {message}"),
    }
    Ok(())
}

fn build_site(config: &SiteConfig, store: JsonFileStore) -> TerminalSite {
    let gallery = GalleryController::new(config.gallery_settings(), TerminalDisplay::new(io::stdout()), TimerQueue::new());
    let probe = config.gallery.image_dir.as_ref().map(|dir| {
        info!(dir = %dir.display(), "Probing gallery images on disk");
        Box::new(DirectoryProbe::new(dir)) as Box<dyn ImageProbe>
    });
    Site::new(store, gallery, probe)
}

fn run(site: &mut TerminalSite, events: mpsc::Receiver<InputEvent>) -> Result<()> {
    let mut resize = ResizeDebouncer::default();

    loop {
        let deadline = [site.gallery().scheduler().next_deadline(), resize.deadline()]
            .into_iter()
            .flatten()
            .min();

        let received = match deadline {
            Some(deadline) => match events.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(event) => Some(event),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match events.recv() {
                Ok(event) => Some(event),
                Err(_) => break,
            },
        };

        let now = Instant::now();
        for handle in site.gallery_mut().scheduler_mut().take_due(now) {
            site.on_autoplay_tick(handle);
        }
        if let Some(width) = resize.take_ready(now) {
            site.handle_input(InputEvent::Resize { width });
        }

        match received {
            Some(InputEvent::Resize { width }) => resize.push(width, now),
            Some(event) => {
                let outcome = site.handle_input(event);
                report(&outcome)?;
                if outcome == Outcome::Quit {
                    break;
                }
            }
            None => {}
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging comes up before the config so load and clamp warnings are seen
    let env_level = std::env::var("LOG_LEVEL").ok();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(resolve_level(cli.log_level.as_deref(), env_level.as_deref()))
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install tracing subscriber")?;

    let config_path = cli.config.unwrap_or_else(SiteConfig::default_path);
    let mut config = SiteConfig::load(&config_path).inspect_err(|e| error!(error = ?e, "Config unusable"))?;
    if let Some(dir) = cli.images {
        config.gallery.image_dir = Some(dir);
    }
    info!(config = ?config, "Starting");

    let store_path = cli
        .store
        .or_else(|| config.store_path.clone())
        .unwrap_or_else(JsonFileStore::default_path);
    let store = JsonFileStore::open(&store_path)
        .with_context(|| format!("Failed to open store at {}", store_path.display()))?;
    info!(store = %store.path().display(), "Using key-value store");

    let mut site = build_site(&config, store);
    info!(theme = %site.theme(), "Site ready");

    let (tx, rx) = mpsc::channel();
    if let Err(e) = spawn_signal_listener(tx.clone()) {
        warn!(error = %e, "Signals will not shut down cleanly");
    }
    let _input_handle = input::spawn_stdin_listener(tx)?;

    let result = run(&mut site, rx);
    site.shutdown();
    result
}
