//! swipe-drawer - replay pointer scripts through the drawer gesture responder
//!
//! Prints how each script resolves (toggles, final offset, offset timeline).
//! Useful for tuning fling speed, hysteresis and peek delay against recorded
//! input.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use swipe_drawer::config::DrawerConfig;
use swipe_drawer::replay::{self, Script};

#[derive(Parser, Debug)]
#[command(name = "swipe-drawer")]
#[command(about = "Replay pointer gestures against a swipeable drawer", long_about = None)]
struct Args {
    /// Gesture script (TOML)
    script: PathBuf,

    /// Drawer config (TOML), overrides the script's [drawer] table
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use the right-anchored discussion drawer instead of the nav sidebar
    #[arg(short, long, conflicts_with = "config")]
    right: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    // Log panics before crashing
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        let crash_log = log_dir().join("crash.log");
        if let Ok(mut f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&crash_log)
        {
            use std::io::Write;
            let _ = writeln!(f, "[{}] PANIC: {}", chrono::Local::now(), panic_info);
        }
    }));

    let args = Args::parse();

    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = rolling::daily(&log_dir, "replay.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Quiet by default, verbose with --debug
    let default_filter = if args.debug {
        "debug,swipe_drawer=debug"
    } else {
        "warn,swipe_drawer=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    info!(log_path = %log_dir.display(), "swipe-drawer starting");

    let script = Script::load(&args.script)
        .with_context(|| format!("loading script {}", args.script.display()))?;

    let config = match (&args.config, args.right) {
        (Some(path), _) => Some(
            DrawerConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
        ),
        (None, true) => Some(DrawerConfig::discussion_thread()),
        (None, false) => None,
    };

    let report = replay::run(&script, config).context("replaying script")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "toggles: {}  open: {}  offset: {:.1}  ignored events: {}",
            report.toggles, report.is_open, report.offset, report.ignored_events
        );
        for sample in &report.samples {
            println!("{:>6} ms  {:>7.1}", sample.at_ms, sample.offset);
        }
    }
    Ok(())
}

/// ~/.local/state/swipe-drawer (or /tmp/swipe-drawer)
fn log_dir() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".local/state")))
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join("swipe-drawer")
}
