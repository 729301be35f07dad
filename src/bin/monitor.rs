//! monitor: a very limited file watcher and command runner.
//!
//! Polls a directory tree and runs a build command (default `make`) once for
//! every file that is new or whose contents changed since the previous pass.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chained_hashmap::watch::{parse_extensions, run_build_command};
use chained_hashmap::{Change, Monitor, MonitorConfig};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "monitor", version, about = "Run a build command whenever watched files change")]
#[command(
    long_about = "Scans DIR recursively every interval, fingerprinting each file whose name\n\
ends with one of EXTS by summing its bytes. The build command runs once per\n\
new or changed file, from inside DIR.\n\n\
Set RUST_LOG=debug for per-pass details."
)]
struct Cli {
    /// Directory to watch
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// Comma-delimited list of file suffixes, e.g. '.c,.py'
    #[arg(value_name = "EXTS")]
    exts: String,

    /// Polling interval in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 100)]
    interval_ms: u64,

    /// Build command, run through `sh -c`
    #[arg(short, long, value_name = "CMD", default_value = "make")]
    command: String,

    /// Stop after this many passes instead of polling forever
    #[arg(long, value_name = "N")]
    max_passes: Option<usize>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> chained_hashmap::Result<()> {
    let extensions = parse_extensions(&cli.exts);
    if extensions.is_empty() {
        log::warn!("no suffixes given; nothing will be watched");
    }
    for ext in &extensions {
        log::info!("found ext: '{ext}'");
    }

    let config = MonitorConfig::new(&cli.dir, extensions)?
        .with_interval(Duration::from_millis(cli.interval_ms))
        .with_command(cli.command);
    let root = config.root.clone();
    let command = config.command.clone();
    log::info!("monitoring {}", root.display());

    let mut monitor = Monitor::new(config);
    monitor.run(cli.max_passes, |path, change| {
        match change {
            Change::New => log::info!("new file found: {}", path.display()),
            Change::Modified { .. } => log::info!("change detected in: {}", path.display()),
        }
        if let Err(e) = run_build_command(&command, &root) {
            log::error!("{e}");
        }
    });
    Ok(())
}
