//! Polling change detection over a directory tree.
//!
//! The monitor re-walks its root at a fixed interval, fingerprints every
//! file whose name ends with one of the configured suffixes, and compares
//! the result with the fingerprint stored in a [`ChainedHashMap`] keyed by
//! the file's absolute path. New files and files whose fingerprint changed
//! are reported once per pass.

use crate::chained_hash_map::ChainedHashMap;
use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::thread;
use std::time::Duration;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_COMMAND: &str = "make";

const READ_CHUNK: usize = 128 * 1024;

/// Split a comma-delimited suffix list such as `".c,.py"`.
pub fn parse_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .map(str::to_string)
        .collect()
}

fn matches_extension(name: &OsStr, extensions: &[String]) -> bool {
    name.to_str()
        .is_some_and(|name| extensions.iter().any(|ext| name.ends_with(ext.as_str())))
}

/// Recursively call `callback` for every regular file under `root` whose
/// name ends with one of `extensions`.
///
/// Failing to open `root` is an error. Unreadable entries and
/// subdirectories below it are logged and skipped. A symlink to a regular
/// file is reported under the link's path; symlinked directories are not
/// descended into.
pub fn walk_files<F>(root: &Path, extensions: &[String], callback: &mut F) -> Result<()>
where
    F: FnMut(&Path),
{
    let dir = fs::read_dir(root)
        .map_err(|e| Error::io(format!("failed to open directory '{}'", root.display()), e))?;

    for entry in dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("failed to read entry in '{}': {e}", root.display());
                continue;
            }
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                log::warn!("failed to get status for '{}': {e}", path.display());
                continue;
            }
        };

        if file_type.is_dir() {
            if let Err(e) = walk_files(&path, extensions, callback) {
                log::warn!("{e}");
            }
            continue;
        }
        if !matches_extension(&entry.file_name(), extensions) {
            continue;
        }
        let is_file = if file_type.is_symlink() {
            match fs::metadata(&path) {
                Ok(target) => target.is_file(),
                Err(e) => {
                    log::warn!("failed to resolve link '{}': {e}", path.display());
                    false
                }
            }
        } else {
            file_type.is_file()
        };
        if is_file {
            callback(&path);
        }
    }
    Ok(())
}

/// Content fingerprint: wrapping sum of every byte in the file.
///
/// Bytes are added as unsigned values, so `0xff` contributes 255 rather
/// than the -1 a signed `char` sum would give.
pub fn fingerprint(path: &Path) -> Result<u64> {
    let context = || format!("failed to read '{}'", path.display());
    let mut file = File::open(path).map_err(|e| Error::io(context(), e))?;
    let mut buf = vec![0u8; READ_CHUNK];
    let mut sum = 0u64;
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::io(context(), e)),
        };
        sum = buf[..n]
            .iter()
            .fold(sum, |acc, &b| acc.wrapping_add(u64::from(b)));
    }
    Ok(sum)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Change {
    /// First sighting of the path.
    New,
    /// Fingerprint differs from the stored one.
    Modified { previous: u64 },
}

/// Remembers the last fingerprint seen for each path.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    seen: ChainedHashMap<u64>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `fingerprint` for `path` and report whether it changed.
    pub fn observe(&mut self, path: &str, fingerprint: u64) -> Result<Option<Change>> {
        let change = match self.seen.get(path) {
            Some(&previous) if previous == fingerprint => return Ok(None),
            Some(&previous) => Change::Modified { previous },
            None => Change::New,
        };
        self.seen.put(path, fingerprint)?;
        Ok(Some(change))
    }

    /// Forget every tracked path missing from `visited`. Returns how many
    /// were dropped; a path that later reappears is reported as new.
    pub fn retain_visited(&mut self, visited: &ChainedHashMap<()>) -> usize {
        let gone: Vec<String> = self
            .seen
            .iter()
            .filter(|(path, _)| !visited.contains_key(path))
            .map(|(path, _)| path.to_string())
            .collect();
        for path in &gone {
            self.seen.remove(path);
        }
        gone.len()
    }

    pub fn tracked(&self) -> usize {
        self.seen.len()
    }
}

/// Resolved monitor settings.
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub root: PathBuf,
    pub extensions: Vec<String>,
    pub interval: Duration,
    pub command: String,
}

impl MonitorConfig {
    /// Canonicalize `root` so every tracked key is an absolute path.
    pub fn new(root: &Path, extensions: Vec<String>) -> Result<Self> {
        let root = fs::canonicalize(root)
            .map_err(|e| Error::io(format!("failed to resolve '{}'", root.display()), e))?;
        Ok(Self {
            root,
            extensions,
            interval: DEFAULT_INTERVAL,
            command: DEFAULT_COMMAND.to_string(),
        })
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }
}

pub struct Monitor {
    config: MonitorConfig,
    detector: ChangeDetector,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            detector: ChangeDetector::new(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn tracked(&self) -> usize {
        self.detector.tracked()
    }

    /// Walk the tree once, calling `on_change` for every new or modified
    /// file. Returns how many files changed.
    ///
    /// Paths that were tracked but not found by this walk are forgotten.
    /// If the root itself cannot be read nothing is forgotten.
    pub fn poll_once<F>(&mut self, mut on_change: F) -> Result<usize>
    where
        F: FnMut(&Path, Change),
    {
        let detector = &mut self.detector;
        let mut visited: ChainedHashMap<()> = ChainedHashMap::new();
        let mut changed = 0;
        walk_files(
            &self.config.root,
            &self.config.extensions,
            &mut |path: &Path| {
                let Some(key) = path.to_str() else {
                    log::warn!("skipping non UTF-8 path '{}'", path.display());
                    return;
                };
                if let Err(e) = visited.put(key, ()) {
                    log::warn!("could not record '{key}': {e}");
                }
                let fp = match fingerprint(path) {
                    Ok(fp) => fp,
                    Err(e) => {
                        log::warn!("{e}");
                        return;
                    }
                };
                match detector.observe(key, fp) {
                    Ok(Some(change)) => {
                        changed += 1;
                        on_change(path, change);
                    }
                    Ok(None) => {}
                    Err(e) => log::warn!("could not track '{key}': {e}"),
                }
            },
        )?;

        let forgotten = detector.retain_visited(&visited);
        if forgotten > 0 {
            log::debug!("forgot {forgotten} vanished files");
        }
        Ok(changed)
    }

    /// Poll every `interval` until `max_passes` passes have run, or forever.
    /// A pass that cannot open the root is logged and retried next interval.
    pub fn run<F>(&mut self, max_passes: Option<usize>, mut on_change: F)
    where
        F: FnMut(&Path, Change),
    {
        let mut passes = 0usize;
        loop {
            match self.poll_once(&mut on_change) {
                Ok(changed) if changed > 0 => log::debug!("pass {passes}: {changed} changed"),
                Ok(_) => {}
                Err(e) => log::warn!("{e}"),
            }
            passes += 1;
            if max_passes.is_some_and(|max| passes >= max) {
                return;
            }
            thread::sleep(self.config.interval);
        }
    }
}

/// Run the build action through `sh -c` in `dir`. A non-zero exit status is
/// logged and returned, not treated as an error.
pub fn run_build_command(command: &str, dir: &Path) -> Result<ExitStatus> {
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(dir)
        .status()
        .map_err(|e| Error::io(format!("failed to run '{command}'"), e))?;
    if !status.success() {
        log::warn!("'{command}' exited with {status}");
    }
    Ok(status)
}
