//! Flat-file persistence for the known-good and history lists.
//!
//! Rewrites go to a `.tmp` sibling that is renamed over the target, so a
//! reader never sees a half-written list. Appends during a run are funnelled
//! through a single [`HistoryWriter`] task.

use crate::proxy::lists;
use crate::Result;
use anyhow::Context;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

/// Suffix of the file written before the atomic rename.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Capacity of the append channel.
const APPEND_QUEUE: usize = 256;

/// Read a file line by line. A missing file reads as empty.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to open {}", path.display()));
        }
    };

    BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("failed to read {}", path.display()))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Replace the file at `path` with `lines`, one per line.
pub fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let temp = temp_path(path);
    let file = fs::File::create(&temp)
        .with_context(|| format!("failed to create {}", temp.display()))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{}", line)?;
    }
    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .and_then(|file| file.sync_all())
        .with_context(|| format!("failed to flush {}", temp.display()))?;

    fs::rename(&temp, path)
        .with_context(|| format!("failed to move {} into place", temp.display()))?;
    Ok(())
}

/// Remove a file if it exists.
pub fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
    }
}

/// Deduplicate, drop blank lines, sort and rewrite a list file.
///
/// Applied the same way to the known-good and history files. Running it
/// twice leaves the file byte-identical.
pub fn compact(path: &Path) -> Result<usize> {
    let lines = read_lines(path)?;
    let lines = lists::sort(lists::remove_empty(lists::remove_duplicates(lines)));
    write_lines(path, &lines)?;
    Ok(lines.len())
}

/// Single writer appending lines to one file.
///
/// Clones of the handle can be shared across tasks; each line is written by
/// the one background task, so lines never interleave.
#[derive(Clone)]
pub struct HistoryWriter {
    tx: mpsc::Sender<String>,
}

impl HistoryWriter {
    /// Spawn the writer task for `path`. Join the returned handle after every
    /// clone of the writer has been dropped to know all lines are on disk.
    pub fn spawn(path: PathBuf) -> (Self, JoinHandle<usize>) {
        let (tx, mut rx) = mpsc::channel::<String>(APPEND_QUEUE);

        let handle = tokio::spawn(async move {
            let mut written = 0;
            while let Some(line) = rx.recv().await {
                match append_line(&path, &line).await {
                    Ok(()) => written += 1,
                    Err(e) => error!(path = %path.display(), error = %e, "failed to append line"),
                }
            }
            written
        });

        (Self { tx }, handle)
    }

    /// Queue a line for appending. Logs and drops it if the writer is gone.
    pub async fn append(&self, line: String) {
        if self.tx.send(line).await.is_err() {
            error!("history writer stopped; line dropped");
        }
    }
}

async fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(format!("{}\n", line).as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
