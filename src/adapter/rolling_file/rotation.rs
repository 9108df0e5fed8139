use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::Context;
use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use crate::logger::config::FileSinkConfig;

#[derive(Debug, Clone)]
pub struct RotationPolicy {
    pub max_size_bytes: u64,
    pub max_age: Duration,
    pub max_backups: u32,
    pub local_time: bool,
    pub compress: bool,
}

impl From<&FileSinkConfig> for RotationPolicy {
    fn from(config: &FileSinkConfig) -> Self {
        Self {
            max_size_bytes: config.max_size_bytes,
            max_age: Duration::from_secs(u64::from(config.max_age_hours) * 3600),
            max_backups: config.max_backups,
            local_time: config.local_time,
            compress: config.compress,
        }
    }
}

/// Append-only writer that rotates the active file before a write
/// would push it past the size bound. Rotated files move aside under a
/// timestamped name, optionally gzipped, and old backups are pruned by
/// count and age.
pub struct RollingWriter {
    path: PathBuf,
    writer: BufWriter<tokio::fs::File>,
    written: u64,
    policy: RotationPolicy,
}

impl RollingWriter {
    /// Opens (or creates) the active file for appending. An existing
    /// file keeps its contents and counts toward the size bound.
    pub async fn open(path: PathBuf, policy: RotationPolicy) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        let written = file.metadata().await?.len();
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written,
            policy,
        })
    }

    pub async fn write_line(&mut self, line: &[u8]) -> anyhow::Result<()> {
        if self.written > 0 && self.written + line.len() as u64 > self.policy.max_size_bytes {
            self.rotate().await.context("rotate log file")?;
        }
        self.writer
            .write_all(line)
            .await
            .with_context(|| format!("write to {}", self.path.display()))?;
        self.written += line.len() as u64;
        Ok(())
    }

    pub async fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush().await
    }

    /// Flushes buffered lines and syncs file data to disk.
    pub async fn sync(&mut self) -> std::io::Result<()> {
        self.writer.flush().await?;
        self.writer.get_ref().sync_data().await
    }

    async fn rotate(&mut self) -> anyhow::Result<()> {
        self.sync().await.context("sync before rotation")?;

        let backup = fresh_backup_path(&self.path, self.policy.local_time).await;
        tokio::fs::rename(&self.path, &backup)
            .await
            .with_context(|| format!("rename {} to {}", self.path.display(), backup.display()))?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("reopen {}", self.path.display()))?;
        self.writer = BufWriter::new(file);
        self.written = 0;

        if self.policy.compress {
            let target = backup.clone();
            match tokio::task::spawn_blocking(move || compress_backup(&target)).await {
                Ok(Ok(gz)) => debug!(backup = %gz.display(), "compressed rotated log"),
                Ok(Err(e)) => warn!(error = %e, "failed to compress rotated log"),
                Err(e) => warn!(error = %e, "log compression task failed"),
            }
        }

        if let Err(e) = prune_backups(&self.path, &self.policy).await {
            warn!(error = %e, "failed to prune log backups");
        }
        Ok(())
    }
}

/// Picks a backup name that does not collide with an existing file.
/// Rotations inside the same millisecond get a numeric suffix.
async fn fresh_backup_path(path: &Path, local_time: bool) -> PathBuf {
    let stamp = if local_time {
        chrono::Local::now().format("%Y%m%d_%H%M%S_%3f").to_string()
    } else {
        chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f").to_string()
    };
    let mut counter = 0;
    loop {
        let candidate = backup_candidate(path, &stamp, counter);
        let gz = gz_path(&candidate);
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false)
            && !tokio::fs::try_exists(&gz).await.unwrap_or(false)
        {
            return candidate;
        }
        counter += 1;
    }
}

fn backup_candidate(path: &Path, stamp: &str, counter: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_string());
    let mut name = if counter == 0 {
        format!("{stem}_{stamp}")
    } else {
        format!("{stem}_{stamp}_{counter}")
    };
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name)
}

fn gz_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".gz");
    path.with_file_name(name)
}

/// Gzips a rotated backup in place, removing the original. Runs on the
/// blocking pool.
fn compress_backup(path: &Path) -> std::io::Result<PathBuf> {
    let target = gz_path(path);
    let mut input = std::fs::File::open(path)?;
    let output = std::fs::File::create(&target)?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    std::io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;
    std::fs::remove_file(path)?;
    Ok(target)
}

/// Deletes backups older than the retention age, then trims the
/// survivors to the backup count, oldest first. Individual delete
/// failures are logged and skipped.
async fn prune_backups(path: &Path, policy: &RotationPolicy) -> anyhow::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_string());
    let prefix = format!("{stem}_");
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut backups: Vec<(PathBuf, SystemTime)> = Vec::new();
    let mut entries = tokio::fs::read_dir(parent)
        .await
        .with_context(|| format!("read log directory {}", parent.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !is_backup_name(&name, &prefix, extension.as_deref()) {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        backups.push((entry.path(), modified));
    }
    backups.sort_by_key(|(_, modified)| *modified);

    let cutoff = SystemTime::now().checked_sub(policy.max_age);
    let mut survivors = Vec::new();
    for (backup, modified) in backups {
        if cutoff.is_some_and(|cutoff| modified < cutoff) {
            remove_backup(&backup).await;
        } else {
            survivors.push(backup);
        }
    }

    let max_backups = policy.max_backups as usize;
    if max_backups > 0 && survivors.len() > max_backups {
        let excess = survivors.len() - max_backups;
        for backup in survivors.drain(..excess) {
            remove_backup(&backup).await;
        }
    }
    Ok(())
}

async fn remove_backup(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(backup = %path.display(), "removed expired log backup"),
        Err(e) => warn!(backup = %path.display(), error = %e, "failed to remove log backup"),
    }
}

/// A backup is `{stem}_{digits...}` with the active file's extension,
/// optionally `.gz`. The digit check keeps sibling logs such as
/// `app_errors.log` from being mistaken for backups of `app.log`.
fn is_backup_name(name: &str, prefix: &str, extension: Option<&str>) -> bool {
    let Some(rest) = name.strip_prefix(prefix) else {
        return false;
    };
    if !rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return false;
    }
    match extension {
        Some(ext) => {
            name.ends_with(&format!(".{ext}")) || name.ends_with(&format!(".{ext}.gz"))
        }
        None => true,
    }
}

// =============================================================================
// Tests
// =============================================================================
