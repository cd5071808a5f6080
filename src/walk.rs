use std::{
    ffi::{OsStr, OsString},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Error, Result, ensure};
use log::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::{
    compress::{self, CompressStats},
    config::{ErrorPolicy, WalkOptions},
};

#[derive(Debug)]
pub struct Compressed {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub stats: CompressStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The name already ends in the compressed-file suffix.
    AlreadyCompressed,
    /// The compressed counterpart exists and `skip_existing` is set.
    DestExists,
    /// A dangling symlink, FIFO, socket or device.
    NotRegular,
}

#[derive(Debug)]
pub struct Skipped {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub error: Error,
}

/// Outcome of one walk, one entry per non-directory entry seen.
#[derive(Debug, Default)]
pub struct WalkReport {
    pub compressed: Vec<Compressed>,
    pub skipped: Vec<Skipped>,
    pub failures: Vec<Failure>,
}

impl WalkReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn bytes_in(&self) -> u64 {
        self.compressed.iter().map(|c| c.stats.bytes_in).sum()
    }

    pub fn bytes_out(&self) -> u64 {
        self.compressed.iter().map(|c| c.stats.bytes_out).sum()
    }

    fn record_failure(&mut self, path: PathBuf, error: Error, policy: ErrorPolicy) -> Result<()> {
        match policy {
            ErrorPolicy::Abort => Err(error),
            ErrorPolicy::Continue => {
                warn!("skipping {}: {error:#}", path.display());
                self.failures.push(Failure { path, error });
                Ok(())
            }
        }
    }
}

/// Compresses every file under `root` into a sibling named `<file><suffix>`.
///
/// Files whose name already ends in the suffix are skipped. Directory symlinks
/// are not descended into; symlinks to regular files are compressed like files.
/// Anything else that is not a directory is recorded as [`SkipReason::NotRegular`].
/// `root` must be a directory.
///
/// Under [`ErrorPolicy::Abort`] the first failure is returned and the remaining
/// files are left untouched. Traversal errors count as failures too, so an
/// unreadable subdirectory stops the walk unless the policy is
/// [`ErrorPolicy::Continue`].
pub fn walk_and_compress(root: &Path, options: &WalkOptions) -> Result<WalkReport> {
    options.validate()?;
    // A missing root is left to the traversal so it follows the error policy.
    if let Ok(meta) = fs::metadata(root) {
        ensure!(meta.is_dir(), "{} is not a directory", root.display());
    }

    let mut report = WalkReport::default();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                let error =
                    Error::new(err).context(format!("failed to walk {}", path.display()));
                report.record_failure(path, error, options.on_error)?;
                continue;
            }
        };
        let source = entry.path();
        match kind(&entry) {
            EntryKind::Dir => continue,
            EntryKind::File => {}
            EntryKind::Other => {
                debug!("{} is not a regular file", source.display());
                report.skipped.push(Skipped {
                    path: source.to_path_buf(),
                    reason: SkipReason::NotRegular,
                });
                continue;
            }
        }

        if has_suffix(entry.file_name(), &options.suffix) {
            report.skipped.push(Skipped {
                path: source.to_path_buf(),
                reason: SkipReason::AlreadyCompressed,
            });
            continue;
        }

        let dest = dest_path(source, &options.suffix);
        if options.skip_existing && dest.exists() {
            debug!("{} already exists", dest.display());
            report.skipped.push(Skipped {
                path: source.to_path_buf(),
                reason: SkipReason::DestExists,
            });
            continue;
        }

        if !options.quiet {
            println!("{}", progress_line(source, &dest));
        }
        match compress::compress_file(source, &dest, options.block_size) {
            Ok(stats) => {
                debug!(
                    "{}: {} -> {} bytes in {} blocks",
                    source.display(),
                    stats.bytes_in,
                    stats.bytes_out,
                    stats.blocks
                );
                report.compressed.push(Compressed {
                    source: source.to_path_buf(),
                    dest,
                    stats,
                });
            }
            Err(error) => report.record_failure(source.to_path_buf(), error, options.on_error)?,
        }
    }

    info!(
        "{}: compressed {} files ({} -> {} bytes), skipped {}, failed {}",
        root.display(),
        report.compressed.len(),
        report.bytes_in(),
        report.bytes_out(),
        report.skipped.len(),
        report.failures.len()
    );

    Ok(report)
}

enum EntryKind {
    Dir,
    File,
    Other,
}

fn kind(entry: &DirEntry) -> EntryKind {
    let file_type = entry.file_type();
    if file_type.is_dir() {
        return EntryKind::Dir;
    }
    if file_type.is_file() {
        return EntryKind::File;
    }
    if entry.path_is_symlink() {
        // Resolve the link target; a dangling link falls through to `Other`.
        match fs::metadata(entry.path()) {
            Ok(meta) if meta.is_dir() => return EntryKind::Dir,
            Ok(meta) if meta.is_file() => return EntryKind::File,
            _ => {}
        }
    }
    EntryKind::Other
}

pub fn progress_line(source: &Path, dest: &Path) -> String {
    format!("Compressing: {} -> {}", source.display(), dest.display())
}

fn has_suffix(name: &OsStr, suffix: &str) -> bool {
    name.as_encoded_bytes().ends_with(suffix.as_bytes())
}

/// `source` with `suffix` appended to the whole file name: `a.txt` -> `a.txt.gz`.
pub fn dest_path(source: &Path, suffix: &str) -> PathBuf {
    let mut dest = OsString::from(source.as_os_str());
    dest.push(suffix);
    PathBuf::from(dest)
}
