use std::path::PathBuf;

use anyhow::{Result, ensure};
use clap::ValueEnum;

use crate::compress::{DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE};

pub const DEFAULT_ROOT_DIR: &str = "data";
pub const DEFAULT_SUFFIX: &str = ".gz";

/// What the walker does when a single file cannot be compressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ErrorPolicy {
    /// Stop at the first failure and return it.
    #[default]
    Abort,
    /// Log the failure, record it in the report and move on.
    Continue,
}

#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Appended to a file name to form its compressed counterpart.
    /// Files already ending in it are never compressed.
    pub suffix: String,
    pub block_size: usize,
    pub on_error: ErrorPolicy,
    /// Leave originals alone when their compressed counterpart already exists.
    pub skip_existing: bool,
    /// Suppress the per-file progress line.
    pub quiet: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_owned(),
            block_size: DEFAULT_BLOCK_SIZE,
            on_error: ErrorPolicy::default(),
            skip_existing: false,
            quiet: false,
        }
    }
}

impl WalkOptions {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.suffix.is_empty(), "suffix must not be empty");
        ensure!(self.block_size > 0, "block size must be greater than zero");
        ensure!(
            self.block_size <= MAX_BLOCK_SIZE,
            "block size must be at most {MAX_BLOCK_SIZE} bytes"
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub root_dir: PathBuf,
    pub options: WalkOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(DEFAULT_ROOT_DIR),
            options: WalkOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_scan_data_for_gz() {
        let config = Config::default();
        assert_eq!(config.root_dir, PathBuf::from("data"));
        assert_eq!(config.options.suffix, ".gz");
        assert_eq!(config.options.on_error, ErrorPolicy::Abort);
        assert!(!config.options.skip_existing);
        assert!(config.options.validate().is_ok());
    }

    #[test]
    fn empty_suffix_is_rejected() {
        let options = WalkOptions {
            suffix: String::new(),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let options = WalkOptions {
            block_size: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn block_size_above_limit_is_rejected() {
        for block_size in [MAX_BLOCK_SIZE + 1, usize::MAX] {
            let options = WalkOptions {
                block_size,
                ..Default::default()
            };
            assert!(options.validate().is_err());
        }
        let options = WalkOptions {
            block_size: MAX_BLOCK_SIZE,
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }
}
