//! Gzip every file under a directory tree into a sibling `<name>.gz`,
//! leaving the originals in place.

use anyhow::Result;

pub mod compress;
pub mod config;
pub mod walk;

pub use compress::{CompressStats, compress_file};
pub use config::{Config, ErrorPolicy, WalkOptions};
pub use walk::{WalkReport, walk_and_compress};

pub fn run(config: &Config) -> Result<WalkReport> {
    walk_and_compress(&config.root_dir, &config.options)
}
