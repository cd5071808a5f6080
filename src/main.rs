use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::Parser;
use gztree::{
    Config, ErrorPolicy, WalkOptions,
    compress::DEFAULT_BLOCK_SIZE,
    config::{DEFAULT_ROOT_DIR, DEFAULT_SUFFIX},
};

/// Gzip every file under a directory, keeping the originals.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Directory to scan
    #[arg(default_value = DEFAULT_ROOT_DIR)]
    root_dir: PathBuf,
    /// Suffix marking compressed files
    #[arg(short, long, default_value = DEFAULT_SUFFIX)]
    suffix: String,
    #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)] // 128 KiB
    block_size: usize,
    /// Stop at the first failing file or keep going
    #[arg(long, value_enum, default_value_t = ErrorPolicy::Abort)]
    on_error: ErrorPolicy,
    /// Don't recompress files whose compressed copy already exists
    #[arg(long)]
    skip_existing: bool,
    /// Don't print a line per file
    #[arg(short, long)]
    quiet: bool,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            root_dir: cli.root_dir,
            options: WalkOptions {
                suffix: cli.suffix,
                block_size: cli.block_size,
                on_error: cli.on_error,
                skip_existing: cli.skip_existing,
                quiet: cli.quiet,
            },
        }
    }
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let config = Config::from(Cli::parse());

    let report = gztree::run(&config)?;

    if report.is_success() {
        return Ok(ExitCode::SUCCESS);
    }
    for failure in &report.failures {
        eprintln!("{}: {:#}", failure.path.display(), failure.error);
    }
    eprintln!(
        "{} of {} files failed",
        report.failures.len(),
        report.failures.len() + report.compressed.len()
    );
    Ok(ExitCode::FAILURE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_match_config_defaults() {
        let config = Config::from(Cli::parse_from(["gztree"]));
        let defaults = Config::default();

        assert_eq!(config.root_dir, defaults.root_dir);
        assert_eq!(config.options.suffix, defaults.options.suffix);
        assert_eq!(config.options.block_size, defaults.options.block_size);
        assert_eq!(config.options.on_error, defaults.options.on_error);
    }

    #[test]
    fn cli_parses_all_options() {
        let config = Config::from(Cli::parse_from([
            "gztree",
            "assets",
            "--suffix",
            ".z",
            "--block-size",
            "4096",
            "--on-error",
            "continue",
            "--skip-existing",
            "-q",
        ]));

        assert_eq!(config.root_dir, PathBuf::from("assets"));
        assert_eq!(config.options.suffix, ".z");
        assert_eq!(config.options.block_size, 4096);
        assert_eq!(config.options.on_error, ErrorPolicy::Continue);
        assert!(config.options.skip_existing);
        assert!(config.options.quiet);
    }
}
