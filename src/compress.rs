use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, ensure};
use crc32fast::Hasher;
use gzip_header::{FileSystemType, GzBuilder};
use zlib_rs::{
    DeflateFlush, MAX_WBITS, ReturnCode,
    deflate::{self, DeflateConfig},
};

pub const DEFAULT_BLOCK_SIZE: usize = 128 * 1024; // 128 KiB
pub const MAX_BLOCK_SIZE: usize = 64 * 1024 * 1024; // 64 MiB

/// Byte counts for one compressed stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressStats {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub blocks: usize,
}

/// Compresses `source` into a gzip file at `dest`, overwriting `dest` if it exists.
///
/// The source is read in `block_size` chunks, so memory use does not depend on
/// the file size. A failure part-way through leaves whatever was written at
/// `dest` in place.
pub fn compress_file(source: &Path, dest: &Path, block_size: usize) -> Result<CompressStats> {
    let mut input = File::open(source)
        .with_context(|| format!("failed to open {} for reading", source.display()))?;
    let output = File::create(dest)
        .with_context(|| format!("failed to create {}", dest.display()))?;
    let mut writer = BufWriter::new(output);

    compress_stream(&mut input, &mut writer, block_size)
        .with_context(|| format!("failed to compress {}", source.display()))
}

/// Writes a single gzip member holding everything read from `reader`.
///
/// Each block is deflated on its own; all but the last end on a sync flush so
/// the concatenated blocks form one valid deflate stream.
pub fn compress_stream<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    block_size: usize,
) -> Result<CompressStats> {
    ensure!(block_size > 0, "block size must be greater than zero");
    ensure!(
        block_size <= MAX_BLOCK_SIZE,
        "block size must be at most {MAX_BLOCK_SIZE} bytes"
    );

    let header = GzBuilder::new().os(FileSystemType::Unknown).into_header();
    writer.write_all(&header).context("failed to write gzip header")?;

    let mut stats = CompressStats {
        bytes_out: header.len() as u64,
        ..Default::default()
    };
    let mut hasher = Hasher::new();
    let mut buffer = vec![0; deflate::compress_bound(block_size)];

    let mut block = read_block(reader, block_size)?;
    loop {
        // One block of read-ahead tells us whether `block` is the final one.
        let next = read_block(reader, block_size)?;
        let is_last = next.is_empty();

        let deflated = deflate_block(&mut buffer, &block, is_last)?;
        writer
            .write_all(deflated)
            .with_context(|| format!("failed to write block {}", stats.blocks))?;

        hasher.update(&block);
        stats.bytes_in += block.len() as u64;
        stats.bytes_out += deflated.len() as u64;
        stats.blocks += 1;

        if is_last {
            break;
        }
        block = next;
    }

    // ISIZE is the input length modulo 2^32.
    let crc = hasher.finalize();
    writer.write_all(&crc.to_le_bytes())?;
    writer.write_all(&(stats.bytes_in as u32).to_le_bytes())?;
    writer.flush()?;
    stats.bytes_out += 8;

    Ok(stats)
}

fn read_block<R: Read>(reader: &mut R, block_size: usize) -> Result<Vec<u8>> {
    let mut block = Vec::with_capacity(block_size);
    reader
        .by_ref()
        .take(block_size as u64)
        .read_to_end(&mut block)
        .context("failed to read input block")?;
    Ok(block)
}

fn deflate_block<'a>(output: &'a mut [u8], block: &[u8], is_last: bool) -> Result<&'a [u8]> {
    let config = DeflateConfig {
        // A negative `window_bits` generates raw deflate data with no zlib header or trailer.
        window_bits: -MAX_WBITS,
        ..Default::default()
    };

    let (flush, expected_err) = if is_last {
        (DeflateFlush::Finish, ReturnCode::Ok)
    } else {
        (DeflateFlush::SyncFlush, ReturnCode::DataError)
    };

    let (deflated, err) = deflate::compress_slice_with_flush(output, block, config, flush);
    ensure!(err == expected_err, "failed to deflate");

    Ok(deflated)
}
