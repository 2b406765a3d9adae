//! Splitting images into FAT32-sized parts.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Largest part written: just under the 4 GiB FAT32 file size limit.
pub const FAT32_PART_SIZE: u64 = 4_290_772_992;

/// Name of the `index`-th part, e.g. `l4t.00`.
pub fn part_name(prefix: &str, index: usize) -> String {
    format!("{}.{:02}", prefix, index)
}

/// Split `path` into `part_size`-byte parts named `<prefix>.NN` in `dest_dir`.
///
/// Returns the parts in order; concatenating them reproduces the input.
/// An empty input produces no parts.
pub fn split_file(path: &Path, dest_dir: &Path, part_size: u64, prefix: &str) -> Result<Vec<PathBuf>> {
    if part_size == 0 {
        bail!("part size must be greater than zero");
    }
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create {}", dest_dir.display()))?;

    let total = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
    );

    let mut parts = Vec::new();
    let mut written = 0u64;
    while written < total {
        let part = dest_dir.join(part_name(prefix, parts.len()));
        let mut writer = BufWriter::new(
            File::create(&part).with_context(|| format!("Failed to create {}", part.display()))?,
        );
        let copied = io::copy(&mut (&mut reader).take(part_size), &mut writer)
            .with_context(|| format!("Failed to write {}", part.display()))?;
        writer.flush()?;
        if copied == 0 {
            bail!("{} shrank while being split", path.display());
        }
        written += copied;
        parts.push(part);
    }

    tracing::info!(parts = parts.len(), source = %path.display(), "split image");
    Ok(parts)
}

/// SHA-256 of the concatenation of `paths`, hex encoded.
pub fn sha256_concat(paths: &[PathBuf]) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1024 * 1024];
    for path in paths {
        let mut file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Check that `parts` reassemble into exactly `original`.
pub fn verify_parts(original: &Path, parts: &[PathBuf]) -> Result<()> {
    let expected = sha256_concat(&[original.to_path_buf()])?;
    let actual = sha256_concat(parts)?;
    if expected != actual {
        bail!(
            "split parts of {} do not match the source (sha256 {} != {})",
            original.display(),
            actual,
            expected
        );
    }
    Ok(())
}
