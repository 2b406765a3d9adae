//! Work directory cleaning.

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::config::{Config, DOWNLOAD_DIR_NAME};

/// Remove the shared download cache.
pub fn clean_downloads(config: &Config) -> Result<()> {
    let downloads_dir = config.download_dir();

    if downloads_dir.exists() {
        println!("Removing {}...", downloads_dir.display());
        fs::remove_dir_all(&downloads_dir)?;
        println!("Downloads cleaned.");
    } else {
        println!("No downloads to clean.");
    }

    Ok(())
}

/// Suffix of an image still being written.
const PARTIAL_IMAGE_SUFFIX: &str = ".img.partial";

/// Remove every staging tree and leftover partial image, keeping the download cache.
pub fn clean_staging(config: &Config) -> Result<usize> {
    let workdir = &config.workdir;
    if !workdir.exists() {
        println!("No staging trees to clean.");
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(workdir)? {
        let entry = entry?;
        if entry.file_name() == DOWNLOAD_DIR_NAME {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            // Staging trees and abandoned .mnt mountpoints
            remove_tree(&path)?;
        } else if entry
            .file_name()
            .to_string_lossy()
            .ends_with(PARTIAL_IMAGE_SUFFIX)
        {
            println!("Removing {}...", path.display());
            fs::remove_file(&path)?;
        } else {
            continue;
        }
        removed += 1;
    }

    if removed > 0 {
        println!("Removed {} staging entries (downloads preserved).", removed);
    } else {
        println!("No staging trees to clean.");
    }
    Ok(removed)
}

/// Clean everything (staging trees + downloads).
pub fn clean_all(config: &Config) -> Result<()> {
    clean_staging(config)?;
    clean_downloads(config)?;
    println!("\nFull clean complete.");
    Ok(())
}

fn remove_tree(path: &Path) -> Result<()> {
    println!("Removing {}...", path.display());
    fs::remove_dir_all(path)?;
    Ok(())
}
