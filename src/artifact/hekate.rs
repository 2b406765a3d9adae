//! Hekate (switchroot) installable layout.
//!
//! Hekate installs Linux from a FAT32 SD card: the root image has to be split
//! into parts below 4 GiB under `switchroot/install/`, and the `bootloader`
//! and `switchroot` directories must sit at the card root.

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

use super::disk::PackagedImage;
use super::split::{self, FAT32_PART_SIZE};
use crate::error::{BuildError, Result};
use crate::fetch::{self, RetryPolicy};
use crate::host::Host;
use crate::resolve::ResolvedBuild;

pub const HEKATE_VERSION: &str = "5.2.0";
pub const NYX_VERSION: &str = "0.9.0";
pub const HEKATE_URL: &str =
    "https://github.com/CTCaer/hekate/releases/download/v5.2.0/hekate_ctcaer_5.2.0_Nyx_0.9.0.zip";
pub const HEKATE_ZIP: &str = "hekate_ctcaer_5.2.0_Nyx_0.9.0.zip";
pub const HEKATE_BIN: &str = "hekate_ctcaer_5.2.0.bin";

/// Where the payload lands inside the rootfs.
pub const REBOOT_PAYLOAD: &str = "lib/firmware/reboot_payload.bin";

/// Boot subdirectories moved to the tree root.
pub const BOOT_ASSET_DIRS: [&str; 2] = ["bootloader", "switchroot"];

/// Split parts destination, relative to the tree root.
pub const INSTALL_DIR: &str = "switchroot/install";

/// File name prefix of the split parts.
pub const PART_PREFIX: &str = "l4t";

/// Download and unpack the hekate release into `download_dir`.
pub fn fetch_payload(
    host: &dyn Host,
    download_dir: &Path,
    policy: &RetryPolicy,
    force: bool,
) -> Result<()> {
    let zip = download_dir.join(HEKATE_ZIP);
    if force || !zip.exists() {
        fetch::download(host, HEKATE_URL, download_dir, policy)?;
    }
    host.extract_archive(&zip, download_dir)
        .map_err(BuildError::staging)
}

/// Copy the hekate binary into the tree as the reboot payload.
pub fn install_reboot_payload(download_dir: &Path, base_path: &Path) -> Result<PathBuf> {
    let src = download_dir.join(HEKATE_BIN);
    let dest = base_path.join(REBOOT_PAYLOAD);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))
            .map_err(BuildError::image)?;
    }
    fs::copy(&src, &dest)
        .with_context(|| format!("Failed to copy {} (run without --skip to fetch it)", src.display()))
        .map_err(BuildError::image)?;
    Ok(dest)
}

/// Move `boot/bootloader` and `boot/switchroot` to the tree root.
pub fn relocate_boot_assets(base_path: &Path) -> Result<Vec<PathBuf>> {
    let mut moved = Vec::new();
    for dir in BOOT_ASSET_DIRS {
        let src = base_path.join("boot").join(dir);
        let dest = base_path.join(dir);
        if !src.is_dir() {
            return Err(BuildError::ImageBuild(format!(
                "{} is missing; the distribution must ship switchroot boot files",
                src.display()
            )));
        }
        if dest.exists() {
            fs::remove_dir_all(&dest)
                .with_context(|| format!("Failed to remove {}", dest.display()))
                .map_err(BuildError::image)?;
        }
        fs::rename(&src, &dest)
            .with_context(|| format!("Failed to move {} to {}", src.display(), dest.display()))
            .map_err(BuildError::image)?;
        moved.push(dest);
    }
    Ok(moved)
}

/// Finish a hekate build from the image produced by `disk::build_image`.
pub fn package(host: &dyn Host, build: &ResolvedBuild, image: &Path) -> Result<PackagedImage> {
    let base = &build.base_path;

    let image = host
        .materialize_image_to_disk(image, base)
        .map_err(BuildError::image)?;

    relocate_boot_assets(base)?;

    let parts = split::split_file(&image, &base.join(INSTALL_DIR), FAT32_PART_SIZE, PART_PREFIX)
        .map_err(BuildError::image)?;
    split::verify_parts(&image, &parts).map_err(BuildError::image)?;

    let archive = base.join(format!("{}.7z", build.selection.name()));
    let dirs: Vec<PathBuf> = BOOT_ASSET_DIRS.iter().map(|d| base.join(d)).collect();
    host.archive_directories(&dirs, &archive)
        .map_err(BuildError::image)?;

    tracing::info!(archive = %archive.display(), parts = parts.len(), "hekate package ready");
    Ok(PackagedImage {
        image,
        archive: Some(archive),
    })
}
