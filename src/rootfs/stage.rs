//! Base image staging.

use anyhow::Context;
use std::fs;
use std::path::Path;

use crate::artifact::hekate;
use crate::error::{BuildError, Result};
use crate::fetch::{self, file_name_from_url, RetryPolicy};
use crate::host::{Host, Prompter};
use crate::resolve::{Packaging, ResolvedBuild};

/// What kind of artifact a mirror serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseImage {
    /// An xz-compressed raw disk image; `raw` is the decompressed name.
    DiskImage { archive: String, raw: String },
    /// A tarball of the root filesystem.
    RootfsArchive(String),
}

impl BaseImage {
    pub fn from_file_name(name: &str) -> Self {
        match name.strip_suffix(".xz") {
            Some(raw) if !raw.ends_with(".tar") => BaseImage::DiskImage {
                archive: name.to_string(),
                raw: raw.to_string(),
            },
            _ => BaseImage::RootfsArchive(name.to_string()),
        }
    }

    /// Name of the downloaded file.
    pub fn file_name(&self) -> &str {
        match self {
            BaseImage::DiskImage { archive, .. } => archive,
            BaseImage::RootfsArchive(name) => name,
        }
    }
}

/// Recreate `base_path` empty and make sure `download_dir` exists.
pub fn prepare_directories(base_path: &Path, download_dir: &Path) -> Result<()> {
    if base_path.exists() {
        fs::remove_dir_all(base_path)
            .with_context(|| format!("Failed to remove {}", base_path.display()))
            .map_err(BuildError::staging)?;
    }
    fs::create_dir_all(base_path)
        .with_context(|| format!("Failed to create {}", base_path.display()))
        .map_err(BuildError::staging)?;
    fs::create_dir_all(download_dir)
        .with_context(|| format!("Failed to create {}", download_dir.display()))
        .map_err(BuildError::staging)?;
    Ok(())
}

/// Stage the base image of `build` into its `base_path`.
pub fn stage(
    host: &dyn Host,
    prompter: &dyn Prompter,
    build: &ResolvedBuild,
    policy: &RetryPolicy,
) -> Result<()> {
    prepare_directories(&build.base_path, &build.download_dir)?;

    if build.skip_download {
        tracing::info!("[SKIP] download and extraction");
        return Ok(());
    }

    let url = fetch::resolve_download_url(
        host,
        prompter,
        &build.selection.distribution,
        &build.arch,
    )?;
    let name = file_name_from_url(&url)
        .ok_or_else(|| BuildError::Staging(format!("cannot derive a file name from {}", url)))?;
    let image = BaseImage::from_file_name(&name);

    let cached = build.download_dir.join(image.file_name());
    if cached.exists() && !build.force_download {
        tracing::info!(file = %cached.display(), "reusing cached download");
    } else {
        fetch::download(host, &url, &build.download_dir, policy)?;
    }

    if build.packaging == Packaging::Hekate {
        hekate::fetch_payload(host, &build.download_dir, policy, build.force_download)?;
    }

    unpack(host, &image, &build.download_dir, &build.base_path)
}

/// Materialize a downloaded base image as a tree under `base_path`.
fn unpack(host: &dyn Host, image: &BaseImage, download_dir: &Path, base_path: &Path) -> Result<()> {
    match image {
        BaseImage::RootfsArchive(name) => {
            tracing::info!(archive = %name, "extracting rootfs archive");
            host.extract_archive(&download_dir.join(name), base_path)
                .map_err(BuildError::staging)
        }
        BaseImage::DiskImage { archive, raw } => {
            tracing::info!(archive = %archive, "decompressing disk image");
            host.extract_archive(&download_dir.join(archive), download_dir)
                .map_err(BuildError::staging)?;

            let raw_path = download_dir.join(raw);
            host.convert_compressed_image_to_raw(&raw_path, base_path)
                .map_err(BuildError::staging)?;

            fs::remove_file(&raw_path)
                .with_context(|| format!("Failed to remove {}", raw_path.display()))
                .map_err(BuildError::staging)?;
            Ok(())
        }
    }
}
