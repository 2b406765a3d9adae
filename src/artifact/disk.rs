//! Filesystem image creation.

use std::path::{Path, PathBuf};

use super::hekate;
use crate::error::{BuildError, Result};
use crate::host::Host;
use crate::resolve::{Packaging, ResolvedBuild};

/// Filesystem of every produced image.
pub const FS_TYPE: &str = "ext4";

/// Final build outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedImage {
    pub image: PathBuf,
    /// Hekate archive, when packaging for hekate.
    pub archive: Option<PathBuf>,
}

/// Create `<base_path>/<name>.img` from the staged tree.
///
/// For hekate builds the reboot payload is installed into the tree first so
/// it ends up inside the image.
pub fn build_image(host: &dyn Host, build: &ResolvedBuild) -> Result<PathBuf> {
    let base = &build.base_path;
    if build.packaging == Packaging::Hekate {
        hekate::install_reboot_payload(&build.download_dir, base)?;
    }

    let name = build.selection.name();
    tracing::info!(name, fs = FS_TYPE, "creating filesystem image");
    host.create_disk_image(base, base, name, FS_TYPE)
        .map_err(BuildError::image)
}

/// Standard packaging: finalize the image in place.
pub fn finalize_standard(host: &dyn Host, build: &ResolvedBuild, image: &Path) -> Result<PackagedImage> {
    let image = host
        .materialize_image_to_disk(image, &build.base_path)
        .map_err(BuildError::image)?;
    Ok(PackagedImage {
        image,
        archive: None,
    })
}
