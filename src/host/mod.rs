//! Host collaborators used by the build pipeline.
//!
//! The pipeline never touches the network, loop devices or chroots directly;
//! it goes through [`Host`] and [`Prompter`]. [`SystemHost`] and
//! [`StdinPrompter`] are the real implementations, tests substitute
//! recording fakes.

mod prompt;
mod system;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use prompt::StdinPrompter;
pub use system::SystemHost;

/// An isolated container build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRun {
    pub image: String,
    /// Command passed to the container; empty runs the image entrypoint.
    pub argv: Vec<String>,
    /// `KEY=VALUE` pairs.
    pub env: Vec<String>,
    /// Host directory -> container path bind mounts.
    pub volumes: Vec<(PathBuf, String)>,
    /// Reuse a locally cached image instead of pulling.
    pub use_cache: bool,
}

/// External operations the pipeline orchestrates.
pub trait Host {
    /// Raw body of a URL (mirror directory listings).
    fn fetch_body(&self, url: &str) -> Result<String>;

    /// Download `url` into `dest_dir`, returning the written file.
    fn download_to_file(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;

    /// Extract or decompress `archive` into `dest_dir`.
    fn extract_archive(&self, archive: &Path, dest_dir: &Path) -> Result<()>;

    /// Pack `paths` into a single archive at `output`.
    fn archive_directories(&self, paths: &[PathBuf], output: &Path) -> Result<()>;

    /// Copy the root filesystem held in a raw disk image into `dest_dir`.
    fn convert_compressed_image_to_raw(&self, image: &Path, dest_dir: &Path) -> Result<PathBuf>;

    /// Run `argv` inside a chroot rooted at `root`, blocking until it exits.
    fn run_in_chroot(&self, root: &Path, argv: &[String]) -> Result<()>;

    /// Run an isolated container build, blocking until it exits.
    fn run_container(&self, run: &ContainerRun) -> Result<()>;

    /// Register foreign binary formats so target binaries run on this host.
    fn enable_foreign_arch_support(&self) -> Result<()>;

    /// Prepare `root` for chroot entry.
    fn enter_chroot_prep(&self, root: &Path) -> Result<()>;

    /// Build a `<name>.img` filesystem image of `src_dir` inside `dest_dir`.
    fn create_disk_image(
        &self,
        src_dir: &Path,
        dest_dir: &Path,
        name: &str,
        fs_type: &str,
    ) -> Result<PathBuf>;

    /// Finalize an image file into `dest_dir`, ready for distribution.
    fn materialize_image_to_disk(&self, image: &Path, dest_dir: &Path) -> Result<PathBuf>;
}

/// Interactive single choice.
pub trait Prompter {
    fn select(&self, prompt: &str, options: &[String]) -> Result<String>;
}
