//! Error taxonomy for the build pipeline.
//!
//! Every stage failure maps to exactly one variant, and every variant maps to
//! a distinct process exit code so scripts driving `jet-factory` can tell a
//! bad distro name from a flaky mirror.

use thiserror::Error;

/// Result type alias using the pipeline error.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that abort a build.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Requested name is neither a distribution nor a variant in the catalog.
    #[error("unknown distribution or variant '{0}' (run `jet-factory list`)")]
    CatalogLookup(String),

    /// Distribution has no mirror for the requested architecture.
    #[error("{distro} is not available for {arch} (supported: {supported})")]
    UnsupportedArchitecture {
        distro: String,
        arch: String,
        supported: String,
    },

    /// Nothing matched while scraping a mirror listing.
    #[error("discovery failed for {url}: {reason}")]
    Discovery { url: String, reason: String },

    /// Download failed after every attempt.
    #[error("download of {url} failed after {attempts} attempt(s): {reason}")]
    Download {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// URL rejected before any transfer was attempted.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// No known package manager binary inside the staged tree.
    #[error("no supported package manager found under {0}")]
    NoPackageManager(String),

    /// A pre/post hook exited unsuccessfully.
    #[error("hook `{hook}` failed: {reason}")]
    HookExecution { hook: String, reason: String },

    /// Installing a package (or bootstrapping the manager) failed.
    #[error("failed to install {package}: {reason}")]
    PackageInstall { package: String, reason: String },

    /// Disk image creation, splitting or archiving failed.
    #[error("image build failed: {0}")]
    ImageBuild(String),

    /// Catalog file missing or malformed.
    #[error("failed to load catalog: {0}")]
    CatalogLoad(String),

    /// Preparing directories or the base image failed.
    #[error("staging failed: {0}")]
    Staging(String),

    /// Interactive selection was aborted or invalid.
    #[error("selection failed: {0}")]
    Prompt(String),

    /// The delegated container build failed.
    #[error("container build failed: {0}")]
    Container(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Process exit code for this failure category.
    pub fn exit_code(&self) -> u8 {
        match self {
            BuildError::CatalogLookup(_) => 2,
            BuildError::UnsupportedArchitecture { .. } => 3,
            BuildError::Discovery { .. } => 4,
            BuildError::Download { .. } => 5,
            BuildError::InvalidUrl { .. } => 5,
            BuildError::NoPackageManager(_) => 6,
            BuildError::HookExecution { .. } => 7,
            BuildError::PackageInstall { .. } => 8,
            BuildError::ImageBuild(_) => 9,
            BuildError::Staging(_) => 10,
            BuildError::Io(_) => 10,
            BuildError::CatalogLoad(_) => 11,
            BuildError::Prompt(_) => 12,
            BuildError::Container(_) => 13,
        }
    }

    pub(crate) fn staging(e: anyhow::Error) -> Self {
        BuildError::Staging(format!("{:#}", e))
    }

    pub(crate) fn image(e: anyhow::Error) -> Self {
        BuildError::ImageBuild(format!("{:#}", e))
    }

    pub(crate) fn prompt(e: anyhow::Error) -> Self {
        BuildError::Prompt(format!("{:#}", e))
    }
}
