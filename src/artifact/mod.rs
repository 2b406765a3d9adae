//! Artifact builders.
//!
//! - `disk`: filesystem image creation and standard packaging
//! - `hekate`: split + archived layout for hekate/switchroot SD cards
//! - `split`: fixed-size file splitting with checksum verification

pub mod disk;
pub mod hekate;
pub mod split;

pub use disk::{build_image, finalize_standard, PackagedImage, FS_TYPE};
pub use split::{split_file, FAT32_PART_SIZE};
