//! Rootfs staging.
//!
//! Produces a chroot-able tree from a distribution's base image:
//!
//! - **stage**: recreate directories, download and unpack the base image
//! - **hooks**: run pre/post configuration commands inside the chroot
//! - **permissions**: normalize file modes outside `dev`, `proc` and `sys`

pub mod hooks;
pub mod permissions;
pub mod stage;

pub use hooks::{apply_hooks, Hook};
pub use permissions::normalize_permissions;
pub use stage::{prepare_directories, stage, BaseImage};
