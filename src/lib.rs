//! jet-factory library.
//!
//! Builds root filesystem images for the Nintendo Switch (switchroot) from
//! upstream distribution releases, and delegates Android builds to a
//! container. Every external effect goes through the `host` traits so the
//! pipeline can be driven against a mock in tests.

pub mod artifact;
pub mod catalog;
pub mod clean;
pub mod commands;
pub mod config;
pub mod container;
pub mod error;
pub mod fetch;
pub mod host;
pub mod packages;
pub mod preflight;
pub mod process;
pub mod resolve;
pub mod rootfs;

pub use error::{BuildError, Result};
