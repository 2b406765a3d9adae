//! CLI command handlers.
//!
//! - `build` - Build a rootfs image or an Android ROM
//! - `list` - Print the distribution catalog
//! - `clean` - Remove staging trees and downloads
//! - `show` - Display configuration
//! - `preflight` - Check host tools before a build

pub mod build;
pub mod clean;
pub mod list;
pub mod preflight;
pub mod show;

pub use build::{cmd_build, factory, BuildOutcome, Stage};
pub use clean::{cmd_clean, CleanTarget};
pub use list::cmd_list;
pub use preflight::cmd_preflight;
pub use show::{cmd_show, ShowTarget};
