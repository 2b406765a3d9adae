//! Clean command - removes staging trees and downloads.

use anyhow::Result;

use crate::clean;
use crate::config::Config;

/// Clean target for the clean command.
pub enum CleanTarget {
    /// Staging trees only (default)
    Staging,
    /// Download cache
    Downloads,
    /// Everything
    All,
}

/// Execute the clean command.
pub fn cmd_clean(config: &Config, target: CleanTarget) -> Result<()> {
    match target {
        CleanTarget::Staging => {
            clean::clean_staging(config)?;
        }
        CleanTarget::Downloads => {
            clean::clean_downloads(config)?;
        }
        CleanTarget::All => {
            clean::clean_all(config)?;
        }
    }
    Ok(())
}
