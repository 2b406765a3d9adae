//! Configuration management for jet-factory.
//!
//! Reads configuration from a `.env` file and environment variables.
//! Environment variables take precedence over the `.env` file.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::RetryPolicy;

/// Default container image for Android (LineageOS) builds.
pub const DEFAULT_ANDROID_IMAGE: &str = "docker.io/pablozaiden/switchroot-android-build:1.0.4";

/// Default catalog file, relative to the working directory.
pub const DEFAULT_CATALOG: &str = "base.json";

/// Download cache directory name inside the work directory.
pub const DOWNLOAD_DIR_NAME: &str = "downloadedFiles";

/// jet-factory configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Distribution catalog (JSON)
    pub catalog: PathBuf,
    /// Root of all build trees (default: ~/linux)
    pub workdir: PathBuf,
    /// Host directory mounted into Android container builds
    pub android_dir: PathBuf,
    /// Container image for Android builds
    pub android_image: String,
    /// Download retry policy
    pub retry: RetryPolicy,
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    pub fn load() -> Self {
        // Missing .env is fine
        let _ = dotenvy::dotenv();
        Self::from_vars(std::env::vars().collect())
    }

    /// Build configuration from a variable map, applying defaults.
    pub fn from_vars(vars: HashMap<String, String>) -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));

        let catalog = vars
            .get("JET_FACTORY_CATALOG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG));

        let workdir = vars
            .get("JET_FACTORY_WORKDIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("linux"));

        let android_dir = vars
            .get("JET_FACTORY_ANDROID_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("android/lineage"));

        let android_image = vars
            .get("JET_FACTORY_ANDROID_IMAGE")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ANDROID_IMAGE.to_string());

        let mut retry = RetryPolicy::default();
        if let Some(attempts) = parse_var::<u32>(&vars, "JET_FACTORY_DOWNLOAD_ATTEMPTS") {
            retry.attempts = attempts.max(1);
        }
        if let Some(secs) = parse_var::<u64>(&vars, "JET_FACTORY_DOWNLOAD_DELAY_SECS") {
            retry.delay = Duration::from_secs(secs);
        }

        Self {
            catalog,
            workdir,
            android_dir,
            android_image,
            retry,
        }
    }

    /// Download cache shared by all builds.
    pub fn download_dir(&self) -> PathBuf {
        self.workdir.join(DOWNLOAD_DIR_NAME)
    }

    /// Staging tree for a distribution or variant.
    pub fn staging_dir(&self, name: &str) -> PathBuf {
        self.workdir.join(name)
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  JET_FACTORY_CATALOG: {}", self.catalog.display());
        println!("  JET_FACTORY_WORKDIR: {}", self.workdir.display());
        println!("  JET_FACTORY_ANDROID_DIR: {}", self.android_dir.display());
        println!("  JET_FACTORY_ANDROID_IMAGE: {}", self.android_image);
        println!(
            "  Download retry: {} attempts, {:?} apart",
            self.retry.attempts, self.retry.delay
        );
        if self.catalog.exists() {
            println!("  Catalog: FOUND");
        } else {
            println!("  Catalog: NOT FOUND");
        }
    }
}

fn parse_var<T: std::str::FromStr>(vars: &HashMap<String, String>, key: &str) -> Option<T> {
    let raw = vars.get(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("ignoring {}={:?}: not a number", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(HashMap::new());
        assert_eq!(config.catalog, PathBuf::from("base.json"));
        assert!(config.workdir.ends_with("linux"));
        assert!(config.android_dir.ends_with("android/lineage"));
        assert_eq!(config.android_image, DEFAULT_ANDROID_IMAGE);
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("JET_FACTORY_WORKDIR", "/srv/jet"),
            ("JET_FACTORY_DOWNLOAD_ATTEMPTS", "3"),
            ("JET_FACTORY_DOWNLOAD_DELAY_SECS", "0"),
        ]));
        assert_eq!(config.download_dir(), PathBuf::from("/srv/jet/downloadedFiles"));
        assert_eq!(config.staging_dir("arch"), PathBuf::from("/srv/jet/arch"));
        assert_eq!(config.retry.attempts, 3);
        assert!(config.retry.delay.is_zero());
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = Config::from_vars(vars(&[("JET_FACTORY_DOWNLOAD_ATTEMPTS", "lots")]));
        assert_eq!(config.retry.attempts, 5);
    }
}
