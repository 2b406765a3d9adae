//! Package installation inside the staged tree.
//!
//! The package manager is detected from the binaries present in
//! `<root>/usr/bin`, first match in [`PackageManager::PRIORITY`] wins.

use anyhow::Context;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{BuildError, Result};
use crate::host::Host;
use crate::resolve::ResolvedBuild;

/// Keyring populated for pacman trees whose catalog entry names none.
pub const DEFAULT_KEYRING: &str = "archlinuxarm";

/// Package managers the factory knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Zypper,
    Dnf,
    Yum,
    Pacman,
    Apt,
}

impl PackageManager {
    /// Detection order.
    pub const PRIORITY: [PackageManager; 5] = [
        PackageManager::Zypper,
        PackageManager::Dnf,
        PackageManager::Yum,
        PackageManager::Pacman,
        PackageManager::Apt,
    ];

    pub fn binary(self) -> &'static str {
        match self {
            PackageManager::Zypper => "zypper",
            PackageManager::Dnf => "dnf",
            PackageManager::Yum => "yum",
            PackageManager::Pacman => "pacman",
            PackageManager::Apt => "apt",
        }
    }

    /// `[binary, verb, assume-yes]`
    pub fn install_template(self) -> [&'static str; 3] {
        match self {
            PackageManager::Pacman => ["pacman", "-Syu", "--noconfirm"],
            other => [other.binary(), "install", "-y"],
        }
    }

    /// Full command line installing `package`.
    pub fn install_argv(self, package: &str) -> Vec<String> {
        self.install_template()
            .iter()
            .map(|s| s.to_string())
            .chain(std::iter::once(package.to_string()))
            .collect()
    }

    /// Every known manager present under `root`, in priority order.
    pub fn detect_all(root: &Path) -> Vec<PackageManager> {
        Self::PRIORITY
            .into_iter()
            .filter(|pm| root.join("usr/bin").join(pm.binary()).exists())
            .collect()
    }

    /// The manager used to install packages under `root`.
    pub fn detect(root: &Path) -> Result<PackageManager> {
        let found = Self::detect_all(root);
        match found.as_slice() {
            [] => Err(BuildError::NoPackageManager(root.display().to_string())),
            [only] => Ok(*only),
            [first, rest @ ..] => {
                tracing::warn!(
                    "multiple package managers found, using {} (also present: {})",
                    first,
                    rest.iter().map(|pm| pm.binary()).collect::<Vec<_>>().join(", ")
                );
                Ok(*first)
            }
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// Comment out active `CheckSpace` lines in `<root>/etc/pacman.conf`.
///
/// pacman's free-space check reads mount points, which are meaningless in a
/// chroot built on a loop image. Returns true when the file changed.
pub fn disable_check_space(root: &Path) -> Result<bool> {
    let conf = root.join("etc/pacman.conf");
    let install_err = |e: anyhow::Error| BuildError::PackageInstall {
        package: "pacman.conf".to_string(),
        reason: format!("{:#}", e),
    };

    let content = fs::read_to_string(&conf)
        .with_context(|| format!("Failed to read {}", conf.display()))
        .map_err(install_err)?;

    let mut changed = false;
    let patched: Vec<String> = content
        .lines()
        .map(|line| {
            if line.trim() == "CheckSpace" {
                changed = true;
                line.replacen("CheckSpace", "#CheckSpace", 1)
            } else {
                line.to_string()
            }
        })
        .collect();

    if changed {
        let mut out = patched.join("\n");
        if content.ends_with('\n') {
            out.push('\n');
        }
        fs::write(&conf, out)
            .with_context(|| format!("Failed to write {}", conf.display()))
            .map_err(install_err)?;
    }
    Ok(changed)
}

/// Initialize and populate the pacman keyring, then patch pacman.conf.
pub fn bootstrap_keyring(host: &dyn Host, root: &Path, keyring: &str) -> Result<()> {
    tracing::info!(keyring, "bootstrapping pacman keyring");
    let steps: [Vec<String>; 2] = [
        vec!["pacman-key".into(), "--init".into()],
        vec!["pacman-key".into(), "--populate".into(), keyring.into()],
    ];
    for argv in &steps {
        host.run_in_chroot(root, argv)
            .map_err(|e| BuildError::PackageInstall {
                package: format!("keyring {}", keyring),
                reason: format!("{:#}", e),
            })?;
    }
    disable_check_space(root)?;
    Ok(())
}

/// Install the selection's packages (variant first) one at a time.
pub fn install_packages(host: &dyn Host, build: &ResolvedBuild) -> Result<usize> {
    let root = &build.base_path;
    let manager = PackageManager::detect(root)?;
    tracing::info!(manager = %manager, "detected package manager");

    let keyring = build.selection.distribution.keyring.as_deref();
    if manager == PackageManager::Pacman {
        bootstrap_keyring(host, root, keyring.unwrap_or(DEFAULT_KEYRING))?;
    } else if let Some(keyring) = keyring {
        tracing::warn!(
            "keyring '{}' ignored: {} does not use pacman-key",
            keyring,
            manager
        );
    }

    if build.local_packages {
        tracing::warn!("--staging is reserved; local packages are not installed yet");
    }

    let mut installed = 0;
    for package in build.selection.packages() {
        tracing::info!(package = %package, "installing");
        host.run_in_chroot(root, &manager.install_argv(package))
            .map_err(|e| BuildError::PackageInstall {
                package: package.clone(),
                reason: format!("{:#}", e),
            })?;
        installed += 1;
    }
    Ok(installed)
}
