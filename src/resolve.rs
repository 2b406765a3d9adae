//! Distribution resolution.
//!
//! Turns the requested name and CLI flags into a [`BuildRequest`]: either a
//! generic Linux rootfs build against the catalog, or an Android build that
//! is delegated wholesale to a container.

use std::path::PathBuf;

use crate::catalog::{Catalog, CatalogEntry, DistributionSpec, VariantSpec};
use crate::config::Config;
use crate::error::{BuildError, Result};
use crate::host::Prompter;

/// Packaging ROM type passed to Android container builds.
pub const ROM_TYPE: &str = "zip";

/// Canonical form of a requested name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Canonical {
    /// Look the name up in the catalog.
    Catalog(String),
    /// Build this Android device ROM in a container.
    Android(String),
}

/// Apply the fixed alias table.
pub fn canonicalize(name: &str) -> Canonical {
    match name {
        "opensuse" => Canonical::Catalog("leap".to_string()),
        "lineage" => Canonical::Android("icosa".to_string()),
        "icosa" | "foster" | "foster_tab" => Canonical::Android(name.to_string()),
        other => Canonical::Catalog(other.to_string()),
    }
}

/// A distribution, optionally narrowed to one of its variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub distribution: DistributionSpec,
    pub variant: Option<VariantSpec>,
}

impl Selection {
    pub fn is_variant(&self) -> bool {
        self.variant.is_some()
    }

    /// Name of what was selected (variant name when present).
    pub fn name(&self) -> &str {
        self.variant
            .as_ref()
            .map_or(self.distribution.name.as_str(), |v| v.name.as_str())
    }

    /// Pre hooks, variant first.
    pub fn pre_hooks(&self) -> impl Iterator<Item = &String> {
        let variant = self.variant.iter().flat_map(|v| v.pre.iter());
        variant.chain(self.distribution.pre.iter())
    }

    /// Post hooks, variant first.
    pub fn post_hooks(&self) -> impl Iterator<Item = &String> {
        let variant = self.variant.iter().flat_map(|v| v.post.iter());
        variant.chain(self.distribution.post.iter())
    }

    /// Packages to install, variant first.
    pub fn packages(&self) -> impl Iterator<Item = &String> {
        let variant = self.variant.iter().flat_map(|v| v.packages.iter());
        variant.chain(self.distribution.packages.iter())
    }
}

/// Look `name` up in the catalog.
pub fn lookup(catalog: &Catalog, name: &str) -> Result<Selection> {
    match catalog.find(name) {
        Some(CatalogEntry::Distribution(distro)) => Ok(Selection {
            distribution: distro.clone(),
            variant: None,
        }),
        Some(CatalogEntry::Variant { parent, variant }) => Ok(Selection {
            distribution: parent.clone(),
            variant: Some(variant.clone()),
        }),
        None => Err(BuildError::CatalogLookup(name.to_string())),
    }
}

/// Fail unless the selected distribution has mirrors for `arch`.
pub fn validate_architecture(selection: &Selection, arch: &str) -> Result<()> {
    let distro = &selection.distribution;
    if distro.supports(arch) {
        Ok(())
    } else {
        Err(BuildError::UnsupportedArchitecture {
            distro: selection.name().to_string(),
            arch: arch.to_string(),
            supported: distro.supported_architectures(),
        })
    }
}

/// Resolve a requested name, prompting when it is empty.
pub fn resolve(catalog: &Catalog, prompter: &dyn Prompter, name: &str) -> Result<Canonical> {
    let name = if name.is_empty() {
        prompter
            .select("Select a distribution: ", &catalog.selectable_names())
            .map_err(BuildError::prompt)?
    } else {
        name.to_string()
    };
    Ok(canonicalize(&name))
}

/// Output layout of the constrained-storage target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packaging {
    /// A single filesystem image.
    Standard,
    /// Split image + bootloader assets, archived for a FAT32 SD card.
    Hekate,
}

/// Flags controlling a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub distro: String,
    pub arch: String,
    pub hekate: bool,
    /// Reserved for installing locally built packages.
    pub staging: bool,
    pub skip: bool,
    pub force: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            distro: String::new(),
            arch: "aarch64".to_string(),
            hekate: false,
            staging: false,
            skip: false,
            force: false,
        }
    }
}

/// Everything a generic Linux build needs, fixed after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBuild {
    pub selection: Selection,
    pub arch: String,
    /// Staging tree, recreated at the start of the build.
    pub base_path: PathBuf,
    /// Download cache, kept across builds.
    pub download_dir: PathBuf,
    pub packaging: Packaging,
    pub skip_download: bool,
    pub force_download: bool,
    pub local_packages: bool,
}

/// Android ROM build run entirely inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerBuild {
    pub rom_name: String,
    pub rom_type: String,
    pub host_dir: PathBuf,
    pub image: String,
    pub use_cache: bool,
}

impl ContainerBuild {
    /// Environment handed to the build container.
    pub fn env(&self) -> Vec<String> {
        vec![
            format!("ROM_NAME={}", self.rom_name),
            format!("ROM_TYPE={}", self.rom_type),
        ]
    }
}

/// The two disjoint build pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildRequest {
    Linux(ResolvedBuild),
    Container(ContainerBuild),
}

/// Resolve CLI options into a build request.
pub fn resolve_request(
    catalog: &Catalog,
    prompter: &dyn Prompter,
    config: &Config,
    options: &BuildOptions,
) -> Result<BuildRequest> {
    match resolve(catalog, prompter, &options.distro)? {
        Canonical::Android(rom_name) => Ok(BuildRequest::Container(ContainerBuild {
            rom_name,
            rom_type: ROM_TYPE.to_string(),
            host_dir: config.android_dir.clone(),
            image: config.android_image.clone(),
            use_cache: false,
        })),
        Canonical::Catalog(name) => {
            let selection = lookup(catalog, &name)?;
            validate_architecture(&selection, &options.arch)?;
            let base_path = config.staging_dir(selection.name());
            Ok(BuildRequest::Linux(ResolvedBuild {
                selection,
                arch: options.arch.clone(),
                base_path,
                download_dir: config.download_dir(),
                packaging: if options.hekate {
                    Packaging::Hekate
                } else {
                    Packaging::Standard
                },
                skip_download: options.skip,
                force_download: options.force,
                local_packages: options.staging,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_table() {
        assert_eq!(canonicalize("opensuse"), Canonical::Catalog("leap".into()));
        assert_eq!(canonicalize("lineage"), Canonical::Android("icosa".into()));
        assert_eq!(canonicalize("foster_tab"), Canonical::Android("foster_tab".into()));
        assert_eq!(canonicalize("fedora"), Canonical::Catalog("fedora".into()));
    }

    #[test]
    fn test_selection_order_variant_first() {
        let selection = Selection {
            distribution: DistributionSpec {
                name: "arch".into(),
                pre: vec!["parent-pre".into()],
                post: vec!["parent-post".into()],
                packages: vec!["base".into()],
                architectures: Default::default(),
                variants: vec![],
                keyring: None,
            },
            variant: Some(VariantSpec {
                name: "arch-kde".into(),
                pre: vec!["variant-pre".into()],
                post: vec![],
                packages: vec!["plasma".into()],
            }),
        };
        assert_eq!(selection.name(), "arch-kde");
        assert_eq!(
            selection.pre_hooks().collect::<Vec<_>>(),
            vec!["variant-pre", "parent-pre"]
        );
        assert_eq!(selection.post_hooks().collect::<Vec<_>>(), vec!["parent-post"]);
        assert_eq!(selection.packages().collect::<Vec<_>>(), vec!["plasma", "base"]);
    }

    #[test]
    fn test_container_env() {
        let build = ContainerBuild {
            rom_name: "icosa".into(),
            rom_type: ROM_TYPE.into(),
            host_dir: PathBuf::from("/root/android/lineage"),
            image: "img".into(),
            use_cache: false,
        };
        assert_eq!(build.env(), vec!["ROM_NAME=icosa", "ROM_TYPE=zip"]);
    }
}
