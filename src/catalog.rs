//! Distribution catalog.
//!
//! The catalog is a JSON array of distributions, each with its hooks, base
//! packages, per-architecture mirror templates and variants:
//!
//! ```json
//! [{
//!   "name": "fedora",
//!   "pre": ["dnf -y remove iscsi-initiator-utils"],
//!   "post": [],
//!   "packages": ["xorg-x11-server-Xorg"],
//!   "buildarch": { "aarch64": ["https://.../releases/{VERSION}/Server/aarch64/images/"] },
//!   "variants": [{ "name": "fedora-gnome", "pre": [], "post": [], "packages": ["gnome-shell"] }]
//! }]
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};

/// Placeholder substituted with a discovered release version.
pub const VERSION_PLACEHOLDER: &str = "{VERSION}";

/// A buildable distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionSpec {
    pub name: String,
    #[serde(default)]
    pub pre: Vec<String>,
    #[serde(default)]
    pub post: Vec<String>,
    #[serde(default)]
    pub packages: Vec<String>,
    /// Architecture -> mirror URL templates, tried in order.
    #[serde(rename = "buildarch", default)]
    pub architectures: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub variants: Vec<VariantSpec>,
    /// Keyring populated before the first install (pacman-based distributions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyring: Option<String>,
}

/// A named augmentation of a distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSpec {
    pub name: String,
    #[serde(default)]
    pub pre: Vec<String>,
    #[serde(default)]
    pub post: Vec<String>,
    #[serde(default)]
    pub packages: Vec<String>,
}

impl DistributionSpec {
    /// Mirror templates for `arch`, if the distribution supports it.
    pub fn mirrors(&self, arch: &str) -> Option<&[String]> {
        self.architectures.get(arch).map(Vec::as_slice)
    }

    pub fn supports(&self, arch: &str) -> bool {
        self.architectures.contains_key(arch)
    }

    /// Comma separated list of supported architectures.
    pub fn supported_architectures(&self) -> String {
        self.architectures
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Result of a catalog lookup.
#[derive(Debug, Clone, Copy)]
pub enum CatalogEntry<'a> {
    Distribution(&'a DistributionSpec),
    Variant {
        parent: &'a DistributionSpec,
        variant: &'a VariantSpec,
    },
}

/// In-memory catalog of distributions.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    distributions: Vec<DistributionSpec>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate names across distributions and variants.
    pub fn new(distributions: Vec<DistributionSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        for distro in &distributions {
            let names =
                std::iter::once(&distro.name).chain(distro.variants.iter().map(|v| &v.name));
            for name in names {
                if !seen.insert(name.as_str()) {
                    return Err(BuildError::CatalogLoad(format!(
                        "name '{}' is defined more than once",
                        name
                    )));
                }
            }
        }
        Ok(Self { distributions })
    }

    /// Parse a catalog from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let distributions: Vec<DistributionSpec> =
            serde_json::from_str(json).map_err(|e| BuildError::CatalogLoad(e.to_string()))?;
        Self::new(distributions)
    }

    /// Load a catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            BuildError::CatalogLoad(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn distributions(&self) -> &[DistributionSpec] {
        &self.distributions
    }

    /// Find a distribution or variant by exact name.
    ///
    /// Distributions are scanned first, then each distribution's variants.
    pub fn find(&self, name: &str) -> Option<CatalogEntry<'_>> {
        if let Some(distro) = self.distributions.iter().find(|d| d.name == name) {
            return Some(CatalogEntry::Distribution(distro));
        }
        self.distributions.iter().find_map(|parent| {
            parent
                .variants
                .iter()
                .find(|v| v.name == name)
                .map(|variant| CatalogEntry::Variant { parent, variant })
        })
    }

    /// Names offered for interactive selection: variants before their parent.
    pub fn selectable_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for distro in &self.distributions {
            names.extend(distro.variants.iter().map(|v| v.name.clone()));
            names.push(distro.name.clone());
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        {
            "name": "arch",
            "packages": ["xorg-server"],
            "buildarch": { "aarch64": ["http://os.archlinuxarm.org/os/ArchLinuxARM-aarch64-latest.tar.gz"] },
            "variants": [{ "name": "arch-kde", "packages": ["plasma"] }],
            "keyring": "archlinuxarm"
        },
        {
            "name": "leap",
            "buildarch": { "aarch64": ["http://example.org/leap.raw.xz"] }
        }
    ]"#;

    #[test]
    fn test_parse_defaults_missing_fields() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let leap = &catalog.distributions()[1];
        assert!(leap.pre.is_empty());
        assert!(leap.variants.is_empty());
        assert_eq!(leap.keyring, None);
        assert_eq!(catalog.distributions()[0].keyring.as_deref(), Some("archlinuxarm"));
    }

    #[test]
    fn test_find_distribution_before_variant() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        match catalog.find("arch") {
            Some(CatalogEntry::Distribution(d)) => assert_eq!(d.name, "arch"),
            other => panic!("unexpected lookup result: {:?}", other),
        }
        match catalog.find("arch-kde") {
            Some(CatalogEntry::Variant { parent, variant }) => {
                assert_eq!(parent.name, "arch");
                assert_eq!(variant.packages, vec!["plasma"]);
            }
            other => panic!("unexpected lookup result: {:?}", other),
        }
        assert!(catalog.find("gentoo").is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let json = r#"[
            { "name": "arch", "variants": [{ "name": "leap" }] },
            { "name": "leap" }
        ]"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, BuildError::CatalogLoad(_)));
    }

    #[test]
    fn test_selectable_names_lists_variants_first() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.selectable_names(), vec!["arch-kde", "arch", "leap"]);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Catalog::from_json("{ not json"),
            Err(BuildError::CatalogLoad(_))
        ));
    }
}
