//! Mirror template resolution.
//!
//! A template without `{VERSION}` is already the image URL. Otherwise the
//! parent directory listing is scraped for release versions, the chosen
//! version's directory is scraped for `*.raw.xz` images, and the two are
//! joined.

use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::{DistributionSpec, VERSION_PLACEHOLDER};
use crate::error::{BuildError, Result};
use crate::host::{Host, Prompter};

/// A trailing path segment of 1-3 digit dot-separated groups, e.g. `33/`, `15.2/`.
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)(?:^|[>\s"'])(\d{1,3}(?:\.\d{1,3})*)/"#).expect("valid version regex")
});

/// A file name ending in `.raw.xz`.
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z][A-Za-z0-9._+-]*\.raw\.xz)(?:[^A-Za-z0-9._+-]|$)")
        .expect("valid image regex")
});

/// Version candidates in order of first appearance.
pub fn extract_versions(body: &str) -> Vec<String> {
    unique_captures(&VERSION_RE, body)
}

/// Image file candidates in order of first appearance.
pub fn extract_images(body: &str) -> Vec<String> {
    unique_captures(&IMAGE_RE, body)
}

fn unique_captures(re: &Regex, body: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in re.captures_iter(body) {
        let value = &caps[1];
        if !found.iter().any(|f| f == value) {
            found.push(value.to_string());
        }
    }
    found
}

/// Resolve the download URL for `distro` on `arch`.
///
/// Templates are tried in catalog order; a discovery failure on one template
/// falls through to the next.
pub fn resolve_download_url(
    host: &dyn Host,
    prompter: &dyn Prompter,
    distro: &DistributionSpec,
    arch: &str,
) -> Result<String> {
    let templates = distro
        .mirrors(arch)
        .ok_or_else(|| BuildError::UnsupportedArchitecture {
            distro: distro.name.clone(),
            arch: arch.to_string(),
            supported: distro.supported_architectures(),
        })?;

    let mut last_err = None;
    for template in templates {
        match resolve_template(host, prompter, template) {
            Ok(url) => return Ok(url),
            Err(e @ BuildError::Discovery { .. }) => {
                tracing::warn!("{}", e);
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| BuildError::Discovery {
        url: distro.name.clone(),
        reason: format!("no mirror templates for {}", arch),
    }))
}

/// Resolve a single mirror template.
pub fn resolve_template(
    host: &dyn Host,
    prompter: &dyn Prompter,
    template: &str,
) -> Result<String> {
    let template = template.trim();
    let Some((parent, _)) = template.split_once(VERSION_PLACEHOLDER) else {
        return Ok(template.to_string());
    };

    let versions = extract_versions(&fetch(host, parent)?);
    if versions.is_empty() {
        return Err(BuildError::Discovery {
            url: parent.to_string(),
            reason: "no release versions in directory listing".to_string(),
        });
    }
    let version = prompter
        .select("Select a version: ", &versions)
        .map_err(BuildError::prompt)?;
    tracing::info!(version = %version, "selected release");

    let mut image_dir = template.replacen(VERSION_PLACEHOLDER, &version, 1);
    if !image_dir.ends_with('/') {
        image_dir.push('/');
    }

    let images = extract_images(&fetch(host, &image_dir)?);
    let image = match images.as_slice() {
        [] => {
            return Err(BuildError::Discovery {
                url: image_dir,
                reason: "no .raw.xz image in directory listing".to_string(),
            })
        }
        [only] => only.clone(),
        _ => prompter
            .select("Select an image file: ", &images)
            .map_err(BuildError::prompt)?,
    };

    Ok(format!("{}{}", image_dir, image.trim()))
}

fn fetch(host: &dyn Host, url: &str) -> Result<String> {
    tracing::debug!(url, "fetching directory listing");
    host.fetch_body(url).map_err(|e| BuildError::Discovery {
        url: url.to_string(),
        reason: format!("{:#}", e),
    })
}
