//! Build command - the factory pipeline driver.
//!
//! A generic Linux build walks a fixed sequence of stages:
//!
//! ```text
//! Stage -> BinfmtEnable -> ChrootPrep -> PermissionWalk -> PreConfig
//!       -> InstallPackages -> PostConfig -> BuildImage -> (Hekate | Finalize)
//! ```
//!
//! The first failing stage aborts the run. Android names never enter this
//! sequence; they are handed to a container build instead.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::artifact::{self, hekate, PackagedImage};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::container;
use crate::error::{BuildError, Result};
use crate::fetch::RetryPolicy;
use crate::host::{Host, Prompter, StdinPrompter, SystemHost};
use crate::packages;
use crate::resolve::{self, BuildOptions, BuildRequest, Packaging, ResolvedBuild};
use crate::rootfs::{self, hooks};

/// Stages of a generic Linux build, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Stage,
    BinfmtEnable,
    ChrootPrep,
    PermissionWalk,
    PreConfig,
    InstallPackages,
    PostConfig,
    BuildImage,
    PackageHekate,
    FinalizeStandard,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Resolve => "resolve",
            Stage::Stage => "stage base image",
            Stage::BinfmtEnable => "enable binfmt",
            Stage::ChrootPrep => "prepare chroot",
            Stage::PermissionWalk => "normalize permissions",
            Stage::PreConfig => "pre-install hooks",
            Stage::InstallPackages => "install packages",
            Stage::PostConfig => "post-install hooks",
            Stage::BuildImage => "build image",
            Stage::PackageHekate => "package for hekate",
            Stage::FinalizeStandard => "finalize image",
        };
        f.write_str(label)
    }
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Linux(PackagedImage),
    Container { rom_name: String, output_dir: PathBuf },
}

/// Minutes past a minute, seconds below.
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs >= 60.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}s", secs)
    }
}

/// Run one stage, logging entry, duration and failure.
fn step<T>(stage: Stage, run: impl FnOnce() -> Result<T>) -> Result<T> {
    tracing::info!("==> {}", stage);
    let started = Instant::now();
    let result = run();
    let elapsed = format_elapsed(started.elapsed());
    match &result {
        Ok(_) => tracing::info!(stage = %stage, "done [{}]", elapsed),
        Err(e) => tracing::error!(stage = %stage, "{} [after {}]", e, elapsed),
    }
    result
}

/// Resolve `options` and run the matching pipeline.
pub fn factory(
    host: &dyn Host,
    prompter: &dyn Prompter,
    catalog: &Catalog,
    config: &Config,
    options: &BuildOptions,
) -> Result<BuildOutcome> {
    let request = step(Stage::Resolve, || {
        resolve::resolve_request(catalog, prompter, config, options)
    })?;

    match request {
        BuildRequest::Container(build) => {
            container::run_container_build(host, &build)?;
            Ok(BuildOutcome::Container {
                rom_name: build.rom_name,
                output_dir: build.host_dir,
            })
        }
        BuildRequest::Linux(build) => {
            build_linux(host, prompter, &build, &config.retry).map(BuildOutcome::Linux)
        }
    }
}

/// The generic rootfs pipeline.
pub fn build_linux(
    host: &dyn Host,
    prompter: &dyn Prompter,
    build: &ResolvedBuild,
    policy: &RetryPolicy,
) -> Result<PackagedImage> {
    let root = &build.base_path;
    tracing::info!(
        name = build.selection.name(),
        arch = %build.arch,
        path = %root.display(),
        "building"
    );

    step(Stage::Stage, || rootfs::stage(host, prompter, build, policy))?;

    step(Stage::BinfmtEnable, || {
        host.enable_foreign_arch_support()
            .map_err(BuildError::staging)
    })?;

    step(Stage::ChrootPrep, || {
        host.enter_chroot_prep(root).map_err(BuildError::staging)
    })?;

    step(Stage::PermissionWalk, || rootfs::normalize_permissions(root))?;

    step(Stage::PreConfig, || {
        hooks::apply_hooks(host, root, build.selection.pre_hooks())
    })?;

    step(Stage::InstallPackages, || packages::install_packages(host, build))?;

    step(Stage::PostConfig, || {
        hooks::apply_hooks(host, root, build.selection.post_hooks())
    })?;

    let image = step(Stage::BuildImage, || artifact::build_image(host, build))?;

    match build.packaging {
        Packaging::Hekate => step(Stage::PackageHekate, || hekate::package(host, build, &image)),
        Packaging::Standard => step(Stage::FinalizeStandard, || {
            artifact::finalize_standard(host, build, &image)
        }),
    }
}

/// Execute the build command against the real host.
pub fn cmd_build(config: &Config, options: &BuildOptions) -> Result<BuildOutcome> {
    let build_start = Instant::now();
    let catalog = Catalog::load(&config.catalog)?;
    let host = SystemHost::new().map_err(BuildError::staging)?;

    let outcome = factory(&host, &StdinPrompter, &catalog, config, options)?;

    match &outcome {
        BuildOutcome::Linux(packaged) => {
            println!("\nImage: {}", packaged.image.display());
            if let Some(archive) = &packaged.archive {
                println!("Hekate archive: {}", archive.display());
            }
        }
        BuildOutcome::Container {
            rom_name,
            output_dir,
        } => {
            println!("\n{} ROM written to {}", rom_name, output_dir.display());
        }
    }
    println!("Build complete in {}", format_elapsed(build_start.elapsed()));
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        assert_eq!(Stage::PermissionWalk.to_string(), "normalize permissions");
        assert_eq!(Stage::PackageHekate.to_string(), "package for hekate");
    }

    #[test]
    fn test_step_passes_errors_through() {
        let err = step(Stage::BuildImage, || -> Result<()> {
            Err(BuildError::ImageBuild("mkfs failed".into()))
        })
        .unwrap_err();
        assert!(matches!(err, BuildError::ImageBuild(_)));
    }

    #[test]
    fn test_step_returns_stage_value() {
        assert_eq!(step(Stage::Resolve, || Ok(7)).unwrap(), 7);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(4_200)), "4.2s");
        assert_eq!(format_elapsed(Duration::from_secs(59)), "59.0s");
        assert_eq!(format_elapsed(Duration::from_secs(90)), "1.5m");
    }
}
