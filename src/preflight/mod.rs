//! Preflight checks for jet-factory builds.
//!
//! Validates host tools and the work environment before starting a build.
//! Run with `jet-factory preflight` to check everything is ready.

mod environment;
mod host_tools;
mod types;

use anyhow::{bail, Result};

use crate::config::Config;

pub use types::{CheckResult, CheckStatus, PreflightReport, Scope};

/// Run all preflight checks.
pub fn run_preflight(config: &Config) -> PreflightReport {
    let mut checks = Vec::new();

    println!("Running preflight checks...\n");

    println!("Checking host tools...");
    checks.extend(host_tools::check_host_tools());

    println!("Checking build environment...");
    checks.extend(environment::check_build_environment(config));

    println!();

    PreflightReport { checks }
}

/// Run preflight and bail if rootfs builds cannot succeed.
///
/// Failures scoped to Android or foreign-architecture builds are reported
/// but do not stop a plain rootfs build.
pub fn run_preflight_or_fail(config: &Config) -> Result<()> {
    let report = run_preflight(config);
    report.print();

    if !report.ready_for(Scope::Rootfs) {
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before building.",
            report.fail_count()
        );
    }

    println!("Host is ready for rootfs builds.\n");
    Ok(())
}
