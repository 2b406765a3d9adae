//! Build environment checks (work directory, catalog, privileges, disk space).

use std::fs;
use std::path::Path;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::process::Cmd;

use super::types::CheckResult;

/// Free space below which a warning is raised.
const MIN_FREE_GB: u64 = 16;

/// Check build environment (directories, permissions, etc.).
pub fn check_build_environment(config: &Config) -> Vec<CheckResult> {
    let mut results = Vec::new();

    results.push(check_writable("work directory", &config.workdir));

    match Catalog::load(&config.catalog) {
        Ok(catalog) => results.push(CheckResult::pass_with(
            "catalog",
            &format!(
                "{} distribution(s), {} selectable name(s)",
                catalog.distributions().len(),
                catalog.selectable_names().len()
            ),
        )),
        Err(e) => results.push(CheckResult::fail("catalog", &e.to_string())),
    }

    results.push(check_root());

    if let Some(check) = check_disk_space(&config.workdir) {
        results.push(check);
    }

    results
}

/// Directory exists (or can be created) and accepts writes.
fn check_writable(name: &str, dir: &Path) -> CheckResult {
    if let Err(e) = fs::create_dir_all(dir) {
        return CheckResult::fail(name, &format!("Cannot create {}: {}", dir.display(), e));
    }
    let test_file = dir.join(".preflight-test");
    match fs::write(&test_file, "test") {
        Ok(_) => {
            let _ = fs::remove_file(&test_file);
            CheckResult::pass_with(name, &dir.display().to_string())
        }
        Err(e) => CheckResult::fail(name, &format!("Cannot write to {}: {}", dir.display(), e)),
    }
}

/// chroot, mount and losetup all need root.
fn check_root() -> CheckResult {
    match Cmd::new("id").arg("-u").allow_fail().run() {
        Ok(result) if result.success() && result.stdout_trimmed() == "0" => {
            CheckResult::pass("running as root")
        }
        Ok(_) => CheckResult::warn(
            "running as root",
            "Not root - chroot, mount and losetup will fail. Re-run with sudo.",
        ),
        Err(e) => CheckResult::warn("running as root", &format!("Could not check: {}", e)),
    }
}

// Use df command to avoid nix crate dependency
fn check_disk_space(dir: &Path) -> Option<CheckResult> {
    let result = Cmd::new("df")
        .args(["--output=avail", "-B1"])
        .arg_path(dir)
        .allow_fail()
        .run()
        .ok()?;
    if !result.success() {
        return None;
    }
    let avail_bytes: u64 = result.stdout.lines().nth(1)?.trim().parse().ok()?;
    let free_gb = avail_bytes / (1024 * 1024 * 1024);
    Some(if free_gb < MIN_FREE_GB {
        CheckResult::warn(
            "disk space",
            &format!("{}GB free - a desktop image needs ~{}GB", free_gb, MIN_FREE_GB),
        )
    } else {
        CheckResult::pass_with("disk space", &format!("{}GB free", free_gb))
    })
}
