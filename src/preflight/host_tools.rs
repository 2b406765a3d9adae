//! Host tool availability checks.

use crate::process;

use super::types::{CheckResult, Scope};

/// Tools every Linux build shells out to: (binary, package, purpose).
const REQUIRED_TOOLS: [(&str, &str, &str); 10] = [
    ("arch-chroot", "arch-install-scripts", "Runs hooks and package installs inside the tree"),
    ("mkfs.ext4", "e2fsprogs", "Creates the root filesystem image"),
    ("e2fsck", "e2fsprogs", "Checks the image before shrinking"),
    ("resize2fs", "e2fsprogs", "Shrinks the image to its minimum size"),
    ("losetup", "util-linux", "Attaches .raw.xz base images"),
    ("mount", "util-linux", "Mounts base image partitions"),
    ("tar", "tar", "Unpacks rootfs tarballs"),
    ("unxz", "xz", "Decompresses .raw.xz base images"),
    ("unzip", "unzip", "Unpacks the hekate release"),
    ("7z", "p7zip", "Archives hekate installs"),
];

/// Check host tools are installed.
pub fn check_host_tools() -> Vec<CheckResult> {
    let mut results = Vec::new();

    for (tool, package, purpose) in REQUIRED_TOOLS {
        results.push(check_tool_exists(tool, package, purpose, true));
    }

    // Only needed when the target architecture differs from the host
    results.push(
        check_tool_exists(
            "update-binfmts",
            "binfmt-support",
            "Required to build foreign-architecture trees",
            false,
        )
        .for_builds(Scope::ForeignArch),
    );

    // Android builds need one container runtime
    results.push(check_container_runtime());

    results
}

fn check_container_runtime() -> CheckResult {
    let found = ["docker", "podman"]
        .iter()
        .find_map(|rt| process::which(rt));
    let check = match found {
        Some(path) => CheckResult::pass_with("container runtime", &path.display().to_string()),
        None => CheckResult::fail("container runtime", "Neither docker nor podman found."),
    };
    check.for_builds(Scope::Android)
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &str, package: &str, purpose: &str, required: bool) -> CheckResult {
    match process::which(tool) {
        Some(path) => CheckResult::pass_with(tool, &path.display().to_string()),
        None => {
            let msg = format!("Not found. Install '{}' package. {}", package, purpose);
            if required {
                CheckResult::fail(tool, &msg)
            } else {
                CheckResult::warn(tool, &msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preflight::CheckStatus;

    #[test]
    fn test_missing_tool_severity() {
        let required = check_tool_exists("jet-factory-no-such-tool", "none", "", true);
        assert_eq!(required.status, CheckStatus::Fail);
        let optional = check_tool_exists("jet-factory-no-such-tool", "none", "", false);
        assert_eq!(optional.status, CheckStatus::Warn);
        assert!(optional.details.unwrap().contains("'none'"));
    }

    #[test]
    fn test_optional_tools_scoped() {
        let results = check_host_tools();
        let binfmt = results.iter().find(|r| r.name == "update-binfmts").unwrap();
        assert_eq!(binfmt.scope, Scope::ForeignArch);
        let runtime = results.iter().find(|r| r.name == "container runtime").unwrap();
        assert_eq!(runtime.scope, Scope::Android);
        assert!(results
            .iter()
            .filter(|r| REQUIRED_TOOLS.iter().any(|(t, _, _)| *t == r.name))
            .all(|r| r.scope == Scope::Rootfs));
    }

    #[test]
    fn test_every_required_tool_checked() {
        let results = check_host_tools();
        for (tool, _, _) in REQUIRED_TOOLS {
            assert!(results.iter().any(|r| r.name == tool));
        }
    }
}
