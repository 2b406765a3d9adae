//! Preflight check results and the printed report.

use std::fmt;

/// Builds a check matters for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Scope {
    /// Every rootfs build.
    Rootfs,
    /// Builds whose target architecture differs from the host.
    ForeignArch,
    /// Container-delegated Android builds.
    Android,
}

impl Scope {
    const ALL: [Scope; 3] = [Scope::Rootfs, Scope::ForeignArch, Scope::Android];
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scope::Rootfs => "Rootfs builds",
            Scope::ForeignArch => "Foreign-architecture builds",
            Scope::Android => "Android builds",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    /// Builds in this check's scope will fail.
    Fail,
    /// Usable, but something may go wrong.
    Warn,
}

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
    pub scope: Scope,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, details: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            status,
            details: details.map(str::to_string),
            scope: Scope::Rootfs,
        }
    }

    pub fn pass(name: &str) -> Self {
        Self::new(name, CheckStatus::Pass, None)
    }

    pub fn pass_with(name: &str, details: &str) -> Self {
        Self::new(name, CheckStatus::Pass, Some(details))
    }

    pub fn fail(name: &str, details: &str) -> Self {
        Self::new(name, CheckStatus::Fail, Some(details))
    }

    pub fn warn(name: &str, details: &str) -> Self {
        Self::new(name, CheckStatus::Warn, Some(details))
    }

    /// Restrict this check to one kind of build.
    pub fn for_builds(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}

/// Results of all preflight checks.
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// No failed check, in any scope.
    pub fn all_passed(&self) -> bool {
        self.fail_count() == 0
    }

    /// True when nothing in `scope` failed.
    pub fn ready_for(&self, scope: Scope) -> bool {
        !self
            .checks
            .iter()
            .any(|c| c.scope == scope && c.status == CheckStatus::Fail)
    }

    pub fn fail_count(&self) -> usize {
        self.count(CheckStatus::Fail)
    }

    pub fn warn_count(&self) -> usize {
        self.count(CheckStatus::Warn)
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    /// Report text, grouped by scope.
    pub fn render(&self) -> String {
        let mut out = String::from("=== Preflight Check Results ===\n");

        for scope in Scope::ALL {
            let checks: Vec<&CheckResult> =
                self.checks.iter().filter(|c| c.scope == scope).collect();
            if checks.is_empty() {
                continue;
            }
            out.push_str(&format!("\n{}:\n", scope));
            for check in checks {
                let tag = match check.status {
                    CheckStatus::Pass => "PASS",
                    CheckStatus::Fail => "FAIL",
                    CheckStatus::Warn => "WARN",
                };
                out.push_str(&format!("  [{}] {}", tag, check.name));
                if let Some(details) = &check.details {
                    out.push_str(&format!(": {}", details));
                }
                out.push('\n');
            }
        }

        let passed = self.count(CheckStatus::Pass);
        out.push_str(&format!(
            "\nSummary: {}/{} passed\n",
            passed,
            self.checks.len()
        ));
        for scope in Scope::ALL {
            if !self.ready_for(scope) {
                out.push_str(&format!("         {} will not succeed\n", scope));
            }
        }
        if self.warn_count() > 0 {
            out.push_str(&format!("         {} warnings\n", self.warn_count()));
        }
        out
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("{}", self.render());
    }
}
