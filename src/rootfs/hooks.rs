//! Chroot configuration hooks.
//!
//! A hook line from the catalog is one external command: the first
//! whitespace-separated word is the program, the rest are its arguments.

use std::fmt;
use std::path::Path;

use crate::error::{BuildError, Result};
use crate::host::Host;

/// A single command run inside the staged tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    pub program: String,
    pub args: Vec<String>,
}

impl Hook {
    /// Parse a hook line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Run `hooks` in order inside the chroot at `root`; the first failure aborts.
pub fn apply_hooks<'a, I>(host: &dyn Host, root: &Path, hooks: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut ran = 0;
    for line in hooks {
        let Some(hook) = Hook::parse(line) else {
            tracing::warn!("skipping blank hook line");
            continue;
        };
        tracing::info!(hook = %hook, "running hook");
        host.run_in_chroot(root, &hook.argv())
            .map_err(|e| BuildError::HookExecution {
                hook: hook.to_string(),
                reason: format!("{:#}", e),
            })?;
        ran += 1;
    }
    Ok(ran)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_program_and_args() {
        let hook = Hook::parse("systemctl enable  sshd.service").unwrap();
        assert_eq!(hook.program, "systemctl");
        assert_eq!(hook.args, vec!["enable", "sshd.service"]);
        assert_eq!(hook.argv(), vec!["systemctl", "enable", "sshd.service"]);
        assert_eq!(hook.to_string(), "systemctl enable sshd.service");
    }

    #[test]
    fn test_parse_single_word() {
        let hook = Hook::parse("ldconfig").unwrap();
        assert!(hook.args.is_empty());
        assert_eq!(hook.argv(), vec!["ldconfig"]);
    }

    #[test]
    fn test_parse_blank() {
        assert_eq!(Hook::parse(""), None);
        assert_eq!(Hook::parse("   \t"), None);
    }
}
