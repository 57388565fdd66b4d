//! Preflight checks before a bot run.
//!
//! Validates the host and the checkout before any step executes, so a
//! misconfigured bot fails with a direct message instead of a cryptic
//! mid-sequence error.

use std::path::Path;

use anyhow::{bail, Result};

use crate::config::BotConfig;
use crate::context::BuildContext;
use crate::plan::CHECKDEPS_SCRIPT;
use crate::scons::python_program;

/// Check if a command resolves on PATH (or is an explicit existing path).
pub fn command_exists(cmd: &str) -> bool {
    if which::which(cmd).is_ok() {
        return true;
    }
    Path::new(cmd).is_file()
}

/// Validate the host toolchain and the checkout layout.
pub fn check_run_prerequisites(ctx: &BuildContext, config: &BotConfig) -> Result<()> {
    let mut missing: Vec<String> = Vec::new();

    let python = python_program();
    if !command_exists(&python) {
        missing.push(format!("{} (python interpreter)", python));
    }

    let scons = ctx.checkout_root.join(&config.scons_script);
    if !scons.is_file() {
        missing.push(format!("{} (SCons entry point)", scons.display()));
    }

    let checkdeps = ctx.checkout_root.join(CHECKDEPS_SCRIPT);
    if !checkdeps.is_file() {
        missing.push(format!("{} (checkdeps script)", checkdeps.display()));
    }

    if !missing.is_empty() {
        let listing = missing
            .iter()
            .map(|item| format!("  {}", item))
            .collect::<Vec<_>>()
            .join("\n");
        bail!(
            "preflight failed; missing from host or checkout:\n{}\nIs '{}' a NaCl checkout root?",
            listing,
            ctx.checkout_root.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Arch, Platform};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn command_exists_finds_common_tools() {
        assert!(command_exists("ls"));
        assert!(!command_exists("definitely_not_a_real_command_12345"));
    }

    #[test]
    fn prerequisites_pass_on_a_plausible_checkout() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("scons.py"), b"# scons").unwrap();
        fs::create_dir_all(tmp.path().join("tools/checkdeps")).unwrap();
        fs::write(tmp.path().join(CHECKDEPS_SCRIPT), b"# checkdeps").unwrap();

        let mut ctx = BuildContext::new(Arch::X8664, Platform::Linux);
        ctx.checkout_root = tmp.path().to_path_buf();
        // Point the interpreter at something that certainly exists.
        std::env::set_var("PNACL_BOT_PYTHON", "/bin/sh");

        let result = check_run_prerequisites(&ctx, &BotConfig::default());
        std::env::remove_var("PNACL_BOT_PYTHON");
        result.unwrap();
    }

    #[test]
    fn prerequisites_name_whats_missing() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = BuildContext::new(Arch::X8664, Platform::Linux);
        ctx.checkout_root = tmp.path().to_path_buf();

        let err = check_run_prerequisites(&ctx, &BotConfig::default())
            .unwrap_err()
            .to_string();
        assert!(err.contains("scons.py"));
        assert!(err.contains("checkdeps"));
    }
}
