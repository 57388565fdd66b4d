//! Build context: the resolved configuration one bot run operates under.
//!
//! The context is constructed once at startup from the command line and host
//! detection, then only read. Toolchain variants are not context state; the
//! plan builder receives them explicitly per sub-sequence.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Result};

/// Untrusted-code target architecture a bot builds and tests for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X8632,
    X8664,
    Arm,
    Mips32,
}

impl Arch {
    pub const ALL: &'static [Arch] = &[Arch::X8632, Arch::X8664, Arch::Arm, Arch::Mips32];

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X8632 => "x86-32",
            Arch::X8664 => "x86-64",
            Arch::Arm => "arm",
            Arch::Mips32 => "mips32",
        }
    }

    pub fn parse(value: &str) -> Result<Arch> {
        match value {
            "x86-32" => Ok(Arch::X8632),
            "x86-64" => Ok(Arch::X8664),
            "arm" => Ok(Arch::Arm),
            "mips32" => Ok(Arch::Mips32),
            other => bail!(
                "unsupported architecture '{}'; expected one of: {}",
                other,
                Arch::ALL
                    .iter()
                    .map(|a| a.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// Architectures the Subzero translator backend is built and tested for.
    pub fn has_subzero(&self) -> bool {
        matches!(self, Arch::Arm | Arch::X8632 | Arch::X8664)
    }
}

/// Host platform the bot process runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
    Mac,
}

impl Platform {
    /// Detect the host platform. Anything we have no bots for is rejected
    /// up front, before any step runs.
    pub fn detect() -> Result<Platform> {
        Platform::from_os_name(std::env::consts::OS)
    }

    pub(crate) fn from_os_name(os: &str) -> Result<Platform> {
        match os {
            "linux" => Ok(Platform::Linux),
            "windows" => Ok(Platform::Windows),
            "macos" => Ok(Platform::Mac),
            other => bail!("unsupported platform '{}'; this bot only runs on linux, windows, or macos", other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Windows => "windows",
            Platform::Mac => "mac",
        }
    }
}

/// Toolchain variant a sub-sequence of steps targets.
///
/// Passed explicitly into the plan builder; never stored as mutable mode
/// state on the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainVariant {
    Pnacl,
    NaclClang,
    Saigo,
}

impl ToolchainVariant {
    /// The SCons flag selecting this toolchain.
    pub fn scons_flag(&self) -> &'static str {
        match self {
            ToolchainVariant::Pnacl => "bitcode=1",
            ToolchainVariant::NaclClang => "nacl_clang=1",
            ToolchainVariant::Saigo => "saigo=1",
        }
    }
}

/// Resolved configuration for one bot run.
///
/// A run is one of three shapes:
/// - full local build-and-run (neither skip flag set),
/// - build-only on a fast host, packing output for a hardware tester
///   (`skip_run`),
/// - run-only on the tester, consuming that output (`skip_build`).
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub arch: Arch,
    pub platform: Platform,
    pub skip_build: bool,
    pub skip_run: bool,
    pub max_jobs: usize,
    /// Root of the NaCl checkout (where `scons.py` lives).
    pub checkout_root: PathBuf,
    /// Destination archive for build-only bots (`--pack-to`).
    pub pack_to: Option<PathBuf>,
    /// Source archive for run-only bots (`--restore-from`).
    pub restore_from: Option<PathBuf>,
    /// Environment overrides applied to every spawned command.
    pub env: BTreeMap<String, String>,
}

impl BuildContext {
    pub fn new(arch: Arch, platform: Platform) -> Self {
        BuildContext {
            arch,
            platform,
            skip_build: false,
            skip_run: false,
            max_jobs: default_max_jobs(),
            checkout_root: PathBuf::from("."),
            pack_to: None,
            restore_from: None,
            env: BTreeMap::new(),
        }
    }

    /// Parse a context from `run`/`plan` subcommand arguments.
    ///
    /// Returns the context plus the `--config` path if one was given.
    pub fn from_args(args: &[String], platform: Platform) -> Result<(Self, Option<PathBuf>)> {
        let mut arch = None;
        let mut ctx_args = ParsedArgs::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--skip-build" => ctx_args.skip_build = true,
                "--skip-run" => ctx_args.skip_run = true,
                "-j" | "--jobs" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("{} requires a value", arg))?;
                    let jobs: usize = value
                        .parse()
                        .map_err(|_| anyhow::anyhow!("invalid job count '{}'", value))?;
                    if jobs == 0 {
                        bail!("job count must be >= 1");
                    }
                    ctx_args.max_jobs = Some(jobs);
                }
                "--root" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("--root requires a directory"))?;
                    ctx_args.checkout_root = Some(PathBuf::from(value));
                }
                "--pack-to" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("--pack-to requires a file path"))?;
                    ctx_args.pack_to = Some(PathBuf::from(value));
                }
                "--restore-from" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("--restore-from requires a file path"))?;
                    ctx_args.restore_from = Some(PathBuf::from(value));
                }
                "--config" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                    ctx_args.config = Some(PathBuf::from(value));
                }
                other if other.starts_with('-') => {
                    bail!("unknown option '{}'", other);
                }
                positional => {
                    if arch.is_some() {
                        bail!("unexpected extra argument '{}'", positional);
                    }
                    arch = Some(Arch::parse(positional)?);
                }
            }
        }

        let arch = arch.ok_or_else(|| {
            anyhow::anyhow!(
                "missing architecture; expected one of: {}",
                Arch::ALL
                    .iter()
                    .map(|a| a.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;

        let mut ctx = BuildContext::new(arch, platform);
        ctx.skip_build = ctx_args.skip_build;
        ctx.skip_run = ctx_args.skip_run;
        if let Some(jobs) = ctx_args.max_jobs {
            ctx.max_jobs = jobs;
        }
        if let Some(root) = ctx_args.checkout_root {
            ctx.checkout_root = root;
        }
        ctx.pack_to = ctx_args.pack_to;
        ctx.restore_from = ctx_args.restore_from;

        Ok((ctx, ctx_args.config))
    }
}

#[derive(Default)]
struct ParsedArgs {
    skip_build: bool,
    skip_run: bool,
    max_jobs: Option<usize>,
    checkout_root: Option<PathBuf>,
    pack_to: Option<PathBuf>,
    restore_from: Option<PathBuf>,
    config: Option<PathBuf>,
}

/// Default job count for parallel SCons invocations.
///
/// ARM hardware testers (panda boards) only have 2 cores.
pub fn default_max_jobs() -> usize {
    if host_is_arm() {
        return 2;
    }
    num_cpus::get().max(1)
}

fn host_is_arm() -> bool {
    matches!(std::env::consts::ARCH, "arm" | "aarch64")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn arch_round_trips() {
        for arch in Arch::ALL {
            assert_eq!(Arch::parse(arch.as_str()).unwrap(), *arch);
        }
        assert!(Arch::parse("sparc").is_err());
    }

    #[test]
    fn subzero_excludes_mips() {
        assert!(Arch::Arm.has_subzero());
        assert!(Arch::X8632.has_subzero());
        assert!(Arch::X8664.has_subzero());
        assert!(!Arch::Mips32.has_subzero());
    }

    #[test]
    fn unsupported_platform_rejected() {
        assert!(Platform::from_os_name("freebsd").is_err());
        assert_eq!(Platform::from_os_name("linux").unwrap(), Platform::Linux);
        assert_eq!(Platform::from_os_name("macos").unwrap(), Platform::Mac);
    }

    #[test]
    fn from_args_parses_flags() {
        let (ctx, config) = BuildContext::from_args(
            &strings(&[
                "arm",
                "--skip-run",
                "-j",
                "8",
                "--root",
                "/nacl",
                "--pack-to",
                "out.tar.zst",
            ]),
            Platform::Linux,
        )
        .unwrap();
        assert_eq!(ctx.arch, Arch::Arm);
        assert!(ctx.skip_run);
        assert!(!ctx.skip_build);
        assert_eq!(ctx.max_jobs, 8);
        assert_eq!(ctx.checkout_root, PathBuf::from("/nacl"));
        assert_eq!(ctx.pack_to, Some(PathBuf::from("out.tar.zst")));
        assert!(config.is_none());
    }

    #[test]
    fn from_args_requires_arch() {
        let err = BuildContext::from_args(&strings(&["--skip-run"]), Platform::Linux)
            .unwrap_err()
            .to_string();
        assert!(err.contains("missing architecture"));
    }

    #[test]
    fn from_args_rejects_zero_jobs() {
        assert!(
            BuildContext::from_args(&strings(&["x86-64", "-j", "0"]), Platform::Linux).is_err()
        );
    }

    #[test]
    fn from_args_rejects_unknown_option() {
        assert!(
            BuildContext::from_args(&strings(&["x86-64", "--frobnicate"]), Platform::Linux)
                .is_err()
        );
    }
}
