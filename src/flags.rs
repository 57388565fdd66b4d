//! SCons flag sets derived from the build context.
//!
//! Three argument lists feed the step sequence: flags for build-only steps,
//! flags for test-running steps, and the Subzero selector. All three are
//! assembled here once, as a pure function of the context, and never mutated
//! afterwards; steps only concatenate slices.

use crate::context::BuildContext;
use crate::context::Arch;

/// Immutable per-category SCons flags for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedFlags {
    /// Flags for steps that compile without running tests.
    pub build: Vec<String>,
    /// Flags for steps that run test suites.
    pub run: Vec<String>,
    /// Selector for the Subzero translator backend.
    pub subzero: Vec<String>,
}

impl ScopedFlags {
    pub fn for_context(ctx: &BuildContext) -> ScopedFlags {
        let mut build = vec!["do_not_run_tests=1".to_string()];
        let mut run: Vec<String> = Vec::new();

        // Trusted tests get coverage from the nacl-gcc bots; only the ARM
        // bots exercise them here because nothing else covers the ARM
        // trusted/untrusted toolchain combination.
        if ctx.arch != Arch::Arm {
            build.push("skip_trusted_tests=1".to_string());
            run.push("skip_trusted_tests=1".to_string());
        }

        if ctx.skip_run {
            run.push("do_not_run_tests=1".to_string());
            if ctx.arch == Arch::Arm {
                // Hardware testers run without QEMU; an empty force_emulator
                // also lets us build tests that don't work under emulation.
                build.push("force_emulator=".to_string());
                run.push("force_emulator=".to_string());
            }
        }

        if ctx.skip_build {
            run.push("naclsdk_validate=0".to_string());
            run.push("built_elsewhere=1".to_string());
        }

        ScopedFlags {
            build,
            run,
            subzero: vec!["use_sz=1".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Arch, BuildContext, Platform};

    fn ctx(arch: Arch) -> BuildContext {
        BuildContext::new(arch, Platform::Linux)
    }

    #[test]
    fn x86_skips_trusted_tests() {
        let flags = ScopedFlags::for_context(&ctx(Arch::X8664));
        assert!(flags.build.contains(&"skip_trusted_tests=1".to_string()));
        assert!(flags.run.contains(&"skip_trusted_tests=1".to_string()));
    }

    #[test]
    fn arm_keeps_trusted_tests() {
        let flags = ScopedFlags::for_context(&ctx(Arch::Arm));
        assert!(!flags.build.contains(&"skip_trusted_tests=1".to_string()));
        assert!(!flags.run.contains(&"skip_trusted_tests=1".to_string()));
    }

    #[test]
    fn skip_run_disables_test_execution() {
        let mut context = ctx(Arch::X8632);
        context.skip_run = true;
        let flags = ScopedFlags::for_context(&context);
        assert!(flags.run.contains(&"do_not_run_tests=1".to_string()));
        assert!(!flags.build.contains(&"force_emulator=".to_string()));
    }

    #[test]
    fn arm_skip_run_disables_emulator() {
        let mut context = ctx(Arch::Arm);
        context.skip_run = true;
        let flags = ScopedFlags::for_context(&context);
        assert!(flags.build.contains(&"force_emulator=".to_string()));
        assert!(flags.run.contains(&"force_emulator=".to_string()));
    }

    #[test]
    fn skip_build_marks_built_elsewhere() {
        let mut context = ctx(Arch::Arm);
        context.skip_build = true;
        let flags = ScopedFlags::for_context(&context);
        assert!(flags.run.contains(&"naclsdk_validate=0".to_string()));
        assert!(flags.run.contains(&"built_elsewhere=1".to_string()));
    }

    #[test]
    fn build_flags_never_run_tests() {
        for arch in Arch::ALL {
            let flags = ScopedFlags::for_context(&ctx(*arch));
            assert_eq!(flags.build[0], "do_not_run_tests=1");
            assert_eq!(flags.subzero, vec!["use_sz=1".to_string()]);
        }
    }
}
