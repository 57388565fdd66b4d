//! Step plan construction.
//!
//! `build_plan` turns a build context into the ordered, conditionally
//! included sequence of named steps for one bot run. Construction is a pure
//! function of the context: no filesystem access, no subprocesses. Each
//! toolchain-variant sub-sequence receives its variant explicitly, so the
//! flags in effect for any step are unambiguous from the plan alone.
//!
//! Failure policy is part of the plan: build, clobber, checkdeps, and
//! artifact steps halt the run when they fail (a broken build makes all
//! downstream results meaningless); test-suite steps never halt (one failing
//! suite must not block independent suites). The two variant warm-up builds
//! (`build_nacl_clang`, `build_saigo`) are the deliberate exception and do
//! not halt.

use std::path::PathBuf;

use crate::config::BotConfig;
use crate::context::{Arch, BuildContext, Platform, ToolchainVariant};
use crate::flags::ScopedFlags;
use crate::scons::{python_program, CommandSpec, Execution, SconsBuilder};

pub const SMOKE_TESTS: &[&str] = &["small_tests", "medium_tests"];
pub const SMOKE_TESTS_IRT: &[&str] = &["small_tests_irt", "medium_tests_irt"];
pub const CHECKDEPS_SCRIPT: &str = "tools/checkdeps/checkdeps.py";

/// Unsandboxed-mode suites exercised on Linux x86-32 bots.
pub const UNSANDBOXED_TESTS_LINUX: &[&str] = &[
    "run_hello_world_test_irt",
    "run_irt_futex_test_irt",
    "run_thread_test_irt",
    "run_float_test_irt",
    "run_malloc_realloc_calloc_free_test_irt",
    "run_dup_test_irt",
    "run_cond_timedwait_test_irt",
    "run_getpid_test_irt",
];

/// The threading suites don't pass on Mac yet, so only the basic check runs.
pub const UNSANDBOXED_TESTS_MAC: &[&str] = &["run_hello_world_test_irt"];

/// What a step does when executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Delete the `scons-out*` build trees under the checkout root.
    RemoveBuildDirs,
    /// Spawn an external command and require a zero exit.
    Run(CommandSpec),
    /// Pack the build output into an archive for a remote tester.
    PackArtifacts { archive: PathBuf },
    /// Restore build output packed by a builder bot.
    RestoreArtifacts { archive: PathBuf },
}

/// A named, ordered unit of work with its halting policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub name: String,
    /// When true, a failure aborts every remaining step.
    pub halt_on_fail: bool,
    pub action: StepAction,
}

impl PlannedStep {
    fn halting(name: String, action: StepAction) -> PlannedStep {
        PlannedStep {
            name,
            halt_on_fail: true,
            action,
        }
    }

    fn tolerant(name: String, action: StepAction) -> PlannedStep {
        PlannedStep {
            name,
            halt_on_fail: false,
            action,
        }
    }
}

/// Build the full step sequence for one run.
pub fn build_plan(ctx: &BuildContext, config: &BotConfig) -> Vec<PlannedStep> {
    let flags = ScopedFlags::for_context(ctx);
    let arch = ctx.arch.as_str();
    let scons = config.scons_script.as_str();
    let mut plan = Vec::new();

    if ctx.skip_build {
        if let Some(archive) = &ctx.restore_from {
            plan.push(PlannedStep::halting(
                format!("restore_build_output {arch}"),
                StepAction::RestoreArtifacts {
                    archive: archive.clone(),
                },
            ));
        }
    }

    // Clean out build directories, unless we have built elsewhere.
    if !ctx.skip_build {
        plan.push(PlannedStep::halting(
            "clobber scons".to_string(),
            StepAction::RemoveBuildDirs,
        ));
    }

    // Vet #includes before building anything.
    plan.push(PlannedStep::halting(
        "checkdeps".to_string(),
        StepAction::Run(checkdeps_command(ctx)),
    ));

    if !ctx.skip_build {
        // Builders that feed ARM hardware testers first run the hello world
        // test under the emulator as a basic sanity check.
        if ctx.arch == Arch::Arm && ctx.skip_run {
            plan.push(PlannedStep::halting(
                format!("hello_world {arch}"),
                StepAction::Run(
                    SconsBuilder::new(ctx, scons, ToolchainVariant::Pnacl)
                        .args(["run_hello_world_test"])
                        .build(),
                ),
            ));
        }
        plan.push(PlannedStep::halting(
            format!("build_all {arch}"),
            StepAction::Run(
                SconsBuilder::new(ctx, scons, ToolchainVariant::Pnacl)
                    .args(flags.build.clone())
                    .build(),
            ),
        ));
        if ctx.arch.has_subzero() {
            plan.push(PlannedStep::halting(
                format!("build_all subzero {arch}"),
                StepAction::Run(
                    SconsBuilder::new(ctx, scons, ToolchainVariant::Pnacl)
                        .args(flags.build.clone())
                        .args(flags.subzero.clone())
                        .build(),
                ),
            ));
        }
    }

    plan.extend(pexe_test_steps(ctx, config, &flags));
    plan.extend(irt_steps(ctx, config, &flags));
    plan.extend(variant_steps(ctx, config, &flags, ToolchainVariant::NaclClang));
    plan.extend(variant_steps(ctx, config, &flags, ToolchainVariant::Saigo));
    plan.extend(sandboxed_translator_steps(ctx, config, &flags));
    plan.extend(unsandboxed_steps(ctx, config, &flags));

    if ctx.skip_run {
        if let Some(archive) = &ctx.pack_to {
            plan.push(PlannedStep::halting(
                format!("pack_build_output {arch}"),
                StepAction::PackArtifacts {
                    archive: archive.clone(),
                },
            ));
        }
    }

    plan
}

fn checkdeps_command(ctx: &BuildContext) -> CommandSpec {
    CommandSpec {
        program: python_program(),
        args: vec![CHECKDEPS_SCRIPT.to_string()],
        env: ctx.env.clone(),
        cwd: ctx.checkout_root.clone(),
    }
}

/// Normal pexe-mode suites, plus their Subzero copies where built.
fn pexe_test_steps(ctx: &BuildContext, config: &BotConfig, flags: &ScopedFlags) -> Vec<PlannedStep> {
    let arch = ctx.arch.as_str();
    let scons = config.scons_script.as_str();
    let mut steps = vec![
        PlannedStep::tolerant(
            format!("smoke_tests {arch}"),
            StepAction::Run(
                SconsBuilder::new(ctx, scons, ToolchainVariant::Pnacl)
                    .args(flags.run.clone())
                    .args(SMOKE_TESTS.iter().copied())
                    .build(),
            ),
        ),
        // Large tests cannot be run in parallel.
        PlannedStep::tolerant(
            format!("large_tests {arch}"),
            StepAction::Run(
                SconsBuilder::new(ctx, scons, ToolchainVariant::Pnacl)
                    .execution(Execution::Serial)
                    .args(flags.run.clone())
                    .args(["large_tests"])
                    .build(),
            ),
        ),
    ];

    if ctx.arch.has_subzero() {
        steps.push(PlannedStep::tolerant(
            format!("smoke_tests subzero {arch}"),
            StepAction::Run(
                SconsBuilder::new(ctx, scons, ToolchainVariant::Pnacl)
                    .args(flags.run.clone())
                    .args(flags.subzero.clone())
                    .args(SMOKE_TESTS.iter().copied())
                    .build(),
            ),
        ));
        steps.push(PlannedStep::tolerant(
            format!("large_tests subzero {arch}"),
            StepAction::Run(
                SconsBuilder::new(ctx, scons, ToolchainVariant::Pnacl)
                    .execution(Execution::Serial)
                    .args(flags.run.clone())
                    .args(flags.subzero.clone())
                    .args(["large_tests"])
                    .build(),
            ),
        ));
    }

    steps.push(PlannedStep::tolerant(
        format!("nonpexe_tests {arch}"),
        StepAction::Run(
            SconsBuilder::new(ctx, scons, ToolchainVariant::Pnacl)
                .args(flags.run.clone())
                .args(["pnacl_generate_pexe=0", "nonpexe_tests"])
                .build(),
        ),
    ));

    steps
}

/// Build and run the IRT-linked copies of the suites.
fn irt_steps(ctx: &BuildContext, config: &BotConfig, flags: &ScopedFlags) -> Vec<PlannedStep> {
    let arch = ctx.arch.as_str();
    let scons = config.scons_script.as_str();
    let mut steps = Vec::new();

    if !ctx.skip_build {
        steps.push(PlannedStep::halting(
            format!("build_all_irt {arch}"),
            StepAction::Run(
                SconsBuilder::new(ctx, scons, ToolchainVariant::Pnacl)
                    .irt()
                    .args(flags.build.clone())
                    .build(),
            ),
        ));
    }
    steps.push(PlannedStep::tolerant(
        format!("smoke_tests_irt {arch}"),
        StepAction::Run(
            SconsBuilder::new(ctx, scons, ToolchainVariant::Pnacl)
                .irt()
                .args(flags.run.clone())
                .args(SMOKE_TESTS_IRT.iter().copied())
                .build(),
        ),
    ));
    steps.push(PlannedStep::tolerant(
        format!("large_tests_irt {arch}"),
        StepAction::Run(
            SconsBuilder::new(ctx, scons, ToolchainVariant::Pnacl)
                .irt()
                .execution(Execution::Serial)
                .args(flags.run.clone())
                .args(["large_tests_irt"])
                .build(),
        ),
    ));

    steps
}

/// Sub-sequence for an alternate toolchain variant.
///
/// The variant build steps are advisory and do not halt the run, with one
/// exception: the saigo IRT build gates the saigo IRT suites and halts.
fn variant_steps(
    ctx: &BuildContext,
    config: &BotConfig,
    flags: &ScopedFlags,
    variant: ToolchainVariant,
) -> Vec<PlannedStep> {
    let arch = ctx.arch.as_str();
    let scons = config.scons_script.as_str();
    let mut steps = Vec::new();

    match variant {
        ToolchainVariant::NaclClang => {
            if !ctx.skip_build {
                steps.push(PlannedStep::tolerant(
                    format!("build_nacl_clang {arch}"),
                    StepAction::Run(
                        SconsBuilder::new(ctx, scons, variant)
                            .args(flags.build.clone())
                            .build(),
                    ),
                ));
            }
            steps.push(PlannedStep::tolerant(
                format!("smoke_tests_nacl_clang {arch}"),
                StepAction::Run(
                    SconsBuilder::new(ctx, scons, variant)
                        .args(flags.run.clone())
                        .args(SMOKE_TESTS.iter().copied())
                        .build(),
                ),
            ));
            steps.push(PlannedStep::tolerant(
                format!("large_tests_nacl_clang {arch}"),
                StepAction::Run(
                    SconsBuilder::new(ctx, scons, variant)
                        .execution(Execution::Serial)
                        .args(flags.run.clone())
                        .args(["large_tests"])
                        .build(),
                ),
            ));
        }
        ToolchainVariant::Saigo => {
            if !ctx.arch.has_subzero() {
                return steps;
            }
            if !ctx.skip_build {
                steps.push(PlannedStep::tolerant(
                    format!("build_saigo {arch}"),
                    StepAction::Run(
                        SconsBuilder::new(ctx, scons, variant)
                            .args(flags.build.clone())
                            .build(),
                    ),
                ));
            }
            steps.push(PlannedStep::tolerant(
                format!("smoke_tests_saigo {arch}"),
                StepAction::Run(
                    SconsBuilder::new(ctx, scons, variant)
                        .args(flags.run.clone())
                        .args(SMOKE_TESTS.iter().copied())
                        .build(),
                ),
            ));
            // Unlike the other large suites this one tolerates parallelism.
            steps.push(PlannedStep::tolerant(
                format!("large_tests_saigo {arch}"),
                StepAction::Run(
                    SconsBuilder::new(ctx, scons, variant)
                        .args(flags.run.clone())
                        .args(["large_tests"])
                        .build(),
                ),
            ));
            if !ctx.skip_build {
                steps.push(PlannedStep::halting(
                    format!("build_all_irt_saigo {arch}"),
                    StepAction::Run(
                        SconsBuilder::new(ctx, scons, variant)
                            .irt()
                            .args(flags.build.clone())
                            .build(),
                    ),
                ));
            }
            steps.push(PlannedStep::tolerant(
                format!("smoke_tests_irt_saigo {arch}"),
                StepAction::Run(
                    SconsBuilder::new(ctx, scons, variant)
                        .irt()
                        .args(flags.run.clone())
                        .args(SMOKE_TESTS_IRT.iter().copied())
                        .build(),
                ),
            ));
            steps.push(PlannedStep::tolerant(
                format!("large_tests_irt_saigo {arch}"),
                StepAction::Run(
                    SconsBuilder::new(ctx, scons, variant)
                        .irt()
                        .execution(Execution::Serial)
                        .args(flags.run.clone())
                        .args(["large_tests_irt"])
                        .build(),
                ),
            ));
        }
        ToolchainVariant::Pnacl => unreachable!("pnacl steps are built inline"),
    }

    steps
}

/// Run the translator itself inside the sandbox.
///
/// The standalone sandboxed translator driver has no batch wrappers on
/// Windows, and no translator nexe exists for mips32 yet, so both skip the
/// whole block.
fn sandboxed_translator_steps(
    ctx: &BuildContext,
    config: &BotConfig,
    flags: &ScopedFlags,
) -> Vec<PlannedStep> {
    if ctx.platform == Platform::Windows || ctx.arch == Arch::Mips32 {
        return Vec::new();
    }

    let arch = ctx.arch.as_str();
    let scons = config.scons_script.as_str();
    let mut sbtc_flags = vec!["use_sandboxed_translator=1".to_string()];
    let mut sbtc_tests = vec!["toolchain_tests_irt".to_string()];

    if ctx.arch == Arch::Arm {
        if ctx.skip_build || ctx.skip_run {
            // With the build split from the run, force translation onto the
            // run side; it normally happens on the (more parallel) build side.
            sbtc_flags.push("translate_in_build_step=0".to_string());
        } else {
            // The ARM sandboxed translator is flaky under qemu; qemu-only
            // bots run a minimal check instead of the whole suite.
            sbtc_tests = vec!["run_hello_world_test_irt".to_string()];
        }
    } else {
        sbtc_tests.push("large_code".to_string());
    }

    vec![
        PlannedStep::tolerant(
            format!("sandboxed_translator_tests {arch}"),
            StepAction::Run(
                SconsBuilder::new(ctx, scons, ToolchainVariant::Pnacl)
                    .irt()
                    .args(flags.run.clone())
                    .args(sbtc_flags.clone())
                    .args(sbtc_tests.clone())
                    .build(),
            ),
        ),
        PlannedStep::tolerant(
            format!("sandboxed_translator_fast_tests {arch}"),
            StepAction::Run(
                SconsBuilder::new(ctx, scons, ToolchainVariant::Pnacl)
                    .irt()
                    .args(flags.run.clone())
                    .args(sbtc_flags)
                    .args(["translate_fast=1"])
                    .args(sbtc_tests)
                    .build(),
            ),
        ),
    ]
}

/// Unsandboxed-mode tests: x86-32 on Linux and Mac only.
fn unsandboxed_steps(
    ctx: &BuildContext,
    config: &BotConfig,
    flags: &ScopedFlags,
) -> Vec<PlannedStep> {
    if ctx.arch != Arch::X8632 {
        return Vec::new();
    }
    let tests: &[&str] = match ctx.platform {
        Platform::Linux => UNSANDBOXED_TESTS_LINUX,
        Platform::Mac => UNSANDBOXED_TESTS_MAC,
        Platform::Windows => return Vec::new(),
    };

    vec![PlannedStep::tolerant(
        format!("unsandboxed_tests {}", ctx.arch.as_str()),
        StepAction::Run(
            SconsBuilder::new(ctx, config.scons_script.as_str(), ToolchainVariant::Pnacl)
                .irt()
                .args(flags.run.clone())
                .args(["pnacl_unsandboxed=1"])
                .args(tests.iter().copied())
                .build(),
        ),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Arch, BuildContext, Platform};

    fn plan_for(ctx: &BuildContext) -> Vec<PlannedStep> {
        build_plan(ctx, &BotConfig::default())
    }

    fn names(plan: &[PlannedStep]) -> Vec<&str> {
        plan.iter().map(|s| s.name.as_str()).collect()
    }

    fn step<'a>(plan: &'a [PlannedStep], name: &str) -> &'a PlannedStep {
        plan.iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("missing step '{}'", name))
    }

    fn spec(step: &PlannedStep) -> &CommandSpec {
        match &step.action {
            StepAction::Run(spec) => spec,
            other => panic!("expected Run action, got {:?}", other),
        }
    }

    #[test]
    fn full_x86_64_linux_sequence() {
        let ctx = BuildContext::new(Arch::X8664, Platform::Linux);
        let plan = plan_for(&ctx);
        let names = names(&plan);

        assert_eq!(
            &names[..3],
            &["clobber scons", "checkdeps", "build_all x86-64"]
        );
        for expected in [
            "build_all subzero x86-64",
            "smoke_tests x86-64",
            "large_tests x86-64",
            "smoke_tests subzero x86-64",
            "large_tests subzero x86-64",
            "nonpexe_tests x86-64",
            "build_all_irt x86-64",
            "smoke_tests_irt x86-64",
            "large_tests_irt x86-64",
            "build_nacl_clang x86-64",
            "smoke_tests_nacl_clang x86-64",
            "large_tests_nacl_clang x86-64",
            "build_saigo x86-64",
            "smoke_tests_saigo x86-64",
            "large_tests_saigo x86-64",
            "build_all_irt_saigo x86-64",
            "smoke_tests_irt_saigo x86-64",
            "large_tests_irt_saigo x86-64",
            "sandboxed_translator_tests x86-64",
            "sandboxed_translator_fast_tests x86-64",
        ] {
            assert!(names.contains(&expected), "missing '{}'", expected);
        }
        // No unsandboxed block outside x86-32.
        assert!(!names.iter().any(|n| n.starts_with("unsandboxed_tests")));
    }

    #[test]
    fn test_steps_never_halt_and_builds_halt() {
        let ctx = BuildContext::new(Arch::X8664, Platform::Linux);
        let plan = plan_for(&ctx);

        assert!(step(&plan, "clobber scons").halt_on_fail);
        assert!(step(&plan, "checkdeps").halt_on_fail);
        assert!(step(&plan, "build_all x86-64").halt_on_fail);
        assert!(step(&plan, "build_all_irt x86-64").halt_on_fail);
        assert!(step(&plan, "build_all_irt_saigo x86-64").halt_on_fail);

        // The variant warm-up builds are the deliberate exceptions.
        assert!(!step(&plan, "build_nacl_clang x86-64").halt_on_fail);
        assert!(!step(&plan, "build_saigo x86-64").halt_on_fail);

        for s in &plan {
            if s.name.contains("tests") {
                assert!(!s.halt_on_fail, "test step '{}' must not halt", s.name);
            }
        }
    }

    #[test]
    fn large_tests_run_serially_except_saigo() {
        let mut ctx = BuildContext::new(Arch::X8664, Platform::Linux);
        // Pin the job count so the parallel/serial distinction is
        // observable even on a single-core host.
        ctx.max_jobs = 6;
        let plan = plan_for(&ctx);

        for name in [
            "large_tests x86-64",
            "large_tests subzero x86-64",
            "large_tests_irt x86-64",
            "large_tests_nacl_clang x86-64",
            "large_tests_irt_saigo x86-64",
        ] {
            assert!(
                spec(step(&plan, name)).args.contains(&"-j1".to_string()),
                "'{}' must be serial",
                name
            );
        }
        assert!(!spec(step(&plan, "large_tests_saigo x86-64"))
            .args
            .contains(&"-j1".to_string()));
    }

    #[test]
    fn skip_build_omits_build_steps() {
        let mut ctx = BuildContext::new(Arch::Arm, Platform::Linux);
        ctx.skip_build = true;
        let plan = plan_for(&ctx);
        let names = names(&plan);

        assert!(!names.contains(&"clobber scons"));
        assert!(!names.iter().any(|n| n.starts_with("build_")));
        assert!(names.contains(&"checkdeps"));
        assert!(names.contains(&"smoke_tests arm"));
    }

    #[test]
    fn skip_run_keeps_test_steps_without_running_them() {
        let mut ctx = BuildContext::new(Arch::X8664, Platform::Linux);
        ctx.skip_run = true;
        let plan = plan_for(&ctx);

        let smoke = spec(step(&plan, "smoke_tests x86-64"));
        assert!(smoke.args.contains(&"do_not_run_tests=1".to_string()));
    }

    #[test]
    fn arm_builder_for_hardware_tester_runs_sanity_check_first() {
        let mut ctx = BuildContext::new(Arch::Arm, Platform::Linux);
        ctx.skip_run = true;
        let plan = plan_for(&ctx);
        let names = names(&plan);

        let hello = names.iter().position(|n| *n == "hello_world arm").unwrap();
        let build = names.iter().position(|n| *n == "build_all arm").unwrap();
        assert!(hello < build);
        assert!(step(&plan, "hello_world arm").halt_on_fail);
    }

    #[test]
    fn plain_arm_run_has_no_sanity_step() {
        let ctx = BuildContext::new(Arch::Arm, Platform::Linux);
        let plan = plan_for(&ctx);
        assert!(!names(&plan).contains(&"hello_world arm"));
    }

    #[test]
    fn mips_skips_sandboxed_translator_and_subzero() {
        let ctx = BuildContext::new(Arch::Mips32, Platform::Linux);
        let plan = plan_for(&ctx);
        let names = names(&plan);

        assert!(!names.iter().any(|n| n.starts_with("sandboxed_translator")));
        assert!(!names.iter().any(|n| n.contains("subzero")));
        assert!(!names.iter().any(|n| n.contains("saigo")));
        // nacl_clang still runs on mips32.
        assert!(names.contains(&"smoke_tests_nacl_clang mips32"));
    }

    #[test]
    fn windows_skips_sandboxed_translator_on_any_arch() {
        for arch in [Arch::X8632, Arch::X8664] {
            let ctx = BuildContext::new(arch, Platform::Windows);
            let plan = plan_for(&ctx);
            assert!(
                !names(&plan)
                    .iter()
                    .any(|n| n.starts_with("sandboxed_translator")),
                "windows {} must skip the sandboxed translator block",
                arch.as_str()
            );
        }
    }

    #[test]
    fn arm_split_runs_translate_on_the_run_side() {
        let mut ctx = BuildContext::new(Arch::Arm, Platform::Linux);
        ctx.skip_build = true;
        let plan = plan_for(&ctx);
        let sbtc = spec(step(&plan, "sandboxed_translator_tests arm"));
        assert!(sbtc
            .args
            .contains(&"translate_in_build_step=0".to_string()));
        assert!(sbtc.args.contains(&"toolchain_tests_irt".to_string()));
    }

    #[test]
    fn arm_local_run_shrinks_sandboxed_suite() {
        let ctx = BuildContext::new(Arch::Arm, Platform::Linux);
        let plan = plan_for(&ctx);
        let sbtc = spec(step(&plan, "sandboxed_translator_tests arm"));
        assert!(sbtc.args.contains(&"run_hello_world_test_irt".to_string()));
        assert!(!sbtc.args.contains(&"toolchain_tests_irt".to_string()));
        assert!(!sbtc.args.contains(&"large_code".to_string()));
    }

    #[test]
    fn x86_sandboxed_suite_includes_large_code() {
        let ctx = BuildContext::new(Arch::X8664, Platform::Linux);
        let plan = plan_for(&ctx);
        let fast = spec(step(&plan, "sandboxed_translator_fast_tests x86-64"));
        assert!(fast.args.contains(&"large_code".to_string()));
        assert!(fast.args.contains(&"translate_fast=1".to_string()));
    }

    #[test]
    fn unsandboxed_block_is_x86_32_linux_and_mac_only() {
        let linux = plan_for(&BuildContext::new(Arch::X8632, Platform::Linux));
        let linux_step = step(&linux, "unsandboxed_tests x86-32");
        assert!(!linux_step.halt_on_fail);
        let linux_spec = spec(linux_step);
        assert!(linux_spec.args.contains(&"pnacl_unsandboxed=1".to_string()));
        assert!(linux_spec.args.contains(&"run_getpid_test_irt".to_string()));

        let mac = plan_for(&BuildContext::new(Arch::X8632, Platform::Mac));
        let mac_spec = spec(step(&mac, "unsandboxed_tests x86-32"));
        assert!(mac_spec
            .args
            .contains(&"run_hello_world_test_irt".to_string()));
        assert!(!mac_spec.args.contains(&"run_thread_test_irt".to_string()));

        let win = plan_for(&BuildContext::new(Arch::X8632, Platform::Windows));
        assert!(!names(&win).iter().any(|n| n.starts_with("unsandboxed")));
    }

    #[test]
    fn pack_and_restore_steps_enter_only_when_requested() {
        let mut builder = BuildContext::new(Arch::Arm, Platform::Linux);
        builder.skip_run = true;
        builder.pack_to = Some(PathBuf::from("arm-out.tar.zst"));
        let plan = plan_for(&builder);
        assert_eq!(plan.last().unwrap().name, "pack_build_output arm");
        assert!(plan.last().unwrap().halt_on_fail);

        let mut tester = BuildContext::new(Arch::Arm, Platform::Linux);
        tester.skip_build = true;
        tester.restore_from = Some(PathBuf::from("arm-out.tar.zst"));
        let plan = plan_for(&tester);
        assert_eq!(plan[0].name, "restore_build_output arm");

        // Neither step without the paths.
        let plain = plan_for(&BuildContext::new(Arch::Arm, Platform::Linux));
        assert!(!names(&plain).iter().any(|n| n.contains("build_output")));
    }

    #[test]
    fn variant_sections_use_their_own_toolchain_flag() {
        let ctx = BuildContext::new(Arch::X8664, Platform::Linux);
        let plan = plan_for(&ctx);

        assert!(spec(step(&plan, "smoke_tests x86-64"))
            .args
            .contains(&"bitcode=1".to_string()));
        assert!(spec(step(&plan, "smoke_tests_nacl_clang x86-64"))
            .args
            .contains(&"nacl_clang=1".to_string()));
        assert!(spec(step(&plan, "smoke_tests_saigo x86-64"))
            .args
            .contains(&"saigo=1".to_string()));
    }
}
