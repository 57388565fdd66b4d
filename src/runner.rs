//! Scoped step execution.
//!
//! `execute_plan` walks the planned steps in order and guarantees that every
//! step entered leaves exactly one record in the status log, whatever the
//! outcome. A failed halting step aborts the remaining sequence and
//! propagates upward; a failed tolerant step is recorded and execution
//! continues. There are no retries.

use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::artifact;
use crate::clobber;
use crate::context::BuildContext;
use crate::plan::{PlannedStep, StepAction};
use crate::scons::CommandSpec;
use crate::status::BuildStatus;

/// Executes one resolved command. The single contract: fail loudly on a
/// non-zero exit.
pub trait CommandRunner {
    fn run(&mut self, spec: &CommandSpec) -> Result<()>;
}

/// Real subprocess runner. Output streams to the bot console; the failure
/// error carries the exit status and the command line.
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&mut self, spec: &CommandSpec) -> Result<()> {
        let status = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(&spec.env)
            .status()
            .with_context(|| format!("spawning '{}'", spec.display_line()))?;

        if status.success() {
            return Ok(());
        }
        bail!("command failed ({}): {}", status, spec.display_line())
    }
}

/// Execute the plan in order, recording every step outcome.
///
/// Returns `Err` only when a halting step failed; tolerant failures are
/// visible through the status log.
pub fn execute_plan(
    plan: &[PlannedStep],
    ctx: &BuildContext,
    status: &mut BuildStatus,
    runner: &mut dyn CommandRunner,
) -> Result<()> {
    for step in plan {
        println!("[bot] @@@ step '{}' @@@", step.name);
        let outcome = run_action(&step.action, ctx, runner);
        match outcome {
            Ok(()) => {
                println!("[bot] step '{}' passed", step.name);
                status.record_pass(&step.name);
            }
            Err(err) => {
                eprintln!("[bot] step '{}' FAILED: {:#}", step.name, err);
                status.record_fail(&step.name, &format!("{err:#}"));
                if step.halt_on_fail {
                    return Err(err.context(format!(
                        "halting step '{}' failed; aborting remaining steps",
                        step.name
                    )));
                }
            }
        }
    }
    Ok(())
}

fn run_action(
    action: &StepAction,
    ctx: &BuildContext,
    runner: &mut dyn CommandRunner,
) -> Result<()> {
    match action {
        StepAction::RemoveBuildDirs => {
            let removed = clobber::remove_build_directories(&ctx.checkout_root)?;
            println!("[bot] clobbered {} build director{}", removed, plural_y(removed));
            Ok(())
        }
        StepAction::Run(spec) => runner.run(spec),
        StepAction::PackArtifacts { archive } => {
            artifact::pack_build_output(&ctx.checkout_root, archive, ctx.arch.as_str())?;
            Ok(())
        }
        StepAction::RestoreArtifacts { archive } => {
            artifact::restore_build_output(&ctx.checkout_root, archive)
        }
    }
}

fn plural_y(n: usize) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}
