//! SCons invocation builder.
//!
//! Provides `SconsBuilder` for constructing SCons command lines from typed
//! knobs (execution mode, build modes, toolchain variant) and `CommandSpec`,
//! the fully-resolved command a step hands to the runner.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::context::{BuildContext, ToolchainVariant};

/// Base SCons modes every invocation carries.
pub const DEFAULT_SCONS_MODE: &[&str] = &["opt-host", "nacl"];

/// Extra mode enabling the IRT-linked copies of the test suites.
pub const IRT_TEST_MODE: &str = "nacl_irt_test";

/// Whether the external build tool may parallelize internally.
///
/// This is a flag forwarded to SCons, not concurrency in the driver itself;
/// steps always execute one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// `-j <max_jobs>`.
    Parallel,
    /// `-j 1`; the large test batches cannot run in parallel.
    Serial,
}

/// A fully-resolved command: program, ordered arguments, environment
/// overrides, working directory. Fire-and-forget per step; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub cwd: PathBuf,
}

impl CommandSpec {
    /// One-line rendering for progress output and failure messages.
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Builder for SCons commands.
pub struct SconsBuilder<'a> {
    ctx: &'a BuildContext,
    scons_script: &'a str,
    variant: ToolchainVariant,
    execution: Execution,
    irt: bool,
    args: Vec<String>,
}

impl<'a> SconsBuilder<'a> {
    pub fn new(ctx: &'a BuildContext, scons_script: &'a str, variant: ToolchainVariant) -> Self {
        SconsBuilder {
            ctx,
            scons_script,
            variant,
            execution: Execution::Parallel,
            irt: false,
            args: Vec::new(),
        }
    }

    pub fn execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    /// Build/run against the IRT-linked test mode.
    pub fn irt(mut self) -> Self {
        self.irt = true;
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> CommandSpec {
        let jobs = match self.execution {
            Execution::Parallel => self.ctx.max_jobs,
            Execution::Serial => 1,
        };

        let mut mode: Vec<&str> = DEFAULT_SCONS_MODE.to_vec();
        if self.irt {
            mode.push(IRT_TEST_MODE);
        }

        let mut args = vec![
            self.scons_script.to_string(),
            "--verbose".to_string(),
            "-k".to_string(),
            format!("-j{}", jobs),
            format!("--mode={}", mode.join(",")),
            format!("platform={}", self.ctx.arch.as_str()),
            self.variant.scons_flag().to_string(),
        ];
        args.extend(self.args);

        CommandSpec {
            program: python_program(),
            args,
            env: self.ctx.env.clone(),
            cwd: self.ctx.checkout_root.clone(),
        }
    }
}

/// The Python interpreter used for SCons and the helper scripts.
pub fn python_program() -> String {
    std::env::var("PNACL_BOT_PYTHON").unwrap_or_else(|_| "python".to_string())
}
