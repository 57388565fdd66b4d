//! CI driver for PNaCl toolchain bots.
//!
//! Sequences SCons build and test invocations across configuration
//! permutations: target architecture, IRT vs. non-IRT, Subzero vs. the
//! baseline translator, the nacl-clang and saigo toolchain variants, and
//! sandboxed-translator runs. One bot run is an ordered sequence of named
//! steps; build steps halt the run on failure, test suites are recorded and
//! execution continues.
//!
//! # Architecture
//!
//! ```text
//! context   - resolved configuration (arch, platform, skip flags, jobs)
//! flags     - immutable per-category SCons flag sets
//! scons     - invocation builder producing CommandSpecs
//! plan      - ordered, conditionally-included step sequence
//! runner    - scoped step execution with halt/continue policy
//! status    - append-only step log, summary, run manifests
//! artifact  - build-output handoff for split build/run bots
//! ```
//!
//! The driver itself is strictly sequential; "parallel" vs. "serial" is a
//! `-j` flag forwarded to SCons, which parallelizes internally.

pub mod artifact;
pub mod clobber;
pub mod config;
pub mod context;
pub mod flags;
pub mod plan;
pub mod preflight;
pub mod runner;
pub mod scons;
pub mod setup;
pub mod status;

pub use config::BotConfig;
pub use context::{Arch, BuildContext, Platform, ToolchainVariant};
pub use flags::ScopedFlags;
pub use plan::{build_plan, PlannedStep, StepAction};
pub use runner::{execute_plan, CommandRunner, ProcessRunner};
pub use scons::{CommandSpec, Execution};
pub use status::{BuildStatus, RunManifest};
