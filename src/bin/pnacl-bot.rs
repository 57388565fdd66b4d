use anyhow::{bail, Result};
use pnacl_bot::{
    build_plan, execute_plan, preflight, setup, BotConfig, BuildContext, BuildStatus, Platform,
    ProcessRunner, StepAction,
};

/// Directory (under the checkout root) holding run manifests.
const STATUS_DIR: &str = ".pnacl-bot/runs";

fn usage() -> &'static str {
    "Usage:\n  pnacl-bot run <x86-32|x86-64|arm|mips32> [options]\n  pnacl-bot plan <x86-32|x86-64|arm|mips32> [options]\n\nOptions:\n  --skip-build          consume build output produced elsewhere\n  --skip-run            build only; tests are compiled but not run\n  -j, --jobs N          parallel job count forwarded to SCons\n  --root DIR            NaCl checkout root (default: current directory)\n  --pack-to FILE        with --skip-run: pack scons-out for a remote tester\n  --restore-from FILE   with --skip-build: restore a packed scons-out\n  --config FILE         TOML overrides (max_jobs, scons_script, keep_runs)"
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.split_first() {
        Some((cmd, rest)) if cmd == "run" => run_bot(rest),
        Some((cmd, rest)) if cmd == "plan" => print_plan(rest),
        _ => bail!(usage()),
    }
}

fn resolve(args: &[String]) -> Result<(BuildContext, BotConfig)> {
    let platform = Platform::detect()?;
    let (mut ctx, config_path) = BuildContext::from_args(args, platform)?;
    let config = BotConfig::load(config_path.as_deref())?;
    if let Some(jobs) = config.max_jobs {
        ctx.max_jobs = jobs;
    }
    Ok((ctx, config))
}

fn run_bot(args: &[String]) -> Result<()> {
    let (mut ctx, config) = resolve(args)?;

    setup::setup_environment(&mut ctx);
    preflight::check_run_prerequisites(&ctx, &config)?;

    println!(
        "[bot] run: arch={} platform={} jobs={} skip_build={} skip_run={}",
        ctx.arch.as_str(),
        ctx.platform.as_str(),
        ctx.max_jobs,
        ctx.skip_build,
        ctx.skip_run
    );

    let plan = build_plan(&ctx, &config);
    let mut status = BuildStatus::new(&ctx);
    let mut runner = ProcessRunner;

    let halted = execute_plan(&plan, &ctx, &mut status, &mut runner);

    print!("{}", status.summary());
    let status_dir = ctx.checkout_root.join(STATUS_DIR);
    match status.save_manifest(&status_dir, config.keep_runs) {
        Ok(path) => println!("[bot] run manifest: {}", path.display()),
        Err(err) => eprintln!("[bot] could not save run manifest: {:#}", err),
    }

    halted?;

    if !status.ok() {
        bail!(
            "{} step(s) failed: {}",
            status.failed_steps().len(),
            status.failed_steps().join(", ")
        );
    }
    println!("[bot] all {} steps passed", status.records().len());
    Ok(())
}

fn print_plan(args: &[String]) -> Result<()> {
    let (mut ctx, config) = resolve(args)?;
    setup::setup_environment(&mut ctx);

    let plan = build_plan(&ctx, &config);
    for step in &plan {
        let policy = if step.halt_on_fail { "halt" } else { "cont" };
        let detail = match &step.action {
            StepAction::RemoveBuildDirs => {
                format!("remove scons-out* under {}", ctx.checkout_root.display())
            }
            StepAction::Run(spec) => spec.display_line(),
            StepAction::PackArtifacts { archive } => {
                format!("pack scons-out -> {}", archive.display())
            }
            StepAction::RestoreArtifacts { archive } => {
                format!("restore scons-out <- {}", archive.display())
            }
        };
        println!("[{}] {:<40} {}", policy, step.name, detail);
    }
    println!("[bot] {} steps planned", plan.len());
    Ok(())
}
