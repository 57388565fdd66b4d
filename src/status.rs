//! Run status: the append-only step log and its on-disk manifest.
//!
//! Every step entered during a run appends exactly one record here,
//! pass or fail. The log drives the final summary, the process exit code,
//! and a JSON run manifest kept under the status directory so bot operators
//! can inspect recent runs.

use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::context::BuildContext;

/// Outcome of one executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub passed: bool,
    /// Failure detail; empty for passing steps.
    #[serde(default)]
    pub detail: String,
}

/// Append-only ordered log of step outcomes for one run.
#[derive(Debug)]
pub struct BuildStatus {
    arch: String,
    platform: String,
    started_at_utc: String,
    records: Vec<StepRecord>,
}

impl BuildStatus {
    pub fn new(ctx: &BuildContext) -> BuildStatus {
        BuildStatus {
            arch: ctx.arch.as_str().to_string(),
            platform: ctx.platform.as_str().to_string(),
            started_at_utc: now_rfc3339(),
            records: Vec::new(),
        }
    }

    pub fn record_pass(&mut self, name: &str) {
        self.records.push(StepRecord {
            name: name.to_string(),
            passed: true,
            detail: String::new(),
        });
    }

    pub fn record_fail(&mut self, name: &str, detail: &str) {
        self.records.push(StepRecord {
            name: name.to_string(),
            passed: false,
            detail: detail.to_string(),
        });
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn ok(&self) -> bool {
        self.records.iter().all(|r| r.passed)
    }

    pub fn failed_steps(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Human summary printed at the end of a run.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "[bot] {} steps run, {} failed\n",
            self.records.len(),
            self.failed_steps().len()
        ));
        for record in &self.records {
            let mark = if record.passed { "ok  " } else { "FAIL" };
            out.push_str(&format!("[bot]   {} {}\n", mark, record.name));
        }
        out
    }

    /// Write the run manifest under `status_dir` and prune old ones.
    pub fn save_manifest(&self, status_dir: &Path, keep_runs: usize) -> Result<PathBuf> {
        fs::create_dir_all(status_dir).with_context(|| {
            format!("creating status directory '{}'", status_dir.display())
        })?;

        let manifest = RunManifest {
            run_id: run_id(),
            arch: self.arch.clone(),
            platform: self.platform.clone(),
            ok: self.ok(),
            started_at_utc: self.started_at_utc.clone(),
            finished_at_utc: now_rfc3339(),
            steps: self.records.clone(),
        };

        let path = status_dir.join(format!("{}.json", manifest.run_id));
        let bytes = serde_json::to_vec_pretty(&manifest)?;
        let tmp = status_dir.join(format!(".{}.tmp", manifest.run_id));
        fs::write(&tmp, bytes)
            .with_context(|| format!("writing run manifest '{}'", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("publishing run manifest '{}'", path.display()))?;

        prune_old_manifests(status_dir, keep_runs)?;
        Ok(path)
    }
}

/// Persisted record of one completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub arch: String,
    pub platform: String,
    pub ok: bool,
    pub started_at_utc: String,
    pub finished_at_utc: String,
    pub steps: Vec<StepRecord>,
}

/// Load all run manifests under `status_dir`, newest first.
pub fn load_manifests(status_dir: &Path) -> Result<Vec<RunManifest>> {
    if !status_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut manifests = Vec::new();
    for entry in fs::read_dir(status_dir)
        .with_context(|| format!("reading status directory '{}'", status_dir.display()))?
    {
        let entry = entry.with_context(|| {
            format!("iterating status directory '{}'", status_dir.display())
        })?;
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        let bytes = fs::read(&path)
            .with_context(|| format!("reading run manifest '{}'", path.display()))?;
        let parsed: RunManifest = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing run manifest '{}'", path.display()))?;
        manifests.push(parsed);
    }
    manifests.sort_by_key(|m| Reverse(m.run_id.clone()));
    Ok(manifests)
}

fn prune_old_manifests(status_dir: &Path, keep: usize) -> Result<()> {
    let manifests = load_manifests(status_dir)?;
    for manifest in manifests.into_iter().skip(keep.max(1)) {
        let path = status_dir.join(format!("{}.json", manifest.run_id));
        fs::remove_file(&path).with_context(|| {
            format!("removing expired run manifest '{}'", path.display())
        })?;
    }
    Ok(())
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("unknown"))
}

/// Monotonic-enough, lexically sortable run identifier.
fn run_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("run-{:030}", nanos)
}
