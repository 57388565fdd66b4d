//! Build-output handoff between builder bots and hardware testers.
//!
//! A build-only bot packs its `scons-out` tree into a deterministic
//! `tar.zst` with a JSON sidecar carrying the archive's sha256; the
//! run-only tester verifies the hash before unpacking. The archive is
//! written atomically and packing holds an exclusive lock so two bots
//! sharing a staging directory cannot interleave.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tar::Builder as TarBuilder;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use walkdir::WalkDir;

/// The build tree handed from a builder bot to a tester.
pub const BUILD_OUTPUT_DIR: &str = "scons-out";

/// Sidecar written next to the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub sha256: String,
    pub size_bytes: u64,
    pub arch: String,
    pub created_at_utc: String,
}

pub fn manifest_path(archive: &Path) -> PathBuf {
    let mut name = archive
        .file_name()
        .map(|part| part.to_string_lossy().to_string())
        .unwrap_or_else(|| "archive".to_string());
    name.push_str(".json");
    archive.with_file_name(name)
}

/// Pack `<checkout_root>/scons-out` into `archive` and write the sidecar.
pub fn pack_build_output(checkout_root: &Path, archive: &Path, arch: &str) -> Result<()> {
    let source = checkout_root.join(BUILD_OUTPUT_DIR);
    if !source.is_dir() {
        bail!(
            "no build output to pack: '{}' is missing; run the build steps first",
            source.display()
        );
    }

    if let Some(parent) = archive.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("creating archive directory '{}'", parent.display())
            })?;
        }
    }

    let _lock = acquire_pack_lock(archive)?;

    let tmp = archive.with_extension("tmp");
    create_tar_zst(checkout_root, &source, &tmp)
        .with_context(|| format!("packing '{}'", source.display()))?;

    let (sha256, size_bytes) = sha256_file(&tmp)?;
    fs::rename(&tmp, archive)
        .with_context(|| format!("publishing archive '{}'", archive.display()))?;

    let manifest = ArtifactManifest {
        sha256,
        size_bytes,
        arch: arch.to_string(),
        created_at_utc: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("unknown")),
    };
    let bytes = serde_json::to_vec_pretty(&manifest)?;
    let sidecar = manifest_path(archive);
    fs::write(&sidecar, bytes)
        .with_context(|| format!("writing artifact manifest '{}'", sidecar.display()))?;

    println!(
        "[bot] packed {} ({} bytes, sha256 {})",
        archive.display(),
        manifest.size_bytes,
        &manifest.sha256[..16]
    );
    Ok(())
}

/// Verify and unpack an archive produced by `pack_build_output` into the
/// checkout root, replacing any existing `scons-out`.
pub fn restore_build_output(checkout_root: &Path, archive: &Path) -> Result<()> {
    if !archive.is_file() {
        bail!("build output archive not found: '{}'", archive.display());
    }

    let sidecar = manifest_path(archive);
    let bytes = fs::read(&sidecar)
        .with_context(|| format!("reading artifact manifest '{}'", sidecar.display()))?;
    let manifest: ArtifactManifest = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing artifact manifest '{}'", sidecar.display()))?;

    let (actual_sha, _size) = sha256_file(archive)?;
    if actual_sha != manifest.sha256 {
        bail!(
            "archive hash mismatch for '{}'\n  expected: {}\n  actual:   {}",
            archive.display(),
            manifest.sha256,
            actual_sha
        );
    }

    let target = checkout_root.join(BUILD_OUTPUT_DIR);
    if target.exists() {
        fs::remove_dir_all(&target).with_context(|| {
            format!("removing stale build output '{}'", target.display())
        })?;
    }
    fs::create_dir_all(checkout_root)
        .with_context(|| format!("creating checkout root '{}'", checkout_root.display()))?;

    let file = File::open(archive)
        .with_context(|| format!("opening archive '{}'", archive.display()))?;
    let decoder = zstd::stream::Decoder::new(file)?;
    let mut tar = tar::Archive::new(decoder);
    tar.unpack(checkout_root)
        .with_context(|| format!("unpacking '{}'", archive.display()))?;

    println!(
        "[bot] restored build output for {} into {}",
        manifest.arch,
        target.display()
    );
    Ok(())
}

fn acquire_pack_lock(archive: &Path) -> Result<PackLock> {
    let path = archive.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .with_context(|| format!("creating pack lock '{}'", path.display()))?;
    if file.try_lock_exclusive().is_err() {
        bail!("archive is being packed by another process: {}", path.display());
    }
    Ok(PackLock { _file: file, path })
}

/// RAII guard: unlocks and removes the lock file on drop.
struct PackLock {
    _file: File,
    path: PathBuf,
}

impl Drop for PackLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Deterministic tar.zst of `src_dir`, entries named relative to `base`
/// (so the archive unpacks back to `<base>/scons-out/...`).
fn create_tar_zst(base: &Path, src_dir: &Path, out_path: &Path) -> Result<()> {
    let out = File::create(out_path)
        .with_context(|| format!("creating '{}'", out_path.display()))?;
    let encoder = zstd::stream::Encoder::new(out, 3)?;
    let mut builder = TarBuilder::new(encoder);

    let mut entries: Vec<PathBuf> = WalkDir::new(src_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .map(|ent| ent.path().to_path_buf())
        .collect();
    entries.sort_by(|a, b| {
        let ra = a.strip_prefix(base).unwrap_or(a).to_string_lossy().to_string();
        let rb = b.strip_prefix(base).unwrap_or(b).to_string_lossy().to_string();
        ra.cmp(&rb)
    });

    for path in entries {
        let rel = path
            .strip_prefix(base)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        let md = fs::symlink_metadata(&path)?;

        let mut header = tar::Header::new_gnu();
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            header.set_mode(md.permissions().mode());
        }
        #[cfg(not(unix))]
        {
            header.set_mode(if md.is_dir() { 0o755 } else { 0o644 });
        }

        if md.is_dir() {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_size(0);
            header.set_cksum();
            builder.append_data(&mut header, rel, std::io::empty())?;
        } else if md.file_type().is_symlink() {
            let target = fs::read_link(&path)?;
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_link_name(target.to_string_lossy().as_ref())?;
            header.set_cksum();
            builder.append_data(&mut header, rel, std::io::empty())?;
        } else if md.is_file() {
            let mut file = File::open(&path)?;
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(md.len());
            header.set_cksum();
            builder.append_data(&mut header, rel, &mut file)?;
        }
    }

    let encoder = builder
        .into_inner()
        .with_context(|| "finalizing tar builder")?;
    encoder.finish()?;
    Ok(())
}

fn sha256_file(path: &Path) -> Result<(String, u64)> {
    let file = File::open(path).with_context(|| format!("opening '{}'", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 1024 * 1024];
    let mut size = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok((format!("{:x}", hasher.finalize()), size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn pack_then_restore_round_trip() {
        let tmp = TempDir::new().unwrap();
        let builder_root = tmp.path().join("builder");
        let out = builder_root.join("scons-out/opt-linux-arm/staging");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("hello_world.nexe"), b"nexe bytes").unwrap();

        let archive = tmp.path().join("arm-out.tar.zst");
        pack_build_output(&builder_root, &archive, "arm").unwrap();
        assert!(archive.is_file());

        let sidecar = manifest_path(&archive);
        let manifest: ArtifactManifest =
            serde_json::from_slice(&fs::read(&sidecar).unwrap()).unwrap();
        assert_eq!(manifest.arch, "arm");
        assert_eq!(manifest.sha256.len(), 64);

        let tester_root = tmp.path().join("tester");
        fs::create_dir_all(&tester_root).unwrap();
        restore_build_output(&tester_root, &archive).unwrap();
        let restored =
            fs::read(tester_root.join("scons-out/opt-linux-arm/staging/hello_world.nexe"))
                .unwrap();
        assert_eq!(restored, b"nexe bytes");
    }

    #[test]
    fn restore_rejects_tampered_archive() {
        let tmp = TempDir::new().unwrap();
        let builder_root = tmp.path().join("builder");
        fs::create_dir_all(builder_root.join("scons-out")).unwrap();
        fs::write(builder_root.join("scons-out/a.txt"), b"a").unwrap();

        let archive = tmp.path().join("out.tar.zst");
        pack_build_output(&builder_root, &archive, "x86-64").unwrap();

        // Corrupt the archive after packing.
        let mut bytes = fs::read(&archive).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&archive, bytes).unwrap();

        let tester_root = tmp.path().join("tester");
        let err = restore_build_output(&tester_root, &archive)
            .unwrap_err()
            .to_string();
        assert!(err.contains("hash mismatch"));
    }

    #[test]
    fn pack_requires_build_output() {
        let tmp = TempDir::new().unwrap();
        let err = pack_build_output(tmp.path(), &tmp.path().join("out.tar.zst"), "arm")
            .unwrap_err()
            .to_string();
        assert!(err.contains("no build output to pack"));
    }

    #[test]
    fn restore_requires_archive_and_manifest() {
        let tmp = TempDir::new().unwrap();
        assert!(restore_build_output(tmp.path(), &tmp.path().join("missing.tar.zst")).is_err());
    }
}
