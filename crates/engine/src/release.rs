// SPDX-License-Identifier: MIT

//! Release engine: staging → versioned snapshot → promotion via atomic
//! symlink swap, with a recursive directory walk for diffing one release
//! against another.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use serde_json::json;
use sw_core::{Clock, EventType, Release, ReleaseDiff, ReleaseId, ReleaseManifest, ReleaseStatus, SystemClock};
use sw_store::{EventLog, Store};

use crate::error::{EngineError, EngineResult};

/// A single scanned artifact inside a release directory.
struct PackageEntry {
    category: String,
    package: String,
    version: String,
    size_bytes: u64,
}

pub struct ReleaseEngine<C: Clock = SystemClock> {
    store: std::sync::Arc<Store>,
    events: std::sync::Arc<EventLog>,
    releases_base: PathBuf,
    binhost_symlink: PathBuf,
    staging_path: PathBuf,
    clock: C,
}

impl<C: Clock> ReleaseEngine<C> {
    pub fn new(
        store: std::sync::Arc<Store>,
        events: std::sync::Arc<EventLog>,
        releases_base: PathBuf,
        binhost_symlink: PathBuf,
        staging_path: PathBuf,
        clock: C,
    ) -> Self {
        Self { store, events, releases_base, binhost_symlink, staging_path, clock }
    }

    pub fn create_release(
        &self,
        version: Option<String>,
        name: Option<String>,
        notes: Option<String>,
        created_by: &str,
    ) -> EngineResult<Release> {
        let now = self.clock.now_secs();
        let staging = self.resolve_staging();
        let version = match version {
            Some(v) => {
                if self.store.get_release_by_version(&v).is_some() {
                    return Err(EngineError::ReleaseExists(v));
                }
                v
            }
            None => self.generate_version(),
        };

        let release_dir = self.releases_base.join(&version);
        if release_dir.exists() {
            return Err(EngineError::ReleaseExists(version));
        }

        let (file_count, total_bytes) = match hardlink_tree(&staging, &release_dir) {
            Ok(r) => r,
            Err(e) => {
                let _ = fs::remove_dir_all(&release_dir);
                return Err(e.into());
            }
        };
        let size_mb = total_bytes as f64 / 1_048_576.0;

        write_manifest(
            &release_dir,
            &ReleaseManifest {
                version: version.clone(),
                name: name.clone(),
                package_count: file_count,
                size_mb,
                created_at_secs: now,
                created_by: created_by.to_string(),
                notes: notes.clone(),
            },
        );

        let release = Release {
            id: ReleaseId::new(),
            version: version.clone(),
            name,
            notes,
            status: ReleaseStatus::Staging,
            package_count: file_count,
            size_mb,
            path: release_dir.to_string_lossy().into_owned(),
            created_at_secs: now,
            created_by: created_by.to_string(),
            promoted_at_secs: None,
            archived_at_secs: None,
        };
        self.store.insert_release(release.clone())?;
        self.emit(EventType::Other, format!("release {version} created ({file_count} packages, {size_mb:.1} MB)"), now)?;
        Ok(release)
    }

    pub fn promote_release(&self, version: &str) -> EngineResult<Release> {
        let now = self.clock.now_secs();
        let mut release = self.store.get_release_by_version(version).ok_or_else(|| EngineError::ReleaseNotFound(version.to_string()))?;
        if !Path::new(&release.path).is_dir() {
            return Err(EngineError::ReleaseNotFound(format!("{version} (directory missing)")));
        }

        let previous = self.store.get_active_release();
        if let Some(mut prev) = previous.clone() {
            prev.status = ReleaseStatus::Archived;
            prev.archived_at_secs = Some(now);
            self.store.update_release(prev)?;
        }

        atomic_symlink(Path::new(&release.path), &self.binhost_symlink)?;

        release.status = ReleaseStatus::Active;
        release.promoted_at_secs = Some(now);
        self.store.update_release(release.clone())?;

        self.emit(EventType::ReleasePromoted, format!("release {version} promoted to active"), now)?;
        Ok(release)
    }

    pub fn rollback(&self) -> EngineResult<Release> {
        let target = self.store.get_last_archived_release().ok_or(EngineError::NoRollbackTarget)?;
        self.promote_release(&target.version)
    }

    pub fn archive_release(&self, version: &str) -> EngineResult<Release> {
        let now = self.clock.now_secs();
        let mut release = self.store.get_release_by_version(version).ok_or_else(|| EngineError::ReleaseNotFound(version.to_string()))?;
        release.status = ReleaseStatus::Archived;
        release.archived_at_secs = Some(now);
        self.store.update_release(release.clone())?;
        self.emit(EventType::ReleaseArchived, format!("release {version} archived"), now)?;
        Ok(release)
    }

    pub fn delete_release(&self, version: &str) -> EngineResult<()> {
        let now = self.clock.now_secs();
        let release = self.store.get_release_by_version(version).ok_or_else(|| EngineError::ReleaseNotFound(version.to_string()))?;
        if release.status == ReleaseStatus::Active {
            return Err(EngineError::CannotDeleteActive);
        }
        let path = Path::new(&release.path);
        if path.is_dir() {
            fs::remove_dir_all(path)?;
        }
        self.store.delete_release(release.id)?;
        self.emit(EventType::Other, format!("release {version} deleted"), now)?;
        Ok(())
    }

    pub fn diff_releases(&self, from: &str, to: &str) -> EngineResult<ReleaseDiff> {
        let from_release = self.store.get_release_by_version(from).ok_or_else(|| EngineError::ReleaseNotFound(from.to_string()))?;
        let to_release = self.store.get_release_by_version(to).ok_or_else(|| EngineError::ReleaseNotFound(to.to_string()))?;

        let from_pkgs = scan_packages(Path::new(&from_release.path))?;
        let to_pkgs = scan_packages(Path::new(&to_release.path))?;

        let mut from_by_cp: std::collections::HashMap<String, &PackageEntry> = std::collections::HashMap::new();
        for p in &from_pkgs {
            from_by_cp.insert(format!("{}/{}", p.category, p.package), p);
        }
        let mut to_by_cp: std::collections::HashMap<String, &PackageEntry> = std::collections::HashMap::new();
        for p in &to_pkgs {
            to_by_cp.insert(format!("{}/{}", p.category, p.package), p);
        }

        let mut diff = ReleaseDiff::default();
        for (cp, p) in &to_by_cp {
            match from_by_cp.get(cp) {
                None => diff.added.push(format!("{cp}-{}", p.version)),
                Some(old) if old.version != p.version => {
                    diff.changed_version.push((cp.clone(), old.version.clone(), p.version.clone()))
                }
                Some(_) => diff.unchanged_count += 1,
            }
        }
        for (cp, p) in &from_by_cp {
            if !to_by_cp.contains_key(cp) {
                diff.removed.push(format!("{cp}-{}", p.version));
            }
        }
        Ok(diff)
    }

    /// One-time migration: rename the flat binhost directory into
    /// `releases_base/initial/` and point the symlink at it.
    pub fn migrate_to_release_system(&self, created_by: &str) -> EngineResult<Release> {
        if self.binhost_symlink.symlink_metadata().map(|m| m.file_type().is_symlink()).unwrap_or(false) {
            return Err(EngineError::AlreadyMigrated);
        }
        if !self.binhost_symlink.is_dir() {
            return Err(EngineError::ReleaseNotFound("binhost directory not found".to_string()));
        }

        fs::create_dir_all(&self.releases_base)?;
        let initial_dir = self.releases_base.join("initial");
        if initial_dir.exists() {
            return Err(EngineError::ReleaseExists("initial".to_string()));
        }

        fs::rename(&self.binhost_symlink, &initial_dir)?;
        if let Err(e) = std::os::unix::fs::symlink(&initial_dir, &self.binhost_symlink) {
            let _ = fs::rename(&initial_dir, &self.binhost_symlink);
            return Err(e.into());
        }

        let now = self.clock.now_secs();
        let pkgs = scan_packages(&initial_dir)?;
        let file_count = pkgs.len() as u64;
        let total_bytes: u64 = pkgs.iter().map(|p| p.size_bytes).sum();
        let size_mb = total_bytes as f64 / 1_048_576.0;

        write_manifest(
            &initial_dir,
            &ReleaseManifest {
                version: "initial".to_string(),
                name: Some("Initial migration".to_string()),
                package_count: file_count,
                size_mb,
                created_at_secs: now,
                created_by: created_by.to_string(),
                notes: Some("Auto-created from existing binpkgs directory".to_string()),
            },
        );

        let release = Release {
            id: ReleaseId::new(),
            version: "initial".to_string(),
            name: Some("Initial migration".to_string()),
            notes: Some("Auto-created from existing binpkgs directory".to_string()),
            status: ReleaseStatus::Active,
            package_count: file_count,
            size_mb,
            path: initial_dir.to_string_lossy().into_owned(),
            created_at_secs: now,
            created_by: created_by.to_string(),
            promoted_at_secs: Some(now),
            archived_at_secs: None,
        };
        self.store.insert_release(release.clone())?;
        self.emit(EventType::Other, format!("migrated to release system: initial ({file_count} packages)"), now)?;
        Ok(release)
    }

    fn resolve_staging(&self) -> PathBuf {
        match fs::read_link(&self.staging_path) {
            Ok(target) if target.is_absolute() => target,
            Ok(target) => self.staging_path.parent().map(|p| p.join(target)).unwrap_or(self.staging_path.clone()),
            Err(_) => self.staging_path.clone(),
        }
    }

    /// `YYYY.MM.DD[.N]` auto-generated version, `.N` suffixes added on
    /// collision with an existing release row.
    fn generate_version(&self) -> String {
        let now = self.clock.now_secs();
        let base = Utc
            .timestamp_opt(now, 0)
            .single()
            .map(|dt| dt.format("%Y.%m.%d").to_string())
            .unwrap_or_else(|| now.to_string());
        if self.store.get_release_by_version(&base).is_none() {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}.{n}");
            if self.store.get_release_by_version(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    fn emit(&self, event_type: EventType, message: String, now: i64) -> EngineResult<()> {
        let id = self.store.next_event_id();
        self.events.emit(id, event_type, message, json!({}), None, None, now)?;
        Ok(())
    }
}

/// Recursively hardlinks every file from `src` into `dst`, falling back to a
/// copy on cross-device errors. Returns `(file_count, total_bytes)`.
fn hardlink_tree(src: &Path, dst: &Path) -> std::io::Result<(u64, u64)> {
    let mut file_count = 0u64;
    let mut total_bytes = 0u64;
    let mut stack = vec![PathBuf::new()];
    while let Some(rel) = stack.pop() {
        let src_dir = src.join(&rel);
        let dst_dir = dst.join(&rel);
        fs::create_dir_all(&dst_dir)?;
        for entry in fs::read_dir(&src_dir)?.flatten() {
            let path = entry.path();
            let rel_child = rel.join(entry.file_name());
            if path.is_dir() {
                stack.push(rel_child);
                continue;
            }
            let dst_file = dst.join(&rel_child);
            if fs::hard_link(&path, &dst_file).is_err() {
                fs::copy(&path, &dst_file)?;
            }
            file_count += 1;
            total_bytes += fs::metadata(&dst_file)?.len();
        }
    }
    Ok((file_count, total_bytes))
}

/// Recursively scans a release directory for `*.gpkg.tar` artifacts.
fn scan_packages(dir: &Path) -> std::io::Result<Vec<PackageEntry>> {
    let mut packages = Vec::new();
    if !dir.is_dir() {
        return Ok(packages);
    }
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current)?.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            let Some(pv) = name.strip_suffix(".gpkg.tar") else { continue };
            let category = path
                .strip_prefix(dir)
                .ok()
                .and_then(|rel| rel.components().next())
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .unwrap_or_default();
            let (package, version) = split_package_version(pv);
            let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
            packages.push(PackageEntry { category, package, version, size_bytes });
        }
    }
    Ok(packages)
}

/// Splits `pkgname-1.2.3` at the last `-<digit>` boundary, matching the
/// original's heuristic.
fn split_package_version(pv: &str) -> (String, String) {
    let bytes = pv.as_bytes();
    for i in (1..bytes.len()).rev() {
        if bytes[i - 1] == b'-' && bytes[i].is_ascii_digit() {
            return (pv[..i - 1].to_string(), pv[i..].to_string());
        }
    }
    (pv.to_string(), String::new())
}

fn write_manifest(release_dir: &Path, manifest: &ReleaseManifest) {
    let path = release_dir.join("release.json");
    if let Ok(data) = serde_json::to_vec_pretty(manifest) {
        let _ = fs::write(path, data);
    }
}

/// Atomically replaces a symlink using create-temp-link + rename, so
/// observers never see a missing or half-written target.
fn atomic_symlink(target: &Path, link_path: &Path) -> std::io::Result<()> {
    let tmp = link_path.with_extension(format!("tmp.{}", std::process::id()));
    let _ = fs::remove_file(&tmp);
    std::os::unix::fs::symlink(target, &tmp)?;
    fs::rename(&tmp, link_path)
}

#[cfg(test)]
#[path = "release_tests.rs"]
mod tests;
