// SPDX-License-Identifier: MIT

//! Binary artifact validator.

use std::path::{Path, PathBuf};

pub const MIN_ARTIFACT_BYTES: u64 = 1024;

const VIRTUAL_ATOM_MARKERS: &[&str] =
    &["clang-rtlib-config", "eselect-ruby", "openpgp-keys-", "-meta-"];

/// True if `atom` should skip binary validation entirely (virtual packages
/// never produce a build artifact).
pub fn is_virtual_atom(atom: &str) -> bool {
    if atom.trim_start_matches('=').starts_with("virtual/") {
        return true;
    }
    VIRTUAL_ATOM_MARKERS.iter().any(|m| atom.contains(m))
}

/// Splits `=category/pkg-version` into `(category, pkg, version)` best-effort.
fn split_atom(atom: &str) -> Option<(&str, &str, &str)> {
    let atom = atom.trim_start_matches('=');
    let (category, rest) = atom.split_once('/')?;
    // version is the trailing `-<digits...>` component; find last '-' that
    // looks like the start of a version.
    let dash = rest.rfind('-')?;
    let (pkg, version) = rest.split_at(dash);
    Some((category, pkg, &version[1..]))
}

/// Searches each root for both nested (`{cat}/{pkg}/{pv}*.gpkg.tar`) and flat
/// (`{cat}/{pv}*.gpkg.tar`) layouts. Returns the first matching path whose
/// size is >= [`MIN_ARTIFACT_BYTES`]. Undersized candidates are deleted and
/// do not satisfy the search.
pub fn find_valid_artifact(roots: &[PathBuf], atom: &str) -> std::io::Result<Option<PathBuf>> {
    let Some((category, pkg, version)) = split_atom(atom) else { return Ok(None) };
    let pv = format!("{pkg}-{version}");
    for root in roots {
        let nested_dir = root.join(category).join(pkg);
        if let Some(found) = scan_dir_for_prefix(&nested_dir, &pv)? {
            return Ok(Some(found));
        }
        let flat_dir = root.join(category);
        if let Some(found) = scan_dir_for_prefix(&flat_dir, &pv)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

fn scan_dir_for_prefix(dir: &Path, pv_prefix: &str) -> std::io::Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(pv_prefix) || !name.ends_with(".gpkg.tar") {
            continue;
        }
        let path = entry.path();
        let size = entry.metadata()?.len();
        if size >= MIN_ARTIFACT_BYTES {
            return Ok(Some(path));
        }
        // Undersized: remove it so it doesn't linger as a false positive.
        let _ = std::fs::remove_file(&path);
    }
    Ok(None)
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
