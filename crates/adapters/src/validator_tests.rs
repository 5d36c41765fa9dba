// SPDX-License-Identifier: MIT

use super::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn virtual_category_is_skipped() {
    assert!(is_virtual_atom("=virtual/jpeg-0"));
    assert!(!is_virtual_atom("=dev-libs/openssl-3.0.0"));
}

#[test]
fn virtual_marker_atoms_are_skipped() {
    assert!(is_virtual_atom("=sys-devel/clang-rtlib-config-18"));
    assert!(is_virtual_atom("=dev-lang/eselect-ruby-20230306"));
    assert!(is_virtual_atom("=app-crypt/openpgp-keys-foo-1"));
    assert!(is_virtual_atom("=app-misc/foo-meta-1"));
}

#[test]
fn finds_nested_layout() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let pkg_dir = root.join("dev-libs").join("openssl");
    fs::create_dir_all(&pkg_dir).unwrap();
    let artifact = pkg_dir.join("openssl-3.0.0-1.gpkg.tar");
    fs::write(&artifact, vec![0u8; 2048]).unwrap();

    let found = find_valid_artifact(&[root], "=dev-libs/openssl-3.0.0").unwrap();
    assert_eq!(found, Some(artifact));
}

#[test]
fn finds_flat_layout() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let cat_dir = root.join("dev-libs");
    fs::create_dir_all(&cat_dir).unwrap();
    let artifact = cat_dir.join("openssl-3.0.0-1.gpkg.tar");
    fs::write(&artifact, vec![0u8; 2048]).unwrap();

    let found = find_valid_artifact(&[root], "=dev-libs/openssl-3.0.0").unwrap();
    assert_eq!(found, Some(artifact));
}

#[test]
fn undersized_artifact_is_deleted_and_not_found() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let cat_dir = root.join("dev-libs");
    fs::create_dir_all(&cat_dir).unwrap();
    let artifact = cat_dir.join("openssl-3.0.0-1.gpkg.tar");
    fs::write(&artifact, vec![0u8; 1023]).unwrap();

    let found = find_valid_artifact(&[root], "=dev-libs/openssl-3.0.0").unwrap();
    assert_eq!(found, None);
    assert!(!artifact.exists());
}

#[test]
fn boundary_1024_bytes_is_valid() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let cat_dir = root.join("dev-libs");
    fs::create_dir_all(&cat_dir).unwrap();
    let artifact = cat_dir.join("openssl-3.0.0-1.gpkg.tar");
    fs::write(&artifact, vec![0u8; 1024]).unwrap();

    let found = find_valid_artifact(&[root], "=dev-libs/openssl-3.0.0").unwrap();
    assert_eq!(found, Some(artifact));
}

#[test]
fn falls_back_to_second_root() {
    let dir = tempdir().unwrap();
    let staging = dir.path().join("staging");
    let binhost = dir.path().join("binhost");
    fs::create_dir_all(binhost.join("dev-libs")).unwrap();
    let artifact = binhost.join("dev-libs").join("openssl-3.0.0-1.gpkg.tar");
    fs::write(&artifact, vec![0u8; 2048]).unwrap();

    let found = find_valid_artifact(&[staging, binhost], "=dev-libs/openssl-3.0.0").unwrap();
    assert_eq!(found, Some(artifact));
}

#[test]
fn missing_directories_yield_none() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let found = find_valid_artifact(&[root], "=dev-libs/openssl-3.0.0").unwrap();
    assert_eq!(found, None);
}
