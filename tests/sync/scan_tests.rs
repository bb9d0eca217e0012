// Tests for tree snapshots
// Covers recursive enumeration, relative keys, excludes, and the skip path

use std::fs;
use std::path::{Path, PathBuf};

use foldersync::sync::{scan_tree, ExcludePatterns};

#[test]
fn test_nested_files_keyed_by_relative_path() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("sub/deeper")).unwrap();
    fs::write(root.join("top.txt"), b"top").unwrap();
    fs::write(root.join("sub/mid.txt"), b"mid").unwrap();
    fs::write(root.join("sub/deeper/leaf.txt"), b"leaf").unwrap();

    let entries = scan_tree(root, &ExcludePatterns::new(), None).unwrap();

    assert_eq!(entries.len(), 3);
    assert!(entries.contains_key(Path::new("top.txt")));
    assert!(entries.contains_key(Path::new("sub/mid.txt")));
    assert!(entries.contains_key(Path::new("sub/deeper/leaf.txt")));

    let leaf = &entries[&PathBuf::from("sub/deeper/leaf.txt")];
    assert_eq!(leaf.absolute, root.join("sub/deeper/leaf.txt"));
}

#[test]
fn test_directories_are_not_entries() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("empty/inner")).unwrap();
    fs::write(root.join("only.txt"), b"x").unwrap();

    let entries = scan_tree(root, &ExcludePatterns::new(), None).unwrap();

    assert_eq!(entries.len(), 1);
    assert!(entries.contains_key(Path::new("only.txt")));
}

#[test]
fn test_empty_tree_yields_empty_map() {
    let dir = tempfile::tempdir().unwrap();

    let entries = scan_tree(dir.path(), &ExcludePatterns::new(), None).unwrap();

    assert!(entries.is_empty());
}

#[test]
fn test_missing_root_is_an_error() {
    let result = scan_tree(
        Path::new("/nonexistent/foldersync/root"),
        &ExcludePatterns::new(),
        None,
    );

    assert!(result.is_err());
}

#[test]
fn test_hidden_files_are_included() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join(".hidden"), b"dot").unwrap();

    let entries = scan_tree(root, &ExcludePatterns::new(), None).unwrap();

    assert!(entries.contains_key(Path::new(".hidden")));
}

#[test]
fn test_excluded_paths_are_left_out() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("keep.txt"), b"keep").unwrap();
    fs::write(root.join("skip.log"), b"skip").unwrap();

    let exclude = ExcludePatterns::from_patterns(&["*.log"]).unwrap();
    let entries = scan_tree(root, &exclude, None).unwrap();

    assert_eq!(entries.len(), 1);
    assert!(entries.contains_key(Path::new("keep.txt")));
}

#[test]
fn test_skip_path_is_left_out() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("data.txt"), b"data").unwrap();
    fs::write(root.join("sync.log"), b"log").unwrap();

    let skip = root.join("sync.log");
    let entries = scan_tree(root, &ExcludePatterns::new(), Some(&skip)).unwrap();

    assert_eq!(entries.len(), 1);
    assert!(entries.contains_key(Path::new("data.txt")));
}
