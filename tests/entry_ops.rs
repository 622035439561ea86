//! Entry operations against a real filesystem: enumeration, snapshot
//! semantics, create/move/delete guards.

use std::fs;
use std::path::Path;

use tempfile::tempdir;
use widepath::{DirEntry, Entry, ErrorKind, FileEntry, WidePathError};

fn dir_entry(path: &Path) -> DirEntry {
    DirEntry::new(&path.to_string_lossy()).unwrap()
}

fn file_entry(path: &Path) -> FileEntry {
    FileEntry::new(&path.to_string_lossy()).unwrap()
}

fn child_names(dir: &DirEntry) -> Vec<String> {
    let mut names: Vec<String> = dir
        .read_entries(None, false)
        .unwrap()
        .map(|e| e.unwrap().path().file_name().unwrap().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn enumeration_yields_exactly_the_real_children() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("x"), b"1").unwrap();
    fs::write(tmp.path().join("y"), b"2").unwrap();
    fs::write(tmp.path().join(".hidden"), b"3").unwrap();

    let names = child_names(&dir_entry(tmp.path()));
    assert_eq!(names, vec![".hidden", "x", "y"]);
}

#[test]
fn reenumeration_observes_external_changes() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("x"), b"1").unwrap();

    let dir = dir_entry(tmp.path());
    assert_eq!(child_names(&dir), vec!["x"]);

    fs::write(tmp.path().join("z"), b"2").unwrap();
    assert_eq!(child_names(&dir), vec!["x", "z"]);
}

#[test]
fn early_break_releases_the_directory_handle() {
    let tmp = tempdir().unwrap();
    let sub = tmp.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("a"), b"1").unwrap();
    fs::write(sub.join("b"), b"2").unwrap();

    let dir = dir_entry(&sub);
    let first = dir.read_entries(None, false).unwrap().next();
    assert!(first.is_some());

    // The scan was dropped mid-iteration; the directory must be removable.
    fs::remove_file(sub.join("a")).unwrap();
    fs::remove_file(sub.join("b")).unwrap();
    fs::remove_dir(&sub).unwrap();
}

#[test]
fn pattern_selects_files() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("a.txt"), b"").unwrap();
    fs::write(tmp.path().join("b.txt"), b"").unwrap();
    fs::write(tmp.path().join("c.log"), b"").unwrap();

    let dir = dir_entry(tmp.path());
    let txt: Vec<FileEntry> = dir
        .read_files(Some("*.txt"), false)
        .unwrap()
        .map(|f| f.unwrap())
        .collect();
    assert_eq!(txt.len(), 2);
    for f in &txt {
        assert!(f.path().file_name().unwrap().ends_with(".txt"));
    }
}

#[test]
fn recursive_enumeration_composes_per_level_scans() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("top.txt"), b"").unwrap();
    let sub = tmp.path().join("sub");
    let deep = sub.join("deep");
    fs::create_dir_all(&deep).unwrap();
    fs::write(sub.join("mid.txt"), b"").unwrap();
    fs::write(deep.join("leaf.txt"), b"").unwrap();
    fs::write(deep.join("skip.log"), b"").unwrap();

    let dir = dir_entry(tmp.path());
    let mut names: Vec<String> = dir
        .read_files(Some("*.txt"), true)
        .unwrap()
        .map(|f| f.unwrap().path().file_name().unwrap().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["leaf.txt", "mid.txt", "top.txt"]);

    // Non-recursive sees only the top level.
    let top: Vec<_> = dir.read_files(Some("*.txt"), false).unwrap().collect();
    assert_eq!(top.len(), 1);
}

#[test]
fn read_dirs_lists_subdirectories() {
    let tmp = tempdir().unwrap();
    fs::create_dir(tmp.path().join("one")).unwrap();
    fs::create_dir(tmp.path().join("two")).unwrap();
    fs::write(tmp.path().join("not_a_dir"), b"").unwrap();

    let dir = dir_entry(tmp.path());
    let mut names: Vec<String> = dir
        .read_dirs(None, false)
        .unwrap()
        .map(|d| d.unwrap().path().file_name().unwrap().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["one", "two"]);
}

#[test]
fn enumerating_a_missing_directory_fails() {
    let tmp = tempdir().unwrap();
    let dir = dir_entry(&tmp.path().join("nope"));
    let err = dir.read_entries(None, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DirectoryNotFound);
}

#[test]
fn existence_is_a_snapshot_until_refreshed() {
    let tmp = tempdir().unwrap();
    let target = tmp.path().join("late.txt");

    let mut entry = file_entry(&target);
    assert!(!entry.exists());

    // Created out-of-band: the snapshot must stay stale.
    fs::write(&target, b"now it exists").unwrap();
    assert!(!entry.exists());

    entry.refresh().unwrap();
    assert!(entry.exists());
    assert_eq!(entry.attributes().unwrap().size(), 13);
}

#[test]
fn exists_respects_the_kind_filter() {
    let tmp = tempdir().unwrap();
    let filepath = tmp.path().join("f");
    fs::write(&filepath, b"").unwrap();

    // A directory entry pointed at a file does not "exist" as a directory.
    let mut as_dir = dir_entry(&filepath);
    assert!(!as_dir.exists());
    let mut as_file = file_entry(&filepath);
    assert!(as_file.exists());
}

#[test]
fn enumerated_entries_carry_their_snapshot() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("sized"), b"hello").unwrap();
    fs::create_dir(tmp.path().join("subdir")).unwrap();

    for item in dir_entry(tmp.path()).read_entries(None, false).unwrap() {
        let entry = item.unwrap();
        let attrs = entry.attributes().unwrap();
        match entry.path().file_name().unwrap() {
            "sized" => {
                assert!(!attrs.is_directory());
                assert_eq!(attrs.size(), 5);
            }
            "subdir" => assert!(attrs.is_directory()),
            other => panic!("unexpected entry {other}"),
        }
    }
}

#[cfg(unix)]
#[test]
fn dot_names_map_to_the_hidden_bit() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join(".rc"), b"").unwrap();
    let entry = dir_entry(tmp.path())
        .read_entries(None, false)
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    assert!(entry.attributes().unwrap().is_hidden());
}

#[test]
fn move_within_a_root_renames() {
    let tmp = tempdir().unwrap();
    let src = tmp.path().join("before.txt");
    let dst = tmp.path().join("after.txt");
    fs::write(&src, b"payload").unwrap();

    let mut entry = file_entry(&src);
    entry.move_to(&dst.to_string_lossy()).unwrap();

    assert_eq!(entry.path().file_name(), Some("after.txt"));
    assert!(!src.exists());
    assert_eq!(fs::read(&dst).unwrap(), b"payload");
}

#[test]
fn move_to_same_path_is_rejected() {
    let tmp = tempdir().unwrap();
    let src = tmp.path().join("stay.txt");
    fs::write(&src, b"").unwrap();

    let mut entry = file_entry(&src);
    let err = entry.move_to(&src.to_string_lossy()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.to_string().contains("same path"), "{err}");
    assert!(src.exists());
}

#[test]
fn move_across_roots_is_rejected_without_mutation() {
    let tmp = tempdir().unwrap();
    let src = tmp.path().join("rooted.txt");
    fs::write(&src, b"untouched").unwrap();

    let mut entry = file_entry(&src);
    let err = entry.move_to(r"\\srv\share\rooted.txt").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.to_string().contains("different roots"), "{err}");

    // No partial move, no copy+delete fallback.
    assert_eq!(fs::read(&src).unwrap(), b"untouched");
    assert_eq!(entry.path().file_name(), Some("rooted.txt"));
}

#[test]
fn create_subdirectory_stays_inside_the_parent() {
    let tmp = tempdir().unwrap();
    let mut dir = dir_entry(tmp.path());

    let mut child = dir.create_subdirectory("nested/inner").unwrap();
    assert!(child.exists());
    assert!(tmp.path().join("nested/inner").is_dir());
}

#[test]
fn create_subdirectory_rejects_traversal() {
    let tmp = tempdir().unwrap();
    let mut dir = dir_entry(tmp.path());

    for bad in ["../escape", "ok/../../escape", "/absolute"] {
        let err = dir.create_subdirectory(bad).unwrap_err();
        assert!(
            matches!(err, WidePathError::InvalidSubpath { .. } | WidePathError::InvalidPath { .. }),
            "{bad}: {err}"
        );
    }
    assert!(!tmp.path().parent().unwrap().join("escape").exists());
}

#[test]
fn delete_file_and_empty_directory() {
    let tmp = tempdir().unwrap();
    let f = tmp.path().join("gone.txt");
    fs::write(&f, b"").unwrap();
    let d = tmp.path().join("hollow");
    fs::create_dir(&d).unwrap();

    file_entry(&f).delete().unwrap();
    assert!(!f.exists());

    dir_entry(&d).delete().unwrap();
    assert!(!d.exists());
}

#[test]
fn deleting_a_missing_file_reports_not_found() {
    let tmp = tempdir().unwrap();
    let err = file_entry(&tmp.path().join("ghost")).delete().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);
}

#[test]
fn open_read_and_write_round_trip() {
    use std::io::{Read, Write};

    let tmp = tempdir().unwrap();
    let f = tmp.path().join("stream.bin");

    let entry = file_entry(&f);
    entry.open_write().unwrap().write_all(b"through the canonical form").unwrap();

    let mut buf = String::new();
    entry.open_read().unwrap().read_to_string(&mut buf).unwrap();
    assert_eq!(buf, "through the canonical form");
}
