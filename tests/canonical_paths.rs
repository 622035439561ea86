//! Pure canonicalization properties. These run on every platform: the
//! canonicalizer is string logic and always understands Windows path syntax.

use widepath::{canonicalize, CaseSensitivity, RootKind, WidePathError};

#[test]
fn canonicalization_is_idempotent() {
    let inputs = [
        r"C:\Users\someone\deeply\nested\file.txt",
        r"C:\a\.\b\..\c",
        r"\\server\share\dir\leaf",
        r"\\?\C:\already\marked",
        r"\\?\UNC\server\share\x",
        "/var/log/syslog",
    ];
    for input in inputs {
        let once = canonicalize(input).unwrap();
        let twice = canonicalize(once.resolved()).unwrap();
        assert_eq!(once, twice, "not a fixed point: {input}");
        assert_eq!(once.resolved(), twice.resolved());
    }
}

#[test]
fn traversal_escaping_the_root_fails() {
    let err = canonicalize(r"C:\a\..\..\b").unwrap_err();
    assert!(matches!(err, WidePathError::InvalidPath { .. }));
}

#[test]
fn traversal_within_the_root_resolves() {
    let resolved = canonicalize(r"C:\a\b\..").unwrap();
    assert_eq!(resolved, canonicalize(r"C:\a").unwrap());
    assert_eq!(resolved.resolved(), r"\\?\C:\a");
}

#[test]
fn trailing_separator_does_not_change_identity() {
    let with = canonicalize(r"C:\a\").unwrap();
    let without = canonicalize(r"C:\a").unwrap();
    assert_eq!(with.file_name(), without.file_name());
    assert!(with.eq_path(&without, CaseSensitivity::Insensitive));
    assert_eq!(with, without);
    // Presence of the separator survives as a display property.
    assert!(with.has_trailing_separator());
    assert!(!without.has_trailing_separator());
}

#[test]
fn root_classification() {
    assert_eq!(canonicalize(r"C:\x").unwrap().kind(), RootKind::Drive);
    assert_eq!(canonicalize(r"\\srv\share").unwrap().kind(), RootKind::Unc);
    assert_eq!(canonicalize(r"\\.\NUL").unwrap().kind(), RootKind::Device);
    assert_eq!(canonicalize("/x").unwrap().kind(), RootKind::Posix);
    assert_eq!(canonicalize("plain_relative").unwrap().kind(), {
        // Resolves against the host cwd, so the kind matches the host.
        canonicalize(&std::env::current_dir().unwrap().to_string_lossy())
            .unwrap()
            .kind()
    });
}

#[test]
fn marker_forms_differ_by_root_family() {
    assert_eq!(canonicalize(r"C:\a\b").unwrap().resolved(), r"\\?\C:\a\b");
    assert_eq!(
        canonicalize(r"\\server\share\a").unwrap().resolved(),
        r"\\?\UNC\server\share\a"
    );
}

#[test]
fn reserved_names_are_allowed_in_extended_form() {
    // The extended-length form bypasses legacy name reservation; `CON`,
    // `NUL` and friends are plain names here.
    let p = canonicalize(r"C:\dir\CON").unwrap();
    assert_eq!(p.file_name(), Some("CON"));
}

#[test]
fn very_long_paths_canonicalize() {
    let mut long = String::from(r"C:\base");
    for i in 0..120 {
        long.push_str(&format!(r"\segment_with_some_width_{i:04}"));
    }
    assert!(long.len() > 3000);
    let p = canonicalize(&long).unwrap();
    assert!(p.resolved().starts_with(r"\\?\C:\base"));
    assert_eq!(p.segments().count(), 121);
}
