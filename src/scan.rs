//! Lazy single-level directory enumeration.
//!
//! A [`DirScan`] wraps one native search handle and yields
//! [`DirRecord`]s on demand: finite, single-pass, not restartable.
//! Re-enumeration requires a fresh `open` and observes whatever the
//! directory contains at that point. The native handle is released on every
//! exit path. Recursive descent is composed by the caller, one open per
//! directory level.

use crate::canon::{CanonicalPath, CaseSensitivity};
use crate::error::{Result, WidePathError};
use crate::native;
use crate::state::EntryAttributes;

/// One enumerated child: its materialized canonical path (parent + leaf
/// name), the leaf name, and the attributes the native layer reported.
#[derive(Debug, Clone)]
pub struct DirRecord {
    pub(crate) path: CanonicalPath,
    pub(crate) name: String,
    pub(crate) attributes: EntryAttributes,
}

impl DirRecord {
    pub fn path(&self) -> &CanonicalPath {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &EntryAttributes {
        &self.attributes
    }
}

/// Validates a glob pattern and normalizes the quirky spellings.
///
/// An empty pattern means `*`, and `*.*` is the DOS spelling of "every
/// name", dot or not, so both normalize to `*`.
pub(crate) fn normalize_pattern(pattern: &str) -> Result<String> {
    if pattern.is_empty() || pattern == "*.*" {
        return Ok("*".to_string());
    }
    if pattern.contains(['\\', '/']) {
        return Err(WidePathError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "pattern must not contain path separators".to_string(),
        });
    }
    if pattern.contains('\0') {
        return Err(WidePathError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "pattern must not contain NUL".to_string(),
        });
    }
    Ok(pattern.to_string())
}

/// Glob match with `*` (any run) and `?` (exactly one char) semantics.
/// Iterative star backtracking, no allocation beyond the char buffers.
pub(crate) fn wildcard_match(pattern: &str, name: &str, case: CaseSensitivity) -> bool {
    let fold = |s: &str| -> Vec<char> {
        match case {
            CaseSensitivity::Sensitive => s.chars().collect(),
            CaseSensitivity::Insensitive => s.chars().flat_map(char::to_lowercase).collect(),
        }
    };
    let p = fold(pattern);
    let n = fold(name);

    let (mut pi, mut ni) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;
    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ni;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ni = mark;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Lazy sequence of directory entries for one canonicalized directory.
#[derive(Debug)]
pub struct DirScan {
    dir: CanonicalPath,
    pattern: String,
    case: CaseSensitivity,
    inner: native::NativeScan,
}

impl DirScan {
    /// Opens a native scan with the host's default case policy.
    pub fn open(dir: &CanonicalPath, pattern: &str) -> Result<DirScan> {
        Self::open_with(dir, pattern, CaseSensitivity::default())
    }

    /// Fails with `DirectoryNotFound` when the target is absent,
    /// `AccessDenied` on permission failure, and `InvalidPattern` for
    /// malformed patterns.
    pub fn open_with(dir: &CanonicalPath, pattern: &str, case: CaseSensitivity) -> Result<DirScan> {
        let pattern = normalize_pattern(pattern)?;
        let inner = native::NativeScan::open(dir)
            .map_err(|e| WidePathError::for_dir(e, dir.resolved()))?;
        Ok(DirScan { dir: dir.clone(), pattern, case, inner })
    }

    pub fn dir(&self) -> &CanonicalPath {
        &self.dir
    }
}

impl Iterator for DirScan {
    type Item = Result<DirRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next() {
                None => return None,
                Some(Err(e)) => return Some(Err(WidePathError::io(e, self.dir.resolved()))),
                Some(Ok(raw)) => {
                    // The native primitive may yield the self/parent
                    // pseudo-entries; consumers never see them.
                    if raw.name == "." || raw.name == ".." {
                        continue;
                    }
                    if !wildcard_match(&self.pattern, &raw.name, self.case) {
                        continue;
                    }
                    let path = match self.dir.join(&raw.name) {
                        Ok(p) => p,
                        Err(e) => return Some(Err(e)),
                    };
                    return Some(Ok(DirRecord {
                        path,
                        name: raw.name,
                        attributes: EntryAttributes::from_raw(raw.meta),
                    }));
                }
            }
        }
    }
}
