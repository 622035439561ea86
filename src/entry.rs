//! File and directory entries bound to canonical paths.
//!
//! [`FileEntry`] and [`DirEntry`] share the base capability set (refresh,
//! exists, attributes, delete) through the [`Entry`] trait and an
//! [`EntryState`] each; mixed enumeration yields the [`FsEntry`] variant.
//! Every native operation goes through the entry's canonical path in its
//! extended-length form, and through the entry's retry executor.

use std::fs;

use crate::canon::{canonicalize, CanonicalPath, CaseSensitivity};
use crate::error::{Result, WidePathError};
use crate::retry::RetryExecutor;
use crate::scan::{normalize_pattern, wildcard_match, DirRecord, DirScan};
use crate::state::{EntryAttributes, EntryState, ExistsFilter};

/// Capability set shared by file and directory entries.
pub trait Entry {
    fn state(&self) -> &EntryState;
    fn state_mut(&mut self) -> &mut EntryState;

    fn path(&self) -> &CanonicalPath {
        self.state().path()
    }

    /// Re-queries native metadata, overwriting the cached snapshot.
    fn refresh(&mut self) -> Result<()> {
        self.state_mut().refresh()
    }

    /// The cached attribute snapshot, if one has been captured.
    fn attributes(&self) -> Option<EntryAttributes> {
        self.state().attributes().copied()
    }

    /// Kind-filtered existence check with snapshot semantics: queries
    /// lazily once, then answers from the snapshot until refreshed.
    fn exists(&mut self) -> bool;

    /// Removes the entry. The snapshot is left untouched and goes stale,
    /// like any other out-of-band change.
    fn delete(&mut self) -> Result<()>;
}

/// A file reference bound to a canonical path.
#[derive(Debug, Clone)]
pub struct FileEntry {
    state: EntryState,
    case: CaseSensitivity,
}

/// A directory reference bound to a canonical path.
#[derive(Debug, Clone)]
pub struct DirEntry {
    state: EntryState,
    case: CaseSensitivity,
}

/// Either entry kind, as produced by mixed enumeration.
#[derive(Debug, Clone)]
pub enum FsEntry {
    File(FileEntry),
    Dir(DirEntry),
}

impl Entry for FileEntry {
    fn state(&self) -> &EntryState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EntryState {
        &mut self.state
    }

    fn exists(&mut self) -> bool {
        self.state.exists(ExistsFilter::FileOnly)
    }

    fn delete(&mut self) -> Result<()> {
        let path = self.state.path().clone();
        self.state
            .retry()
            .run(|| fs::remove_file(path.os_path()).map_err(|e| WidePathError::for_file(e, path.resolved())))
    }
}

impl FileEntry {
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self::from_canonical(canonicalize(path)?))
    }

    pub fn from_canonical(path: CanonicalPath) -> Self {
        FileEntry { state: EntryState::new(path), case: CaseSensitivity::default() }
    }

    pub fn with_case(mut self, case: CaseSensitivity) -> Self {
        self.case = case;
        self
    }

    pub fn with_retry(mut self, retry: RetryExecutor) -> Self {
        self.state = self.state.with_retry(retry);
        self
    }

    pub fn case(&self) -> CaseSensitivity {
        self.case
    }

    /// Opens the file for reading through its extended-length form.
    pub fn open_read(&self) -> Result<fs::File> {
        let path = self.state.path();
        self.state.retry().run(|| {
            fs::OpenOptions::new()
                .read(true)
                .open(path.os_path())
                .map_err(|e| WidePathError::for_file(e, path.resolved()))
        })
    }

    /// Opens the file for writing, creating it when absent. Existing
    /// content is not truncated.
    pub fn open_write(&self) -> Result<fs::File> {
        let path = self.state.path();
        self.state.retry().run(|| {
            fs::OpenOptions::new()
                .write(true)
                .create(true)
                .open(path.os_path())
                .map_err(|e| WidePathError::for_file(e, path.resolved()))
        })
    }

    /// Renames this file to `destination` and rebinds the entry to the new
    /// path. Same-path and cross-root destinations are rejected before any
    /// filesystem mutation; a cross-root move is never degraded to
    /// copy-plus-delete at this layer.
    pub fn move_to(&mut self, destination: &str) -> Result<()> {
        let dest = canonicalize(destination)?;
        rename_guarded(self.state.path(), &dest, self.case, self.state.retry())?;
        let retry = self.state.retry().clone();
        self.state = EntryState::new(dest).with_retry(retry);
        Ok(())
    }
}

impl Entry for DirEntry {
    fn state(&self) -> &EntryState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EntryState {
        &mut self.state
    }

    fn exists(&mut self) -> bool {
        self.state.exists(ExistsFilter::DirectoryOnly)
    }

    /// Removing a directory requires it to be empty.
    fn delete(&mut self) -> Result<()> {
        let path = self.state.path().clone();
        self.state
            .retry()
            .run(|| fs::remove_dir(path.os_path()).map_err(|e| WidePathError::for_dir(e, path.resolved())))
    }
}

impl DirEntry {
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self::from_canonical(canonicalize(path)?))
    }

    pub fn from_canonical(path: CanonicalPath) -> Self {
        DirEntry { state: EntryState::new(path), case: CaseSensitivity::default() }
    }

    pub fn with_case(mut self, case: CaseSensitivity) -> Self {
        self.case = case;
        self
    }

    pub fn with_retry(mut self, retry: RetryExecutor) -> Self {
        self.state = self.state.with_retry(retry);
        self
    }

    pub fn case(&self) -> CaseSensitivity {
        self.case
    }

    /// Creates this directory and any missing ancestors.
    pub fn create(&mut self) -> Result<()> {
        let path = self.state.path().clone();
        self.state
            .retry()
            .run(|| fs::create_dir_all(path.os_path()).map_err(|e| WidePathError::for_dir(e, path.resolved())))
    }

    /// Canonicalizes `parent + relative_name` and creates it, rejecting with
    /// [`WidePathError::InvalidSubpath`] any name that resolves outside this
    /// directory, so crafted `..` sequences cannot traverse out.
    pub fn create_subdirectory(&mut self, relative_name: &str) -> Result<DirEntry> {
        let drive_prefixed = self.path().kind() != crate::canon::RootKind::Posix
            && relative_name.as_bytes().get(1) == Some(&b':');
        let rooted = relative_name.starts_with(['\\', '/']) || drive_prefixed;
        if rooted {
            return Err(WidePathError::InvalidSubpath {
                parent: self.path().to_string(),
                child: relative_name.to_string(),
            });
        }
        let child = self.path().join(relative_name)?;
        if child.eq_path(self.path(), self.case) || !self.path().contains(&child, self.case) {
            return Err(WidePathError::InvalidSubpath {
                parent: self.path().to_string(),
                child: child.to_string(),
            });
        }
        self.state
            .retry()
            .run(|| fs::create_dir_all(child.os_path()).map_err(|e| WidePathError::for_dir(e, child.resolved())))?;
        Ok(DirEntry::from_canonical(child)
            .with_case(self.case)
            .with_retry(self.state.retry().clone()))
    }

    /// Renames this directory to `destination` and rebinds the entry. Same
    /// preconditions as [`FileEntry::move_to`].
    pub fn move_to(&mut self, destination: &str) -> Result<()> {
        let dest = canonicalize(destination)?;
        rename_guarded(self.state.path(), &dest, self.case, self.state.retry())?;
        let retry = self.state.retry().clone();
        self.state = EntryState::new(dest).with_retry(retry);
        Ok(())
    }

    /// Mixed enumeration of this directory. `pattern` defaults to `*`;
    /// `recursive` descends depth-first into every subdirectory, opening one
    /// native scan per level. The returned iterator is lazy, finite, and
    /// not restartable.
    pub fn read_entries(&self, pattern: Option<&str>, recursive: bool) -> Result<EntryWalk> {
        EntryWalk::start(self.path(), pattern, recursive, WalkFilter::All, self.case)
    }

    /// Like [`read_entries`](Self::read_entries), files only.
    pub fn read_files(
        &self,
        pattern: Option<&str>,
        recursive: bool,
    ) -> Result<impl Iterator<Item = Result<FileEntry>>> {
        let walk = EntryWalk::start(self.path(), pattern, recursive, WalkFilter::Files, self.case)?;
        Ok(walk.filter_map(|item| match item {
            Ok(FsEntry::File(file)) => Some(Ok(file)),
            Ok(FsEntry::Dir(_)) => None,
            Err(e) => Some(Err(e)),
        }))
    }

    /// Like [`read_entries`](Self::read_entries), subdirectories only.
    pub fn read_dirs(
        &self,
        pattern: Option<&str>,
        recursive: bool,
    ) -> Result<impl Iterator<Item = Result<DirEntry>>> {
        let walk = EntryWalk::start(self.path(), pattern, recursive, WalkFilter::Dirs, self.case)?;
        Ok(walk.filter_map(|item| match item {
            Ok(FsEntry::Dir(dir)) => Some(Ok(dir)),
            Ok(FsEntry::File(_)) => None,
            Err(e) => Some(Err(e)),
        }))
    }
}

impl FsEntry {
    fn from_record(record: DirRecord, case: CaseSensitivity) -> Self {
        let DirRecord { path, attributes, .. } = record;
        let state = EntryState::from_snapshot(path, attributes);
        if attributes.is_directory() {
            FsEntry::Dir(DirEntry { state, case })
        } else {
            FsEntry::File(FileEntry { state, case })
        }
    }

    pub fn path(&self) -> &CanonicalPath {
        match self {
            FsEntry::File(f) => f.path(),
            FsEntry::Dir(d) => d.path(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, FsEntry::Dir(_))
    }

    pub fn attributes(&self) -> Option<EntryAttributes> {
        match self {
            FsEntry::File(f) => f.attributes(),
            FsEntry::Dir(d) => d.attributes(),
        }
    }

    pub fn into_file(self) -> Option<FileEntry> {
        match self {
            FsEntry::File(f) => Some(f),
            FsEntry::Dir(_) => None,
        }
    }

    pub fn into_dir(self) -> Option<DirEntry> {
        match self {
            FsEntry::Dir(d) => Some(d),
            FsEntry::File(_) => None,
        }
    }
}

impl Entry for FsEntry {
    fn state(&self) -> &EntryState {
        match self {
            FsEntry::File(f) => f.state(),
            FsEntry::Dir(d) => d.state(),
        }
    }

    fn state_mut(&mut self) -> &mut EntryState {
        match self {
            FsEntry::File(f) => f.state_mut(),
            FsEntry::Dir(d) => d.state_mut(),
        }
    }

    fn exists(&mut self) -> bool {
        match self {
            FsEntry::File(f) => f.exists(),
            FsEntry::Dir(d) => d.exists(),
        }
    }

    fn delete(&mut self) -> Result<()> {
        match self {
            FsEntry::File(f) => f.delete(),
            FsEntry::Dir(d) => d.delete(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkFilter {
    Files,
    Dirs,
    All,
}

/// Depth-first enumeration over one or more directory levels.
///
/// Scans are opened with `*` and the caller's pattern is applied to leaf
/// names here, so that recursion descends into every subdirectory while the
/// pattern still selects the yielded entries.
#[derive(Debug)]
pub struct EntryWalk {
    pattern: String,
    case: CaseSensitivity,
    filter: WalkFilter,
    recursive: bool,
    stack: Vec<DirScan>,
}

impl EntryWalk {
    fn start(
        dir: &CanonicalPath,
        pattern: Option<&str>,
        recursive: bool,
        filter: WalkFilter,
        case: CaseSensitivity,
    ) -> Result<EntryWalk> {
        let pattern = normalize_pattern(pattern.unwrap_or("*"))?;
        let first = DirScan::open_with(dir, "*", case)?;
        Ok(EntryWalk { pattern, case, filter, recursive, stack: vec![first] })
    }
}

impl Iterator for EntryWalk {
    type Item = Result<FsEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = self.stack.last_mut()?.next();
            match step {
                None => {
                    self.stack.pop();
                }
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(record)) => {
                    let is_dir = record.attributes().is_directory();
                    if is_dir && self.recursive {
                        match DirScan::open_with(record.path(), "*", self.case) {
                            Ok(scan) => self.stack.push(scan),
                            Err(e) => return Some(Err(e)),
                        }
                    }
                    if !wildcard_match(&self.pattern, record.name(), self.case) {
                        continue;
                    }
                    match (self.filter, is_dir) {
                        (WalkFilter::Files, true) | (WalkFilter::Dirs, false) => continue,
                        _ => {}
                    }
                    return Some(Ok(FsEntry::from_record(record, self.case)));
                }
            }
        }
    }
}

/// Shared move precondition checks plus the native rename. The checks run
/// before any mutation; on a cross-root destination nothing is touched.
fn rename_guarded(
    src: &CanonicalPath,
    dest: &CanonicalPath,
    case: CaseSensitivity,
    retry: &RetryExecutor,
) -> Result<()> {
    if src.eq_path(dest, case) {
        return Err(WidePathError::io(
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "source and destination resolve to the same path",
            ),
            src.resolved(),
        ));
    }
    if src.kind() != dest.kind() || !case.eq_str(src.root_spelling(), dest.root_spelling()) {
        return Err(WidePathError::io(
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "source and destination are on different roots",
            ),
            dest.resolved(),
        ));
    }
    retry.run(|| {
        fs::rename(src.os_path(), dest.os_path()).map_err(|e| WidePathError::io(e, src.resolved()))
    })
}
