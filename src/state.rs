//! Refreshable filesystem-entry metadata.
//!
//! An [`EntryState`] owns one canonical path and a snapshot of its native
//! attributes. The snapshot is lazy: nothing is queried until the first
//! `exists()` call or an explicit `refresh()`. Once populated it is a
//! snapshot in the strict sense; it goes stale the moment the underlying
//! entry changes and stays stale until the caller refreshes again.
//!
//! A single `EntryState` is not safe for concurrent mutation from multiple
//! threads; callers needing that must synchronize externally. Distinct
//! instances share nothing and are independently safe.

use std::time::SystemTime;

use crate::canon::CanonicalPath;
use crate::error::{ErrorKind, Result, WidePathError};
use crate::native::{self, RawMetadata};
use crate::retry::RetryExecutor;

/// Attribute bit-set plus timestamps and size, as reported by one
/// successful native metadata query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryAttributes {
    flags: u32,
    size: u64,
    created: Option<SystemTime>,
    accessed: Option<SystemTime>,
    modified: Option<SystemTime>,
}

impl EntryAttributes {
    pub const READONLY: u32 = 0x0000_0001;
    pub const HIDDEN: u32 = 0x0000_0002;
    pub const SYSTEM: u32 = 0x0000_0004;
    pub const DIRECTORY: u32 = 0x0000_0010;
    pub const NORMAL: u32 = 0x0000_0080;
    pub const REPARSE_POINT: u32 = 0x0000_0400;

    pub(crate) fn from_raw(raw: RawMetadata) -> Self {
        EntryAttributes {
            flags: raw.flags,
            size: raw.size,
            created: raw.created,
            accessed: raw.accessed,
            modified: raw.modified,
        }
    }

    /// The raw platform attribute bits.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn is_directory(&self) -> bool {
        self.flags & Self::DIRECTORY != 0
    }

    pub fn is_readonly(&self) -> bool {
        self.flags & Self::READONLY != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.flags & Self::HIDDEN != 0
    }

    pub fn is_system(&self) -> bool {
        self.flags & Self::SYSTEM != 0
    }

    pub fn is_reparse_point(&self) -> bool {
        self.flags & Self::REPARSE_POINT != 0
    }

    /// Size in bytes; zero for directories on most filesystems.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn created(&self) -> Option<SystemTime> {
        self.created
    }

    pub fn accessed(&self) -> Option<SystemTime> {
        self.accessed
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

/// Entry-kind filter for existence checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistsFilter {
    Any,
    FileOnly,
    DirectoryOnly,
}

#[derive(Debug, Clone)]
enum Lifecycle {
    Uninitialized,
    Initialized(EntryAttributes),
    /// The native query reported not-found or denied. Treated as "does not
    /// exist" by existence checks, not as a fault.
    Missing,
}

/// Lazily populated, explicitly refreshable metadata for one canonical path.
#[derive(Debug, Clone)]
pub struct EntryState {
    path: CanonicalPath,
    lifecycle: Lifecycle,
    retry: RetryExecutor,
}

impl EntryState {
    pub fn new(path: CanonicalPath) -> Self {
        EntryState { path, lifecycle: Lifecycle::Uninitialized, retry: RetryExecutor::direct() }
    }

    /// Built from an enumeration record whose attributes are already known.
    pub(crate) fn from_snapshot(path: CanonicalPath, attributes: EntryAttributes) -> Self {
        EntryState {
            path,
            lifecycle: Lifecycle::Initialized(attributes),
            retry: RetryExecutor::direct(),
        }
    }

    pub fn with_retry(mut self, retry: RetryExecutor) -> Self {
        self.retry = retry;
        self
    }

    pub fn path(&self) -> &CanonicalPath {
        &self.path
    }

    pub(crate) fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    /// Re-runs the native metadata query and overwrites the snapshot
    /// wholesale. Not-found and denied are recorded as the missing state and
    /// return `Ok`; any other native failure propagates.
    pub fn refresh(&mut self) -> Result<()> {
        let path = self.path.clone();
        let outcome = self.retry.run(|| {
            native::query_attributes(&path).map_err(|e| WidePathError::for_file(e, path.resolved()))
        });
        match outcome {
            Ok(raw) => {
                self.lifecycle = Lifecycle::Initialized(EntryAttributes::from_raw(raw));
                Ok(())
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::FileNotFound
                        | ErrorKind::DirectoryNotFound
                        | ErrorKind::AccessDenied
                ) =>
            {
                self.lifecycle = Lifecycle::Missing;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// The current snapshot, or `None` when not yet queried or missing.
    pub fn attributes(&self) -> Option<&EntryAttributes> {
        match &self.lifecycle {
            Lifecycle::Initialized(attrs) => Some(attrs),
            _ => None,
        }
    }

    /// Existence under the given kind filter.
    ///
    /// Triggers an implicit `refresh()` only when nothing has been queried
    /// yet. After that the answer comes from the snapshot, however stale,
    /// until the caller refreshes explicitly.
    pub fn exists(&mut self, filter: ExistsFilter) -> bool {
        if matches!(self.lifecycle, Lifecycle::Uninitialized) {
            if let Err(err) = self.refresh() {
                tracing::debug!(path = %self.path, error = %err, "metadata query failed, treating entry as absent");
                self.lifecycle = Lifecycle::Missing;
            }
        }
        match &self.lifecycle {
            Lifecycle::Initialized(attrs) => match filter {
                ExistsFilter::Any => true,
                ExistsFilter::FileOnly => !attrs.is_directory(),
                ExistsFilter::DirectoryOnly => attrs.is_directory(),
            },
            _ => false,
        }
    }
}
