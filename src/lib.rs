//! # widepath
//!
//! A long-path-safe filesystem access layer. Paths are canonicalized into
//! extended-length-marked absolute strings (`\\?\C:\...`,
//! `\\?\UNC\server\share\...`) and that exact form is handed to every native
//! call, which is what bypasses the legacy 260-character ceiling. The rest of
//! the crate is a drop-in hierarchical file/directory surface over that form:
//! existence checks, refreshable metadata snapshots, lazy enumeration, and
//! create/move/delete, with a bounded-retry wrapper for transient failures.
//!
//! ## Key Modules
//!
//! - [`canon`]: pure path canonicalization and the [`CanonicalPath`] value.
//! - [`retry`]: bounded retry around native calls, with an injectable sink.
//! - [`scan`]: lazy single-level directory enumeration over a native handle.
//! - [`state`]: the refreshable metadata snapshot shared by entry kinds.
//! - [`entry`]: [`FileEntry`] / [`DirEntry`] operations built on the above.
//!
//! ## Known limitations
//!
//! These are platform realities, documented rather than papered over:
//!
//! - The process current directory cannot be set to an extended-length path;
//!   the Win32 loader caps it at the legacy limit. This crate offers no such
//!   operation and no emulation of one.
//! - Drive-relative paths (`X:sub`) depend on per-drive working-directory
//!   state that has no extended-length form; canonicalization rejects them.
//! - A single [`EntryState`] is not safe for concurrent mutation; synchronize
//!   externally or use distinct instances, which share nothing.
//! - Native calls block; there is no cancellation primitive at this layer.
//!   Callers needing timeouts must enforce them above it.

pub mod canon;
pub mod entry;
pub mod error;
pub mod retry;
pub mod scan;
pub mod state;

mod native;

pub use canon::{canonicalize, CanonicalPath, CaseSensitivity, RootKind};
pub use entry::{DirEntry, Entry, EntryWalk, FileEntry, FsEntry};
pub use error::{ErrorKind, Result, WidePathError};
pub use retry::{RetryExecutor, RetryPolicy, RetrySink, TracingSink};
pub use scan::{DirRecord, DirScan};
pub use state::{EntryAttributes, EntryState, ExistsFilter};
