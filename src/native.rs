//! Native filesystem primitives behind one set of types.
//!
//! On Windows the attribute query and find-first/find-next primitives are
//! invoked directly through `windows-sys`, always with the extended-length
//! form of the canonical path, never through the length-limited code path.
//! On other platforms the same surface is backed by `std::fs`, with Windows
//! attribute bits synthesized from POSIX metadata so call sites stay
//! identical across OSes.

use std::io;
use std::time::SystemTime;

use crate::canon::CanonicalPath;
use crate::state::EntryAttributes;

/// Result of one successful native metadata query. Absence of a timestamp
/// means the platform did not report one.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawMetadata {
    pub flags: u32,
    pub size: u64,
    pub created: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
    pub modified: Option<SystemTime>,
}

/// One raw directory entry: leaf name plus metadata, no parent path.
#[derive(Debug, Clone)]
pub(crate) struct RawDirRecord {
    pub name: String,
    pub meta: RawMetadata,
}

#[cfg(windows)]
pub(crate) use windows_impl::{query_attributes, NativeScan};

#[cfg(not(windows))]
pub(crate) use unix_impl::{query_attributes, NativeScan};

#[cfg(windows)]
mod windows_impl {
    use super::*;

    use windows_sys::Win32::Foundation::{
        ERROR_FILE_NOT_FOUND, ERROR_NO_MORE_FILES, FILETIME, HANDLE, INVALID_HANDLE_VALUE,
    };
    use windows_sys::Win32::Storage::FileSystem::{
        FindClose, FindFirstFileW, FindNextFileW, GetFileAttributesExW, GetFileExInfoStandard,
        WIN32_FILE_ATTRIBUTE_DATA, WIN32_FIND_DATAW,
    };

    /// Seconds between 1601-01-01 and the Unix epoch.
    const FILETIME_UNIX_OFFSET_SECS: u64 = 11_644_473_600;
    const TICKS_PER_SEC: u64 = 10_000_000;

    fn wide_nul(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    fn filetime_to_system(ft: FILETIME) -> Option<SystemTime> {
        let ticks = ((ft.dwHighDateTime as u64) << 32) | ft.dwLowDateTime as u64;
        if ticks == 0 {
            return None;
        }
        let offset_ticks = FILETIME_UNIX_OFFSET_SECS * TICKS_PER_SEC;
        if ticks >= offset_ticks {
            let d = ticks - offset_ticks;
            Some(
                SystemTime::UNIX_EPOCH
                    + std::time::Duration::new(d / TICKS_PER_SEC, ((d % TICKS_PER_SEC) * 100) as u32),
            )
        } else {
            let d = offset_ticks - ticks;
            Some(
                SystemTime::UNIX_EPOCH
                    - std::time::Duration::new(d / TICKS_PER_SEC, ((d % TICKS_PER_SEC) * 100) as u32),
            )
        }
    }

    pub(crate) fn query_attributes(path: &CanonicalPath) -> io::Result<RawMetadata> {
        let wide = wide_nul(path.resolved());
        let mut data: WIN32_FILE_ATTRIBUTE_DATA = unsafe { std::mem::zeroed() };
        let ok = unsafe {
            GetFileAttributesExW(
                wide.as_ptr(),
                GetFileExInfoStandard,
                &mut data as *mut WIN32_FILE_ATTRIBUTE_DATA as *mut core::ffi::c_void,
            )
        };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(RawMetadata {
            flags: data.dwFileAttributes,
            size: ((data.nFileSizeHigh as u64) << 32) | data.nFileSizeLow as u64,
            created: filetime_to_system(data.ftCreationTime),
            accessed: filetime_to_system(data.ftLastAccessTime),
            modified: filetime_to_system(data.ftLastWriteTime),
        })
    }

    /// Owns one Win32 search handle. `FindClose` runs on drop, so the handle
    /// is released on completion, early break, and mid-iteration errors
    /// alike. Single-pass; a fresh scan requires a fresh open.
    pub(crate) struct NativeScan {
        handle: HANDLE,
        first: Option<WIN32_FIND_DATAW>,
        finished: bool,
    }

    impl std::fmt::Debug for NativeScan {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("NativeScan")
                .field("handle", &self.handle)
                .field("finished", &self.finished)
                .finish_non_exhaustive()
        }
    }

    impl NativeScan {
        pub(crate) fn open(dir: &CanonicalPath) -> io::Result<NativeScan> {
            let mut spec = dir.resolved().to_string();
            if !spec.ends_with('\\') {
                spec.push('\\');
            }
            spec.push('*');

            let wide = wide_nul(&spec);
            let mut data: WIN32_FIND_DATAW = unsafe { std::mem::zeroed() };
            let handle = unsafe { FindFirstFileW(wide.as_ptr(), &mut data) };
            if handle == INVALID_HANDLE_VALUE {
                let err = io::Error::last_os_error();
                // No matches in an existing directory is an empty scan, not
                // a failure.
                if err.raw_os_error() == Some(ERROR_FILE_NOT_FOUND as i32) {
                    return Ok(NativeScan { handle: INVALID_HANDLE_VALUE, first: None, finished: true });
                }
                return Err(err);
            }
            Ok(NativeScan { handle, first: Some(data), finished: false })
        }

        fn record_from(data: &WIN32_FIND_DATAW) -> RawDirRecord {
            let len = data.cFileName.iter().position(|&c| c == 0).unwrap_or(data.cFileName.len());
            RawDirRecord {
                name: String::from_utf16_lossy(&data.cFileName[..len]),
                meta: RawMetadata {
                    flags: data.dwFileAttributes,
                    size: ((data.nFileSizeHigh as u64) << 32) | data.nFileSizeLow as u64,
                    created: filetime_to_system(data.ftCreationTime),
                    accessed: filetime_to_system(data.ftLastAccessTime),
                    modified: filetime_to_system(data.ftLastWriteTime),
                },
            }
        }
    }

    impl Iterator for NativeScan {
        type Item = io::Result<RawDirRecord>;

        fn next(&mut self) -> Option<Self::Item> {
            if self.finished {
                return None;
            }
            if let Some(data) = self.first.take() {
                return Some(Ok(Self::record_from(&data)));
            }
            let mut data: WIN32_FIND_DATAW = unsafe { std::mem::zeroed() };
            let ok = unsafe { FindNextFileW(self.handle, &mut data) };
            if ok == 0 {
                self.finished = true;
                let err = io::Error::last_os_error();
                if err.raw_os_error() == Some(ERROR_NO_MORE_FILES as i32) {
                    return None;
                }
                return Some(Err(err));
            }
            Some(Ok(Self::record_from(&data)))
        }
    }

    impl Drop for NativeScan {
        fn drop(&mut self) {
            if self.handle != INVALID_HANDLE_VALUE {
                unsafe { FindClose(self.handle) };
            }
        }
    }
}

#[cfg(not(windows))]
mod unix_impl {
    use super::*;

    fn raw_from_std(meta: &std::fs::Metadata, leaf: &str) -> RawMetadata {
        let mut flags = 0u32;
        if meta.is_dir() {
            flags |= EntryAttributes::DIRECTORY;
        }
        if meta.file_type().is_symlink() {
            flags |= EntryAttributes::REPARSE_POINT;
        }
        if meta.permissions().readonly() {
            flags |= EntryAttributes::READONLY;
        }
        // Dot names are the POSIX spelling of the hidden bit.
        if leaf.starts_with('.') {
            flags |= EntryAttributes::HIDDEN;
        }
        if flags == 0 {
            flags = EntryAttributes::NORMAL;
        }
        RawMetadata {
            flags,
            size: meta.len(),
            created: meta.created().ok(),
            accessed: meta.accessed().ok(),
            modified: meta.modified().ok(),
        }
    }

    pub(crate) fn query_attributes(path: &CanonicalPath) -> io::Result<RawMetadata> {
        let meta = std::fs::symlink_metadata(path.os_path())?;
        Ok(raw_from_std(&meta, path.file_name().unwrap_or("")))
    }

    /// `std::fs::ReadDir` already owns its directory handle and releases it
    /// on drop, which gives the same release-on-every-exit-path guarantee as
    /// the Win32 search handle.
    #[derive(Debug)]
    pub(crate) struct NativeScan {
        inner: std::fs::ReadDir,
    }

    impl NativeScan {
        pub(crate) fn open(dir: &CanonicalPath) -> io::Result<NativeScan> {
            Ok(NativeScan { inner: std::fs::read_dir(dir.os_path())? })
        }
    }

    impl Iterator for NativeScan {
        type Item = io::Result<RawDirRecord>;

        fn next(&mut self) -> Option<Self::Item> {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            // DirEntry::metadata does not traverse symlinks, matching the
            // Windows query which reports the reparse point itself.
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => return Some(Err(e)),
            };
            Some(Ok(RawDirRecord { meta: raw_from_std(&meta, &name), name }))
        }
    }
}
