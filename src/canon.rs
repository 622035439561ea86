//! Path canonicalization: pure string transformation of arbitrary
//! relative/absolute/UNC input into an extended-length-safe absolute form.
//!
//! The resolved form of a [`CanonicalPath`] is exactly what gets handed to
//! every native call. Drive-absolute paths come out as `\\?\C:\...` and UNC
//! paths as `\\?\UNC\server\share\...`, which is the prefix convention that
//! lets the native layer bypass its legacy length ceiling. Device-rooted
//! (`\\.\...`) and POSIX-absolute paths carry no marker. No I/O happens here;
//! only relative input touches the process working directory.

use std::fmt;
use std::path::Path;

use crate::error::{Result, WidePathError};

/// Extended-length marker for drive-absolute paths.
pub const EXTENDED_PREFIX: &str = r"\\?\";
/// Extended-length marker form for UNC paths.
pub const EXTENDED_UNC_PREFIX: &str = r"\\?\UNC\";

const DEVICE_PREFIX_LEN: usize = 4; // r"\\.\"

/// Hard ceiling of the extended-length form, in UTF-16 code units.
const MAX_EXTENDED_UTF16: usize = 32_760;

/// Characters the platform forbids inside a path segment.
const INVALID_NAME_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Which family of filesystem root a canonical path is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKind {
    /// `X:\...`, canonicalized to `\\?\X:\...`.
    Drive,
    /// `\\server\share\...`, canonicalized to `\\?\UNC\server\share\...`.
    Unc,
    /// `\\.\device\...`, passed through unmodified.
    Device,
    /// `/...` on POSIX hosts; no marker, there is no ceiling to bypass.
    Posix,
}

/// Case policy for path equality and containment checks.
///
/// Never hardwired: the default matches the host convention, but callers on
/// case-sensitive mounts (or tests) can override it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSensitivity {
    Sensitive,
    Insensitive,
}

impl Default for CaseSensitivity {
    fn default() -> Self {
        if cfg!(windows) {
            CaseSensitivity::Insensitive
        } else {
            CaseSensitivity::Sensitive
        }
    }
}

impl CaseSensitivity {
    pub fn eq_str(self, a: &str, b: &str) -> bool {
        match self {
            CaseSensitivity::Sensitive => a == b,
            CaseSensitivity::Insensitive => eq_fold(a, b),
        }
    }
}

/// Case-insensitive comparison by simple per-char case folding.
fn eq_fold(a: &str, b: &str) -> bool {
    let mut ai = a.chars().flat_map(char::to_lowercase);
    let mut bi = b.chars().flat_map(char::to_lowercase);
    loop {
        match (ai.next(), bi.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if x == y => {}
            _ => return false,
        }
    }
}

/// An immutable, fully resolved, extended-length-safe absolute path.
///
/// Identity is the resolved form plus root classification; the original
/// input string is kept for diagnostics only and does not participate in
/// equality. Canonicalizing the resolved form of a `CanonicalPath` yields an
/// equal value.
#[derive(Debug, Clone)]
pub struct CanonicalPath {
    input: String,
    resolved: String,
    kind: RootKind,
    /// Byte offset in `resolved` where the segment region begins.
    root_end: usize,
    relative_input: bool,
    trailing_sep: bool,
}

impl PartialEq for CanonicalPath {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.resolved == other.resolved
    }
}

impl Eq for CanonicalPath {}

impl fmt::Display for CanonicalPath {
    /// Displays the unmarked form; the marker is an invocation detail.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RootKind::Drive => f.write_str(&self.resolved[EXTENDED_PREFIX.len()..]),
            RootKind::Unc => write!(f, r"\\{}", &self.resolved[EXTENDED_UNC_PREFIX.len()..]),
            RootKind::Device | RootKind::Posix => f.write_str(&self.resolved),
        }
    }
}

impl CanonicalPath {
    /// The original string this value was canonicalized from.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The fully resolved, marker-applied absolute form. This exact string
    /// is what every native call receives.
    pub fn resolved(&self) -> &str {
        &self.resolved
    }

    pub fn kind(&self) -> RootKind {
        self.kind
    }

    /// Whether the input had no root of its own and was resolved against
    /// the process working directory.
    pub fn is_relative_input(&self) -> bool {
        self.relative_input
    }

    /// Whether the input carried an explicit trailing separator. Display
    /// property only; it never changes identity or leaf-name derivation.
    pub fn has_trailing_separator(&self) -> bool {
        self.trailing_sep
    }

    /// Canonical separator of this path's root family.
    pub fn sep_char(&self) -> char {
        match self.kind {
            RootKind::Posix => '/',
            _ => '\\',
        }
    }

    /// The root spelling used for cross-root comparisons: `C:` for drive
    /// paths, `server\share` for UNC, the device prefix for device paths,
    /// `/` for POSIX.
    pub fn root_spelling(&self) -> &str {
        match self.kind {
            RootKind::Drive => &self.resolved[EXTENDED_PREFIX.len()..self.root_end],
            RootKind::Unc => &self.resolved[EXTENDED_UNC_PREFIX.len()..self.root_end],
            RootKind::Device | RootKind::Posix => &self.resolved[..self.root_end],
        }
    }

    /// Path segments after the root, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        let sep = self.sep_char();
        self.resolved[self.root_end..]
            .split(sep)
            .filter(|s| !s.is_empty())
    }

    /// The leaf segment, or `None` for a bare root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// The containing directory, or `None` for a bare root.
    pub fn parent(&self) -> Option<CanonicalPath> {
        if self.segments().next().is_none() {
            return None;
        }
        let cut = self.resolved.rfind(self.sep_char())?;
        canonicalize(&self.resolved[..cut + 1]).ok()
    }

    /// Appends a relative fragment and re-canonicalizes, so `.`/`..` in the
    /// fragment are resolved and validated like any other input.
    pub fn join(&self, rel: &str) -> Result<CanonicalPath> {
        if rel.is_empty() {
            return Err(WidePathError::EmptyPath);
        }
        let mut joined = self.resolved.clone();
        if !joined.ends_with(['\\', '/']) {
            joined.push(self.sep_char());
        }
        joined.push_str(rel.trim_start_matches(['\\', '/']));
        canonicalize(&joined)
    }

    /// Ordinal equality under the given case policy.
    pub fn eq_path(&self, other: &CanonicalPath, case: CaseSensitivity) -> bool {
        self.kind == other.kind && case.eq_str(&self.resolved, &other.resolved)
    }

    /// Whether `other` sits at or below this path, compared segment-wise
    /// under the given case policy.
    pub fn contains(&self, other: &CanonicalPath, case: CaseSensitivity) -> bool {
        if self.kind != other.kind || !case.eq_str(self.root_spelling(), other.root_spelling()) {
            return false;
        }
        let mine: Vec<&str> = self.segments().collect();
        let theirs: Vec<&str> = other.segments().collect();
        if theirs.len() < mine.len() {
            return false;
        }
        mine.iter().zip(&theirs).all(|(a, b)| case.eq_str(a, b))
    }

    /// The resolved form as a `Path` for handing to `std::fs`.
    pub fn os_path(&self) -> &Path {
        Path::new(&self.resolved)
    }
}

/// Canonicalizes a path string into an extended-length-safe absolute form.
///
/// Fails with [`WidePathError::EmptyPath`] on empty input and
/// [`WidePathError::InvalidPath`] on forbidden characters, drive-relative
/// input (`X:sub` — depends on per-drive working-directory state that has no
/// extended-length form), UNC roots missing a share, or `..` resolution
/// escaping above the root.
pub fn canonicalize(input: &str) -> Result<CanonicalPath> {
    if input.is_empty() {
        return Err(WidePathError::EmptyPath);
    }

    let had_marker = input.starts_with(EXTENDED_PREFIX);
    let body = strip_extended(input);
    if body.is_empty() {
        return Err(invalid(input, "extended-length marker carries no path"));
    }
    let parsed = classify(&body, input)?;
    // The marker asserts an already-absolute extended form; a remainder
    // without a drive or UNC root is malformed, never resolved as relative.
    if had_marker && (parsed.relative_input || !matches!(parsed.kind, RootKind::Drive | RootKind::Unc))
    {
        return Err(invalid(input, "extended-length marker requires a drive or UNC root"));
    }
    assemble(input, &body, parsed)
}

struct ParsedRoot {
    kind: RootKind,
    /// Unmarked canonical root text: `C:`, `\\server\share`, `\\.\name`, `/`.
    text: String,
    /// Remaining path text after the root, separators included.
    rest: String,
    relative_input: bool,
}

/// Strips an extended-length marker, restoring the plain spelling for
/// processing so that canonicalization is idempotent.
fn strip_extended(input: &str) -> String {
    if let Some(prefix) = input.get(..EXTENDED_UNC_PREFIX.len()) {
        if prefix.eq_ignore_ascii_case(EXTENDED_UNC_PREFIX) {
            return format!(r"\\{}", &input[EXTENDED_UNC_PREFIX.len()..]);
        }
    }
    if let Some(rest) = input.strip_prefix(EXTENDED_PREFIX) {
        return rest.to_string();
    }
    input.to_string()
}

fn is_sep(b: u8) -> bool {
    b == b'\\' || b == b'/'
}

/// Splits off the first path segment, skipping leading separators.
fn split_first_segment(s: &str) -> (&str, &str) {
    let s = s.trim_start_matches(['\\', '/']);
    match s.find(['\\', '/']) {
        Some(i) => (&s[..i], &s[i..]),
        None => (s, ""),
    }
}

fn invalid(path: &str, reason: impl Into<String>) -> WidePathError {
    WidePathError::InvalidPath { path: path.to_string(), reason: reason.into() }
}

fn classify(body: &str, original: &str) -> Result<ParsedRoot> {
    let bytes = body.as_bytes();

    // \\.\device\...
    if bytes.len() >= DEVICE_PREFIX_LEN
        && is_sep(bytes[0])
        && is_sep(bytes[1])
        && bytes[2] == b'.'
        && is_sep(bytes[3])
    {
        let (device, rest) = split_first_segment(&body[DEVICE_PREFIX_LEN..]);
        if device.is_empty() {
            return Err(invalid(original, "device path is missing a device name"));
        }
        tracing::debug!(path = original, "canonicalizing device-rooted path");
        return Ok(ParsedRoot {
            kind: RootKind::Device,
            text: format!(r"\\.\{device}"),
            rest: rest.to_string(),
            relative_input: false,
        });
    }

    // \\server\share\...
    if bytes.len() >= 2 && is_sep(bytes[0]) && is_sep(bytes[1]) {
        let (server, after_server) = split_first_segment(&body[2..]);
        if server.is_empty() {
            return Err(invalid(original, "UNC path is missing a server name"));
        }
        let (share, rest) = split_first_segment(after_server);
        if share.is_empty() {
            return Err(invalid(original, "UNC path is missing a share name"));
        }
        validate_segment(server, true, original)?;
        validate_segment(share, true, original)?;
        return Ok(ParsedRoot {
            kind: RootKind::Unc,
            text: format!(r"\\{server}\{share}"),
            rest: rest.to_string(),
            relative_input: false,
        });
    }

    // X:\... or X:sub
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        if bytes.len() == 2 || !is_sep(bytes[2]) {
            return Err(invalid(
                original,
                "drive-relative paths are not supported: the per-drive working \
                 directory has no extended-length form",
            ));
        }
        let drive = (bytes[0] as char).to_ascii_uppercase();
        return Ok(ParsedRoot {
            kind: RootKind::Drive,
            text: format!("{drive}:"),
            rest: body[2..].to_string(),
            relative_input: false,
        });
    }

    // /posix/absolute
    if bytes[0] == b'/' {
        return Ok(ParsedRoot {
            kind: RootKind::Posix,
            text: "/".to_string(),
            rest: body[1..].to_string(),
            relative_input: false,
        });
    }

    // \rooted-on-current-drive
    if bytes[0] == b'\\' {
        let cwd = current_dir_string()?;
        let cwd_root = classify(&cwd, original)?;
        return Ok(ParsedRoot {
            kind: cwd_root.kind,
            text: cwd_root.text,
            rest: body[1..].to_string(),
            relative_input: true,
        });
    }

    // fully relative
    let cwd = current_dir_string()?;
    let cwd_root = classify(&cwd, original)?;
    Ok(ParsedRoot {
        kind: cwd_root.kind,
        text: cwd_root.text,
        rest: format!("{}/{}", cwd_root.rest, body),
        relative_input: true,
    })
}

fn current_dir_string() -> Result<String> {
    let cwd = std::env::current_dir().map_err(|e| WidePathError::io(e, "<current directory>"))?;
    Ok(strip_extended(&cwd.to_string_lossy()))
}

fn validate_segment(segment: &str, windows_family: bool, original: &str) -> Result<()> {
    for c in segment.chars() {
        let bad = if windows_family {
            INVALID_NAME_CHARS.contains(&c) || (c as u32) < 0x20
        } else {
            c == '\0'
        };
        if bad {
            return Err(invalid(
                original,
                format!("name '{segment}' contains forbidden character {c:?}"),
            ));
        }
    }
    Ok(())
}

fn assemble(original: &str, body: &str, root: ParsedRoot) -> Result<CanonicalPath> {
    let windows_family = !matches!(root.kind, RootKind::Posix);

    // Resolve `.`/`..` left-to-right; popping past the root is an error.
    let mut segs: Vec<&str> = Vec::new();
    let parts: Vec<&str> = if windows_family {
        root.rest.split(['\\', '/']).collect()
    } else {
        root.rest.split('/').collect()
    };
    for part in parts {
        match part {
            "" | "." => {}
            ".." => {
                if segs.pop().is_none() {
                    return Err(invalid(original, "path escapes its root"));
                }
            }
            _ => {
                validate_segment(part, windows_family, original)?;
                segs.push(part);
            }
        }
    }

    let sep = if windows_family { '\\' } else { '/' };
    let mut resolved = match root.kind {
        RootKind::Drive => format!("{}{}", EXTENDED_PREFIX, root.text),
        RootKind::Unc => format!("{}{}", EXTENDED_UNC_PREFIX, &root.text[2..]),
        RootKind::Device | RootKind::Posix => root.text.clone(),
    };
    let root_end = resolved.len();
    for seg in &segs {
        if !resolved.ends_with(sep) {
            resolved.push(sep);
        }
        resolved.push_str(seg);
    }
    // A bare drive root keeps its separator: `\\?\C:` alone would be
    // drive-relative to the native layer.
    if matches!(root.kind, RootKind::Drive) && segs.is_empty() {
        resolved.push('\\');
    }

    if resolved.encode_utf16().count() > MAX_EXTENDED_UTF16 {
        return Err(invalid(original, "resolved path exceeds the extended-length ceiling"));
    }

    let trailing_sep = !segs.is_empty() && body.ends_with(['\\', '/']);

    Ok(CanonicalPath {
        input: original.to_string(),
        resolved,
        kind: root.kind,
        root_end,
        relative_input: root.relative_input,
        trailing_sep,
    })
}
