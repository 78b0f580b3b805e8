use crate::winpath::{full_path, path_kind, PathKind};
use std::borrow::Cow;
use tracing::{debug, warn};

/// A path in canonical absolute form, classified by kind.
///
/// `drive_absolute_path` is a suffix of `full_path` and, when present, is
/// always a well-formed `X:\...` path. It is absent for UNC paths, opaque
/// pass-through identifiers, non-drive device paths and parse failures. A
/// parse failure is represented by an empty `full_path`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedPath {
    full_path: String,
    drive_absolute_offset: Option<usize>,
}

impl NormalizedPath {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keep `raw` verbatim with no drive-absolute view.
    pub fn opaque(raw: impl Into<String>) -> Self {
        Self {
            full_path: raw.into(),
            drive_absolute_offset: None,
        }
    }

    /// Classify an already-canonical path.
    pub fn from_full_path(full_path: String) -> Self {
        let offset = match path_kind(&full_path) {
            PathKind::DriveAbsolute => Some(0),
            PathKind::LocalDevice | PathKind::RootLocalDevice => full_path
                .get(4..)
                .filter(|rest| path_kind(rest) == PathKind::DriveAbsolute)
                .map(|_| 4),
            _ => None,
        };
        Self {
            full_path,
            drive_absolute_offset: offset,
        }
    }

    #[inline]
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    #[inline]
    pub fn drive_absolute_path(&self) -> Option<&str> {
        self.drive_absolute_offset.map(|idx| &self.full_path[idx..])
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.full_path.is_empty()
    }

    pub fn into_full_path(self) -> String {
        self.full_path
    }
}

/// Normalize a raw path as an application handed it to a filesystem API.
///
/// Empty input means the current directory. Shell GUID items (`::{...}`) and
/// `blob:` sentinels pass through verbatim. Everything else is percent-decoded,
/// stripped of a leading `file:` scheme, and expanded to full form against
/// `cwd`. Unparsable input yields [`NormalizedPath::empty`].
pub fn normalize_path(raw: &str, cwd: &str) -> NormalizedPath {
    if raw.is_empty() {
        return canonicalize(".", cwd);
    }
    if is_shell_guid(raw) {
        debug!("shell item id passed through: {raw}");
        return NormalizedPath::opaque(raw);
    }
    if is_blob(raw) {
        debug!("blob sentinel passed through");
        return NormalizedPath::opaque(raw);
    }
    let decoded = percent_decode(raw);
    canonicalize(strip_file_scheme(&decoded), cwd)
}

fn canonicalize(path: &str, cwd: &str) -> NormalizedPath {
    match path_kind(path) {
        PathKind::Unknown => NormalizedPath::empty(),
        // Object-manager escapes bypass normal path semantics.
        PathKind::RootLocalDevice => NormalizedPath::from_full_path(path.to_owned()),
        _ => {
            let Some(full) = full_path(path, cwd) else {
                debug!("cannot anchor path {path} (cwd '{cwd}')");
                return NormalizedPath::empty();
            };
            match path_kind(&full) {
                // UNC paths are never mapped back to a drive, even a loopback admin share.
                PathKind::UncAbsolute => NormalizedPath::opaque(full),
                PathKind::DriveAbsolute | PathKind::LocalDevice | PathKind::RootLocalDevice => {
                    NormalizedPath::from_full_path(full)
                }
                kind => {
                    warn!("unexpected {kind:?} after canonicalizing {path}");
                    NormalizedPath::empty()
                }
            }
        }
    }
}

fn is_shell_guid(path: &str) -> bool {
    path.chars().count() > 39 && path.starts_with("::{")
}

fn is_blob(path: &str) -> bool {
    path.starts_with("blob:") || path.starts_with("BLOB:")
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decode `%XX` escapes. A `%` not followed by two hex digits is kept as-is;
/// decoded bytes that are not valid UTF-8 are replaced.
fn percent_decode(input: &str) -> Cow<'_, str> {
    if !input.contains('%') {
        return Cow::Borrowed(input);
    }
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = bytes.get(i + 1).copied().and_then(hex_value);
            let lo = bytes.get(i + 2).copied().and_then(hex_value);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    match String::from_utf8(out) {
        Ok(s) => Cow::Owned(s),
        Err(e) => Cow::Owned(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    }
}

fn strip_file_scheme(path: &str) -> &str {
    for prefix in [r"file:\", "file:/", r"FILE:\", "FILE:/"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            return rest;
        }
    }
    path
}
