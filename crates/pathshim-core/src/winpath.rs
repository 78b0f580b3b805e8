//! Windows path grammar: classification, separator/case-insensitive prefix
//! tests, joining, and lexical canonicalization equivalent to what the OS does
//! when it expands a path to its full form.
//!
//! Everything here is pure string work over `&str`; nothing touches the disk.

/// Shape of a path string, following the DOS path type rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Empty input.
    Unknown,
    /// `\\server\share\...`
    UncAbsolute,
    /// `C:\...`
    DriveAbsolute,
    /// `C:...`
    DriveRelative,
    /// `\...`
    Rooted,
    /// `dir\file`
    Relative,
    /// `\\.\...` or `\\?\...`
    LocalDevice,
    /// `\\.`, `\\?` or `\??\...`: direct escapes into the object manager.
    RootLocalDevice,
}

#[inline]
pub fn is_separator(c: char) -> bool {
    c == '\\' || c == '/'
}

fn byte_is_separator(b: Option<&u8>) -> bool {
    matches!(b, Some(b'\\' | b'/'))
}

pub fn path_kind(path: &str) -> PathKind {
    let b = path.as_bytes();
    if b.is_empty() {
        return PathKind::Unknown;
    }
    if byte_is_separator(b.first()) {
        if byte_is_separator(b.get(1)) {
            if matches!(b.get(2), Some(b'.' | b'?')) {
                if byte_is_separator(b.get(3)) {
                    return PathKind::LocalDevice;
                }
                if b.len() == 3 {
                    return PathKind::RootLocalDevice;
                }
            }
            return PathKind::UncAbsolute;
        }
        if b.get(1) == Some(&b'?') && b.get(2) == Some(&b'?') && byte_is_separator(b.get(3)) {
            return PathKind::RootLocalDevice;
        }
        return PathKind::Rooted;
    }
    if b.len() >= 2 && b[0].is_ascii_alphabetic() && b[1] == b':' {
        if byte_is_separator(b.get(2)) {
            return PathKind::DriveAbsolute;
        }
        return PathKind::DriveRelative;
    }
    PathKind::Relative
}

fn chars_equal(a: char, b: char) -> bool {
    a == b || (is_separator(a) && is_separator(b)) || a.to_lowercase().eq(b.to_lowercase())
}

/// Case-insensitive, separator-agnostic `starts_with`. Returns the rest of
/// `path` after the matched prefix.
pub fn strip_prefix_ignore_case<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let mut chars = path.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = chars.next()?;
        if !chars_equal(actual, expected) {
            return None;
        }
    }
    let offset = chars.next().map_or(path.len(), |(idx, _)| idx);
    Some(&path[offset..])
}

/// Directory-boundary-exact prefix test.
///
/// Returns the remainder of `path` after `base` and its separator, or an empty
/// slice when `path` names `base` itself. `C:\Foo` is not a base of
/// `C:\Foobar\x`. An empty `base` never matches.
pub fn relative_to<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    if base.is_empty() {
        return None;
    }
    let rest = strip_prefix_ignore_case(path, base)?;
    if rest.is_empty() || base.ends_with(is_separator) {
        return Some(rest);
    }
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if is_separator(c) => Some(chars.as_str()),
        _ => None,
    }
}

pub fn paths_equal(a: &str, b: &str) -> bool {
    let (a, b) = (trim_trailing_separators(a), trim_trailing_separators(b));
    a.chars().count() == b.chars().count() && strip_prefix_ignore_case(a, b) == Some("")
}

/// Remove trailing separators, keeping the separator of a drive root (`C:\`)
/// and the bare `\`.
pub fn trim_trailing_separators(path: &str) -> &str {
    let trimmed = path.trim_end_matches(is_separator);
    if trimmed.len() == path.len() {
        return path;
    }
    if trimmed.is_empty() || path_kind(path) == PathKind::DriveAbsolute && trimmed.len() == 2 {
        return &path[..=trimmed.len()];
    }
    trimmed
}

/// Join `tail` under `base` with a single `\`. An empty tail yields `base`
/// without a trailing separator.
pub fn join(base: &str, tail: &str) -> String {
    let base = trim_trailing_separators(base);
    let tail = tail.trim_start_matches(is_separator);
    if tail.is_empty() {
        return base.to_owned();
    }
    let mut out = String::with_capacity(base.len() + tail.len() + 1);
    out.push_str(base);
    if !base.ends_with(is_separator) {
        out.push('\\');
    }
    out.push_str(tail);
    out
}

/// Expand `path` to its full, canonical form, resolving relative, rooted and
/// drive-relative forms against `cwd`.
///
/// Root-local-device paths are returned untouched. Returns `None` when the
/// path is empty or cannot be anchored (a relative path with a non-absolute
/// `cwd`).
pub fn full_path(path: &str, cwd: &str) -> Option<String> {
    match path_kind(path) {
        PathKind::Unknown => None,
        PathKind::RootLocalDevice => Some(path.to_owned()),
        PathKind::DriveAbsolute => Some(canonical_drive(path)),
        PathKind::LocalDevice => {
            let prefix = format!(r"\\{}\", &path[2..3]);
            let rest = &path[4..];
            if path_kind(rest) == PathKind::DriveAbsolute {
                Some(prefix + &canonical_drive(rest))
            } else {
                Some(canonical(&prefix[..3], true, rest))
            }
        }
        PathKind::UncAbsolute => {
            let (root, rest) = split_unc(path);
            Some(canonical(&root, false, rest))
        }
        PathKind::Rooted => {
            let root = absolute_root(cwd)?;
            Some(canonical(&root, true, path))
        }
        PathKind::DriveRelative => {
            let drive = &path[..2];
            let rest = &path[2..];
            let cwd_full = full_path(cwd, "").filter(|c| path_kind(c) == PathKind::DriveAbsolute);
            match cwd_full {
                Some(c) if c[..2].eq_ignore_ascii_case(drive) => full_path(&join(&c, rest), ""),
                _ => Some(canonical(drive, true, rest)),
            }
        }
        PathKind::Relative => {
            let kind = path_kind(cwd);
            if matches!(
                kind,
                PathKind::DriveAbsolute | PathKind::UncAbsolute | PathKind::LocalDevice
            ) {
                full_path(&join(cwd, path), "")
            } else {
                None
            }
        }
    }
}

fn canonical_drive(path: &str) -> String {
    canonical(&path[..2], true, &path[2..])
}

/// `\\server\share` root and the remainder after it.
fn split_unc(path: &str) -> (String, &str) {
    let body = &path[2..];
    let mut parts = body.splitn(3, is_separator);
    let server = parts.next().unwrap_or_default();
    let share = parts.next().filter(|s| !s.is_empty());
    let rest = parts.next().unwrap_or_default();
    let root = match share {
        Some(share) => format!(r"\\{server}\{share}"),
        None => format!(r"\\{server}"),
    };
    (root, rest)
}

/// Root (`C:` or `\\server\share`) of an absolute working directory.
fn absolute_root(cwd: &str) -> Option<String> {
    match path_kind(cwd) {
        PathKind::DriveAbsolute => Some(cwd[..2].to_owned()),
        PathKind::UncAbsolute => Some(split_unc(cwd).0),
        PathKind::LocalDevice if path_kind(&cwd[4..]) == PathKind::DriveAbsolute => {
            Some(cwd[4..6].to_owned())
        }
        _ => None,
    }
}

/// Lexically resolve `rest` under `root` (given without trailing separator).
///
/// `keep_separator` roots (drives, devices) always render with their
/// separator; a UNC share root only does when the input had one.
fn canonical(root: &str, keep_separator: bool, rest: &str) -> String {
    let trailing = rest.ends_with(is_separator);
    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split(is_separator) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    // The last segment loses trailing dots and spaces unless a separator follows.
    if !trailing {
        if let Some(last) = segments.pop() {
            let trimmed = last.trim_end_matches(['.', ' ']);
            if !trimmed.is_empty() {
                segments.push(trimmed);
            }
        }
    }

    let mut out = String::with_capacity(root.len() + rest.len() + 1);
    out.push_str(root);
    if segments.is_empty() {
        if keep_separator || trailing {
            out.push('\\');
        }
        return out;
    }
    for segment in &segments {
        out.push('\\');
        out.push_str(segment);
    }
    if trailing {
        out.push('\\');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_path_kinds() {
        assert_eq!(path_kind(""), PathKind::Unknown);
        assert_eq!(path_kind(r"C:\x"), PathKind::DriveAbsolute);
        assert_eq!(path_kind("c:/x"), PathKind::DriveAbsolute);
        assert_eq!(path_kind("C:x"), PathKind::DriveRelative);
        assert_eq!(path_kind(r"\x"), PathKind::Rooted);
        assert_eq!(path_kind("x"), PathKind::Relative);
        assert_eq!(path_kind(r"\\server\share"), PathKind::UncAbsolute);
        assert_eq!(path_kind(r"\\?\C:\x"), PathKind::LocalDevice);
        assert_eq!(path_kind(r"\\.\pipe\x"), PathKind::LocalDevice);
        assert_eq!(path_kind(r"\\?"), PathKind::RootLocalDevice);
        assert_eq!(path_kind(r"\??\C:\x"), PathKind::RootLocalDevice);
    }

    #[test]
    fn relative_to_respects_directory_boundaries() {
        assert_eq!(relative_to(r"C:\Foo\x", r"C:\Foo"), Some("x"));
        assert_eq!(relative_to(r"c:/foo/x/y", r"C:\Foo"), Some("x/y"));
        assert_eq!(relative_to(r"C:\Foo", r"C:\Foo"), Some(""));
        assert_eq!(relative_to(r"C:\Foobar\x", r"C:\Foo"), None);
        assert_eq!(relative_to(r"C:\x", r"C:\"), Some("x"));
        assert_eq!(relative_to(r"C:\x", ""), None);
    }

    #[test]
    fn join_uses_single_separators() {
        assert_eq!(join(r"C:\a\", r"\b"), r"C:\a\b");
        assert_eq!(join(r"C:\", "b"), r"C:\b");
        assert_eq!(join(r"C:\a", ""), r"C:\a");
    }

    #[test]
    fn trims_trailing_separators_but_not_drive_root() {
        assert_eq!(trim_trailing_separators(r"C:\a\\"), r"C:\a");
        assert_eq!(trim_trailing_separators(r"C:\"), r"C:\");
        assert_eq!(trim_trailing_separators(r"C:\\\"), r"C:\");
    }

    #[test]
    fn paths_equal_ignores_case_and_trailing_separator() {
        assert!(paths_equal(r"C:\Data\", r"c:/data"));
        assert!(!paths_equal(r"C:\Data", r"C:\Data2"));
        assert!(!paths_equal(r"C:\Data2", r"C:\Data"));
    }

    #[test]
    fn canonicalizes_drive_absolute_paths() {
        assert_eq!(full_path(r"C:\a\.\b\..\c", "").unwrap(), r"C:\a\c");
        assert_eq!(full_path("C:/a//b/", "").unwrap(), r"C:\a\b\");
        assert_eq!(full_path(r"C:\..\..\x", "").unwrap(), r"C:\x");
        assert_eq!(full_path(r"C:\", "").unwrap(), r"C:\");
        assert_eq!(full_path(r"C:\dir\file.txt. ", "").unwrap(), r"C:\dir\file.txt");
    }

    #[test]
    fn resolves_against_working_directory() {
        let cwd = r"D:\work\proj";
        assert_eq!(full_path(r"src\main.c", cwd).unwrap(), r"D:\work\proj\src\main.c");
        assert_eq!(full_path(r"..\other", cwd).unwrap(), r"D:\work\other");
        assert_eq!(full_path(".", cwd).unwrap(), r"D:\work\proj");
        assert_eq!(full_path(r"\root.txt", cwd).unwrap(), r"D:\root.txt");
        assert_eq!(full_path("d:sub", cwd).unwrap(), r"D:\work\proj\sub");
        assert_eq!(full_path("E:sub", cwd).unwrap(), r"E:\sub");
        assert!(full_path("rel", "").is_none());
    }

    #[test]
    fn canonicalizes_device_and_unc_paths() {
        assert_eq!(
            full_path(r"\\?\C:\a\..\b", "").unwrap(),
            r"\\?\C:\b"
        );
        assert_eq!(full_path(r"//./pipe/x", "").unwrap(), r"\\.\pipe\x");
        assert_eq!(
            full_path(r"\\server\share\a\..\b", "").unwrap(),
            r"\\server\share\b"
        );
        assert_eq!(full_path(r"\??\C:\a\..\b", "").unwrap(), r"\??\C:\a\..\b");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        for p in [r"C:\a\.\b\..\c\", r"\\?\C:\x\y", r"\\srv\sh\a", r"C:\dir\f.txt"] {
            let once = full_path(p, "").unwrap();
            assert_eq!(full_path(&once, "").unwrap(), once);
        }
    }
}
