//! Filesystem backends for the pathshim resolver.
//!
//! The redirection engine never touches the disk directly. Existence checks,
//! directory creation and first-use copies go through the [`FileSystem`] trait,
//! which has a host implementation ([`HostFileSystem`], either native or with
//! drive letters rooted under a host directory) and an in-memory one
//! ([`MemoryFileSystem`]) for tests and dry runs.
//!
//! Paths are Windows-form strings (`C:\dir\file`, optionally with a `\\?\`
//! prefix) exactly as the engine produces them.

pub mod host;
pub mod memory;

pub use host::HostFileSystem;
pub use memory::MemoryFileSystem;

use std::io;

pub trait FileSystem: Send + Sync {
    fn name(&self) -> &str;

    fn exists(&self, path: &str) -> bool;

    fn is_dir(&self, path: &str) -> bool;

    /// Create a single directory. Fails with `AlreadyExists` if anything is
    /// already present at `path`, and with `NotFound` if the parent is missing.
    fn create_dir(&self, path: &str) -> io::Result<()>;

    /// Create a directory and all missing parents. Succeeds if it already exists.
    fn create_dir_all(&self, path: &str) -> io::Result<()>;

    /// Copy a regular file byte-for-byte. Fails with `AlreadyExists` rather
    /// than overwriting an existing destination.
    fn copy_file(&self, from: &str, to: &str) -> io::Result<()>;

    /// Create the directory `to`, taking its attributes from `template`.
    /// Contents of `template` are not copied.
    fn create_dir_from_template(&self, template: &str, to: &str) -> io::Result<()>;
}

/// Split a Windows-form path into its drive letter and the segments after the
/// drive root. Device prefixes (`\\?\`, `\\.\`) are skipped.
///
/// Returns `None` for anything that is not drive-absolute.
pub(crate) fn split_drive_path(path: &str) -> Option<(char, Vec<&str>)> {
    let is_sep = |c: char| c == '\\' || c == '/';
    let mut rest = path;
    let bytes = rest.as_bytes();
    if bytes.len() >= 4
        && is_sep(bytes[0] as char)
        && is_sep(bytes[1] as char)
        && (bytes[2] == b'?' || bytes[2] == b'.')
        && is_sep(bytes[3] as char)
    {
        rest = &rest[4..];
    }

    let mut chars = rest.chars();
    let drive = chars.next().filter(char::is_ascii_alphabetic)?;
    if chars.next() != Some(':') {
        return None;
    }
    let tail = &rest[2..];
    if !tail.is_empty() && !tail.starts_with(is_sep) {
        return None;
    }
    let segments = tail.split(is_sep).filter(|s| !s.is_empty()).collect();
    Some((drive.to_ascii_uppercase(), segments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_and_prefixed_paths() {
        let (drive, segs) = split_drive_path(r"c:\Users\me\file.txt").unwrap();
        assert_eq!(drive, 'C');
        assert_eq!(segs, vec!["Users", "me", "file.txt"]);

        let (drive, segs) = split_drive_path(r"\\?\D:\a//b\").unwrap();
        assert_eq!(drive, 'D');
        assert_eq!(segs, vec!["a", "b"]);

        let (_, segs) = split_drive_path("E:").unwrap();
        assert!(segs.is_empty());
    }

    #[test]
    fn rejects_non_drive_paths() {
        assert!(split_drive_path(r"\\server\share\x").is_none());
        assert!(split_drive_path(r"relative\x").is_none());
        assert!(split_drive_path("C:relative").is_none());
        assert!(split_drive_path("").is_none());
    }
}
