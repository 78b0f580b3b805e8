use crate::{split_drive_path, FileSystem};
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::debug;

/// Filesystem backed by the host OS.
///
/// In native mode, paths are handed to `std::fs` unchanged, which is what a
/// Windows host wants. In rooted mode each drive letter becomes a directory
/// under `drive_root` (`C:\a\b` maps to `<drive_root>/C/a/b`), letting the
/// engine run against a real directory tree on any host.
#[derive(Debug, Clone)]
pub struct HostFileSystem {
    drive_root: Option<PathBuf>,
}

impl Default for HostFileSystem {
    fn default() -> Self {
        Self::native()
    }
}

impl HostFileSystem {
    pub fn native() -> Self {
        Self { drive_root: None }
    }

    pub fn rooted(drive_root: impl Into<PathBuf>) -> Self {
        Self {
            drive_root: Some(drive_root.into()),
        }
    }

    /// Translate an engine path into the host path it refers to.
    pub fn host_path(&self, path: &str) -> io::Result<PathBuf> {
        let Some(root) = &self.drive_root else {
            return Ok(PathBuf::from(path));
        };
        let (drive, segments) = split_drive_path(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a drive-absolute path: {path}"),
            )
        })?;
        let mut out = root.join(drive.to_string());
        for segment in segments {
            out.push(segment);
        }
        Ok(out)
    }
}

impl FileSystem for HostFileSystem {
    fn name(&self) -> &str {
        if self.drive_root.is_some() {
            "rooted"
        } else {
            "native"
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.host_path(path)
            .map(|p| p.symlink_metadata().is_ok())
            .unwrap_or(false)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.host_path(path).is_ok_and(|p| p.is_dir())
    }

    fn create_dir(&self, path: &str) -> io::Result<()> {
        fs::create_dir(self.host_path(path)?)
    }

    fn create_dir_all(&self, path: &str) -> io::Result<()> {
        fs::create_dir_all(self.host_path(path)?)
    }

    fn copy_file(&self, from: &str, to: &str) -> io::Result<()> {
        let src = self.host_path(from)?;
        let dest = self.host_path(to)?;
        let dir = dest.parent().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("destination has no parent: {}", dest.display()),
            )
        })?;
        if dest.symlink_metadata().is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("already exists: {}", dest.display()),
            ));
        }

        let mut reader = File::open(&src)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        let n = io::copy(&mut reader, &mut tmp)?;
        tmp.as_file()
            .set_permissions(fs::metadata(&src)?.permissions())?;
        tmp.as_file().sync_all()?;
        // The destination only becomes visible once fully written; a losing
        // racer gets AlreadyExists and finds a complete file.
        tmp.persist_noclobber(&dest).map_err(|e| e.error)?;
        debug!("copied {n} bytes {} -> {}", src.display(), dest.display());
        Ok(())
    }

    fn create_dir_from_template(&self, template: &str, to: &str) -> io::Result<()> {
        let template = self.host_path(template)?;
        let dest = self.host_path(to)?;
        let meta = fs::metadata(&template)?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("template is not a directory: {}", template.display()),
            ));
        }
        fs::create_dir(&dest)?;
        fs::set_permissions(&dest, meta.permissions())?;
        Ok(())
    }
}
