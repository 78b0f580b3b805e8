use crate::normalize::NormalizedPath;
use crate::package::PackageLayout;
use crate::rules::RedirectionSpec;
use crate::winpath::{is_separator, join, relative_to, strip_prefix_ignore_case, trim_trailing_separators};
use crate::{os_code, EngineError};
use pathshim_fs::FileSystem;
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

const LITERAL_PREFIX: &str = r"\\?\";

/// A redirect destination, split into the target root and the part below it
/// that may need directories created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    /// `\\?\<target base>`, no trailing separator.
    pub base: String,
    /// Path under `base`, no leading separator. May be empty.
    pub relative: String,
}

impl RedirectTarget {
    pub fn full_path(&self) -> String {
        join(&self.base, &self.relative)
    }

    /// Every directory between `base` (exclusive) and the leaf (exclusive).
    fn intermediate_dirs(&self) -> Vec<String> {
        let components: Vec<&str> = self
            .relative
            .split(is_separator)
            .filter(|c| !c.is_empty())
            .collect();
        let mut dirs = Vec::new();
        let mut current = self.base.clone();
        for component in components.iter().take(components.len().saturating_sub(1)) {
            current = join(&current, component);
            dirs.push(current.clone());
        }
        dirs
    }
}

/// Computes redirect destinations and materializes them on a [`FileSystem`].
#[derive(Clone)]
pub struct Resolver {
    layout: PackageLayout,
    fs: Arc<dyn FileSystem>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("layout", &self.layout)
            .field("fs", &self.fs.name())
            .finish()
    }
}

impl Resolver {
    pub fn new(layout: PackageLayout, fs: Arc<dyn FileSystem>) -> Self {
        Self { layout, fs }
    }

    pub fn layout(&self) -> &PackageLayout {
        &self.layout
    }

    pub fn file_system(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Where `source` goes when redirected into `target_base`.
    ///
    /// Paths inside the package keep their package-relative tail, nested
    /// under `PackageCache\<family>` for a non-default target. Paths outside
    /// the package are filed under `<drive>$\...`, nested under
    /// `PackageCache\<family>\VFS\PackageDrive` unless the target is the
    /// default redirect root.
    pub fn compute(&self, source: &NormalizedPath, target_base: &str) -> Option<RedirectTarget> {
        let target = trim_trailing_separators(target_base);
        let target = strip_prefix_ignore_case(target, LITERAL_PREFIX).unwrap_or(target);
        let base = format!("{LITERAL_PREFIX}{target}");
        let cache = format!(r"PackageCache\{}", self.layout.package_family_name());

        let in_package = source
            .drive_absolute_path()
            .and_then(|p| relative_to(p, self.layout.package_root()))
            .or_else(|| relative_to(source.full_path(), self.layout.final_package_root()));

        let relative = if let Some(tail) = in_package {
            if self.layout.is_default_writable_root(target) {
                debug!("in package, default target");
                tail.to_owned()
            } else {
                debug!("in package, configured target {target}");
                join(&cache, tail)
            }
        } else {
            let drive_absolute = source.drive_absolute_path()?;
            let drive = drive_absolute.chars().next()?;
            let rest = drive_absolute.get(2..)?.trim_start_matches(is_separator);
            let escaped = format!("{drive}$");
            if self.layout.is_default_redirect_root(target) {
                debug!("outside package, default redirect root");
                join(&escaped, rest)
            } else {
                debug!("outside package, configured target {target}");
                join(&join(&cache, r"VFS\PackageDrive"), &join(&escaped, rest))
            }
        };
        Some(RedirectTarget { base, relative })
    }

    /// Create the target root and every intermediate directory, leaving the
    /// leaf for the caller. Directories that already exist are fine.
    pub fn ensure_directories(&self, target: &RedirectTarget) -> Result<(), EngineError> {
        let materialize_err = |directory: &str, source: io::Error| EngineError::Materialize {
            destination: target.full_path(),
            directory: directory.to_owned(),
            source,
        };
        self.fs
            .create_dir_all(&target.base)
            .map_err(|e| materialize_err(&target.base, e))?;
        for dir in target.intermediate_dirs() {
            match self.fs.create_dir(&dir) {
                Ok(()) => debug!("created {dir}"),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(materialize_err(&dir, e)),
            }
        }
        Ok(())
    }

    /// Destination for `vfs_path` under `spec`, creating its directory
    /// structure when `ensure_dirs` is set and it does not exist yet.
    pub fn resolve(
        &self,
        vfs_path: &NormalizedPath,
        spec: &RedirectionSpec,
        ensure_dirs: bool,
    ) -> Result<String, EngineError> {
        let target = self
            .compute(vfs_path, &spec.target_base)
            .ok_or_else(|| EngineError::Unresolvable(vfs_path.full_path().to_owned()))?;
        let destination = target.full_path();
        if self.fs.exists(&destination) {
            debug!("redirect destination already exists: {destination}");
            return Ok(destination);
        }
        if ensure_dirs {
            self.ensure_directories(&target)?;
        }
        Ok(destination)
    }

    /// First-use copy into `destination`, preferring the package's VFS copy
    /// over the real location. Returns whether anything was created.
    pub fn populate(
        &self,
        destination: &str,
        vfs_source: Option<&str>,
        devirtualized_source: Option<&str>,
    ) -> Result<bool, EngineError> {
        if self.fs.exists(destination) {
            debug!("copy skipped, {destination} already present");
            return Ok(false);
        }
        let Some(source) = vfs_source
            .into_iter()
            .chain(devirtualized_source)
            .find(|s| self.fs.exists(s))
        else {
            debug!("nothing to copy into {destination}");
            return Ok(false);
        };

        let created = if self.fs.is_dir(source) {
            self.fs.create_dir_from_template(source, destination)
        } else {
            self.fs.copy_file(source, destination)
        };
        match created {
            Ok(()) => {
                debug!("populated {destination} from {source}");
                Ok(true)
            }
            // Another caller got there first.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => {
                warn!(
                    "copy {source} -> {destination} failed ({:?}, os error {})",
                    e.kind(),
                    os_code(&e)
                );
                Err(EngineError::Populate {
                    destination: destination.to_owned(),
                    source_path: source.to_owned(),
                    source: e,
                })
            }
        }
    }
}
