use crate::known_folders::KnownFolderProvider;
use crate::normalize::{normalize_path, NormalizedPath};
use crate::package::{PackageIdentity, PackageLayout};
use crate::resolver::Resolver;
use crate::rules::RedirectionRules;
use crate::vfs::VfsMappings;
use crate::winpath::{join, relative_to, trim_trailing_separators};
use crate::{os_code, EngineError};
use bitflags::bitflags;
use pathshim_fs::FileSystem;
use pathshim_schema::{Architecture, KnownFolder, RedirectionConfig};
use std::sync::Arc;
use tracing::{debug, info, warn};

bitflags! {
    /// What the caller wants done besides computing a destination.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RedirectFlags: u32 {
        /// Drop the redirect unless the destination, the package VFS copy or
        /// the real location exists.
        const CHECK_FILE_PRESENCE = 0x0001;
        /// Copy the source into the destination on first use.
        const COPY_FILE = 0x0002;
        /// Create the destination's parent directories.
        const ENSURE_DIRECTORY_STRUCTURE = 0x0004;
    }
}

/// Outcome of [`RedirectionEngine::should_redirect`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectDecision {
    pub should_redirect: bool,
    /// Only meaningful when `should_redirect` is set.
    pub redirect_path: String,
    pub read_only: bool,
}

impl RedirectDecision {
    fn no_redirect() -> Self {
        Self::default()
    }
}

/// Directory that relative inputs are anchored to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorkingDir {
    /// The process's current directory, read on every call.
    #[default]
    Process,
    Fixed(String),
}

impl WorkingDir {
    fn current(&self) -> String {
        match self {
            WorkingDir::Process => std::env::current_dir()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            WorkingDir::Fixed(dir) => dir.clone(),
        }
    }
}

/// The redirect decision engine.
///
/// Built once, then shared read-only between any number of threads. The only
/// side effects of a query are directory creation and first-use copies on the
/// underlying [`FileSystem`], both of which tolerate concurrent callers.
#[derive(Debug, Clone)]
pub struct RedirectionEngine {
    mappings: VfsMappings,
    rules: RedirectionRules,
    resolver: Resolver,
    working_dir: WorkingDir,
    local_app_data: Option<String>,
    roaming_app_data: Option<String>,
}

impl RedirectionEngine {
    /// Derive the package layout, create its writable roots, and build the
    /// mapping table and rule list.
    pub fn initialize(
        identity: &PackageIdentity,
        config: &RedirectionConfig,
        folders: &dyn KnownFolderProvider,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self, EngineError> {
        let arch = Architecture::host();
        let layout = PackageLayout::new(identity)?;
        layout.initialize(fs.as_ref())?;

        let paths = config.normalize();
        let mappings = VfsMappings::build(folders, arch);
        let rules = RedirectionRules::from_config(&paths, &layout, folders, arch);
        info!(
            "redirection engine ready for {}: {} VFS mappings, {} rules",
            layout.package_family_name(),
            mappings.len(),
            rules.specs().len()
        );

        Ok(Self::from_parts(layout, mappings, rules, fs).with_app_data_roots(
            folders.known_folder(KnownFolder::LocalAppData),
            folders.known_folder(KnownFolder::RoamingAppData),
        ))
    }

    /// Assemble an engine from prebuilt tables. No directories are created.
    pub fn from_parts(
        layout: PackageLayout,
        mappings: VfsMappings,
        rules: RedirectionRules,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            mappings,
            rules,
            resolver: Resolver::new(layout, fs),
            working_dir: WorkingDir::default(),
            local_app_data: None,
            roaming_app_data: None,
        }
    }

    #[must_use]
    pub fn with_working_dir(mut self, working_dir: WorkingDir) -> Self {
        self.working_dir = working_dir;
        self
    }

    #[must_use]
    pub fn with_app_data_roots(mut self, local: Option<String>, roaming: Option<String>) -> Self {
        let trim = |p: String| trim_trailing_separators(&p).to_owned();
        self.local_app_data = local.map(trim);
        self.roaming_app_data = roaming.map(trim);
        self
    }

    pub fn layout(&self) -> &PackageLayout {
        self.resolver.layout()
    }

    pub fn mappings(&self) -> &VfsMappings {
        &self.mappings
    }

    pub fn rules(&self) -> &RedirectionRules {
        &self.rules
    }

    pub fn normalize(&self, raw: &str) -> NormalizedPath {
        normalize_path(raw, &self.working_dir.current())
    }

    pub fn devirtualize(&self, path: NormalizedPath) -> NormalizedPath {
        self.mappings.devirtualize(self.layout(), path)
    }

    pub fn virtualize(&self, path: NormalizedPath) -> NormalizedPath {
        self.mappings.virtualize(self.layout(), path)
    }

    /// Decide whether an access to `raw` should be redirected, and where.
    ///
    /// Never fails: problems creating directories or copying are logged and
    /// the destination is still reported, so the caller's own filesystem
    /// call surfaces the real error.
    pub fn should_redirect(&self, raw: &str, flags: RedirectFlags) -> RedirectDecision {
        debug!("should redirect {raw} ({flags:?})");
        let normalized = self.normalize(raw);
        if normalized.drive_absolute_path().is_none() {
            debug!("no drive-absolute form for {raw}");
            return RedirectDecision::no_redirect();
        }
        let devirtualized = self.devirtualize(normalized);
        let vfs = self.virtualize(self.normalize(raw));
        let Some(vfs_path) = vfs.drive_absolute_path() else {
            return RedirectDecision::no_redirect();
        };
        debug!(
            "devirtualized={} virtualized={vfs_path}",
            devirtualized.full_path()
        );

        let Some(hit) = self.rules.find_match(vfs_path) else {
            debug!("no redirect rule for {raw}");
            return RedirectDecision::no_redirect();
        };
        if hit.spec.is_exclusion {
            debug!("excluded by rule under {}", hit.spec.base_path);
            return RedirectDecision::no_redirect();
        }

        let ensure = flags.contains(RedirectFlags::ENSURE_DIRECTORY_STRUCTURE);
        let redirect_path = match self.resolver.resolve(&vfs, hit.spec, ensure) {
            Ok(path) => path,
            Err(EngineError::Materialize {
                destination,
                directory,
                source,
            }) => {
                warn!(
                    "could not create {directory} ({:?}, os error {})",
                    source.kind(),
                    os_code(&source)
                );
                destination
            }
            Err(e) => {
                warn!("{e}");
                return RedirectDecision::no_redirect();
            }
        };

        let fs = self.resolver.file_system();
        if flags.contains(RedirectFlags::CHECK_FILE_PRESENCE) {
            let present = fs.exists(&redirect_path)
                || fs.exists(vfs_path)
                || devirtualized.drive_absolute_path().is_some_and(|p| fs.exists(p));
            if !present {
                debug!("{raw} exists nowhere, not redirecting");
                return RedirectDecision::no_redirect();
            }
        }

        if flags.contains(RedirectFlags::COPY_FILE) {
            if let Err(e) = self.resolver.populate(
                &redirect_path,
                Some(vfs_path),
                devirtualized.drive_absolute_path(),
            ) {
                warn!("first-use copy failed: {e}");
            }
        }

        debug!("redirecting {raw} to {redirect_path}");
        RedirectDecision {
            should_redirect: true,
            redirect_path,
            read_only: hit.spec.is_read_only,
        }
    }

    /// UTF-16 entry point. Input stops at the first NUL, if any; unpaired
    /// surrogates are replaced.
    pub fn should_redirect_utf16(&self, raw: &[u16], flags: RedirectFlags) -> RedirectDecision {
        let end = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
        self.should_redirect(&String::from_utf16_lossy(&raw[..end]), flags)
    }

    pub fn is_under_user_app_data_local(&self, path: &str) -> bool {
        self.local_app_data
            .as_deref()
            .is_some_and(|root| relative_to(path, root).is_some())
    }

    pub fn is_under_user_app_data_roaming(&self, path: &str) -> bool {
        self.roaming_app_data
            .as_deref()
            .is_some_and(|root| relative_to(path, root).is_some())
    }

    /// Package VFS equivalent of a path in the user's app-data folders.
    pub fn package_vfs_path(&self, path: &str) -> Option<String> {
        let vfs_root = self.layout().package_vfs_root();
        let candidates = [
            (self.local_app_data.as_deref(), "Local AppData"),
            (self.roaming_app_data.as_deref(), "AppData"),
        ];
        candidates.into_iter().find_map(|(root, shadow)| {
            let rest = relative_to(path, root?)?;
            Some(join(&join(vfs_root, shadow), rest))
        })
    }
}
