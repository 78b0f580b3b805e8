use crate::known_folders::KnownFolderProvider;
use crate::normalize::NormalizedPath;
use crate::package::PackageLayout;
use crate::winpath::{join, path_kind, relative_to, trim_trailing_separators, PathKind};
use pathshim_schema::{Architecture, KnownFolder};
use tracing::{debug, warn};

/// A real system location and the name of its shadow folder under the
/// package's `VFS` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsFolderMapping {
    pub real_path: String,
    pub shadow_name: String,
}

impl VfsFolderMapping {
    pub fn new(real_path: impl Into<String>, shadow_name: impl Into<String>) -> Self {
        let real_path = real_path.into();
        Self {
            real_path: trim_trailing_separators(&real_path).to_owned(),
            shadow_name: shadow_name.into(),
        }
    }
}

/// Shadow folders, as `(folder, sub-path under folder, shadow name)`, in the
/// order they are registered. Order matters: devirtualization takes the first
/// match, virtualization the last.
const LAYOUT_COMMON_HEAD: &[(KnownFolder, &str, &str)] = &[
    (KnownFolder::SystemX86, "", "SystemX86"),
    (KnownFolder::ProgramFilesX86, "", "ProgramFilesX86"),
    (KnownFolder::ProgramFilesCommonX86, "", "ProgramFilesCommonX86"),
];

const LAYOUT_X64_ONLY: &[(KnownFolder, &str, &str)] = &[
    (KnownFolder::System, "", "SystemX64"),
    (KnownFolder::ProgramFilesX64, "", "ProgramFilesX64"),
    (KnownFolder::ProgramFilesCommonX64, "", "ProgramFilesCommonX64"),
];

const LAYOUT_COMMON_TAIL: &[(KnownFolder, &str, &str)] = &[
    (KnownFolder::Windows, "", "Windows"),
    (KnownFolder::ProgramData, "", "Common AppData"),
    (KnownFolder::System, "", "System"),
    (KnownFolder::System, "catroot", "AppVSystem32Catroot"),
    (KnownFolder::System, "catroot2", "AppVSystem32Catroot2"),
    (KnownFolder::System, r"drivers\etc", "AppVSystem32DriversEtc"),
    (KnownFolder::System, "driverstore", "AppVSystem32Driverstore"),
    (KnownFolder::System, "logfiles", "AppVSystem32Logfiles"),
    (KnownFolder::System, "spool", "AppVSystem32Spool"),
    (KnownFolder::LocalAppData, "", "Local AppData"),
    (KnownFolder::RoamingAppData, "", "AppData"),
    (KnownFolder::Fonts, "", "Fonts"),
    (KnownFolder::PublicDesktop, "", "Common Desktop"),
    (KnownFolder::CommonPrograms, "", "Common Programs"),
    (KnownFolder::LocalAppDataLow, "", "LOCALAPPDATALOW"),
];

/// Ordered mapping table between real locations and package VFS folders.
#[derive(Debug, Clone, Default)]
pub struct VfsMappings {
    entries: Vec<VfsFolderMapping>,
}

impl VfsMappings {
    pub fn build(provider: &dyn KnownFolderProvider, arch: Architecture) -> Self {
        let x64: &[_] = if arch == Architecture::X64 { LAYOUT_X64_ONLY } else { &[] };
        let mut entries = Vec::new();
        for &(folder, sub, shadow) in LAYOUT_COMMON_HEAD.iter().chain(x64).chain(LAYOUT_COMMON_TAIL) {
            let Some(root) = provider.known_folder(folder) else {
                warn!("known folder {folder} unavailable, no VFS mapping for '{shadow}'");
                continue;
            };
            if path_kind(&root) != PathKind::DriveAbsolute {
                warn!("known folder {folder} is not drive-absolute ({root}), skipping '{shadow}'");
                continue;
            }
            entries.push(VfsFolderMapping::new(join(&root, sub), shadow));
        }
        debug!("built {} VFS folder mappings", entries.len());
        Self { entries }
    }

    /// Use an explicit table. Entries whose real path is not drive-absolute
    /// are dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = VfsFolderMapping>) -> Self {
        let entries = entries
            .into_iter()
            .filter(|m| {
                let ok = path_kind(&m.real_path) == PathKind::DriveAbsolute;
                if !ok {
                    warn!("ignoring VFS mapping '{}' -> {}", m.shadow_name, m.real_path);
                }
                ok
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[VfsFolderMapping] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map a path inside the package VFS tree to the real location it
    /// shadows. Anything else is returned unchanged.
    pub fn devirtualize(&self, layout: &PackageLayout, path: NormalizedPath) -> NormalizedPath {
        let Some(vfs_relative) = path
            .drive_absolute_path()
            .and_then(|p| relative_to(p, layout.package_vfs_root()))
        else {
            return path;
        };
        for mapping in &self.entries {
            if let Some(rest) = relative_to(vfs_relative, &mapping.shadow_name) {
                let real = join(&mapping.real_path, rest);
                debug!("devirtualized via '{}' to {real}", mapping.shadow_name);
                return NormalizedPath::from_full_path(real);
            }
        }
        path
    }

    /// Map a real location to its equivalent under the package VFS tree.
    /// Paths already inside the package, or outside every mapped folder, are
    /// returned unchanged.
    pub fn virtualize(&self, layout: &PackageLayout, path: NormalizedPath) -> NormalizedPath {
        let Some(drive_absolute) = path.drive_absolute_path() else {
            return path;
        };
        if relative_to(drive_absolute, layout.package_root()).is_some() {
            debug!("already in package: {drive_absolute}");
            return path;
        }
        for mapping in self.entries.iter().rev() {
            if let Some(rest) = relative_to(drive_absolute, &mapping.real_path) {
                let shadow = join(layout.package_vfs_root(), &mapping.shadow_name);
                let virtualized = join(&shadow, rest);
                debug!("virtualized via {} to {virtualized}", mapping.real_path);
                return NormalizedPath::from_full_path(virtualized);
            }
        }
        path
    }
}
