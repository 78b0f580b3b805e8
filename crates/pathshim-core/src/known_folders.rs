use crate::winpath::{join, trim_trailing_separators};
use pathshim_schema::{Architecture, KnownFolder};
use std::collections::HashMap;
use tracing::debug;

/// Source of known-folder locations.
pub trait KnownFolderProvider: Send + Sync {
    /// Absolute location of `folder`, or `None` if it cannot be resolved.
    fn known_folder(&self, folder: KnownFolder) -> Option<String>;
}

/// Known-folder locations held in a table, built from the standard Windows
/// layout and optionally overridden from the process environment.
#[derive(Debug, Clone, Default)]
pub struct KnownFolderTable {
    folders: HashMap<KnownFolder, String>,
}

impl KnownFolderTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, folder: KnownFolder, path: impl Into<String>) -> Self {
        self.insert(folder, path);
        self
    }

    pub fn insert(&mut self, folder: KnownFolder, path: impl Into<String>) {
        let path = path.into();
        let trimmed = trim_trailing_separators(&path).to_owned();
        self.folders.insert(folder, trimmed);
    }

    pub fn remove(&mut self, folder: KnownFolder) {
        self.folders.remove(&folder);
    }

    /// The default Windows layout for a system drive (`C:`) and user profile
    /// directory (`C:\Users\me`).
    pub fn windows_defaults(system_drive: &str, user_profile: &str, arch: Architecture) -> Self {
        let drive = format!(r"{}\", system_drive.trim_end_matches(['\\', '/']));
        let windows = join(&drive, "Windows");
        let program_data = join(&drive, "ProgramData");
        let mut table = Self::new()
            .with(KnownFolder::Windows, windows.clone())
            .with(KnownFolder::System, join(&windows, "System32"))
            .with(KnownFolder::Fonts, join(&windows, "Fonts"))
            .with(KnownFolder::ProgramData, program_data.clone())
            .with(
                KnownFolder::CommonPrograms,
                join(&program_data, r"Microsoft\Windows\Start Menu\Programs"),
            )
            .with(KnownFolder::PublicDesktop, join(&drive, r"Users\Public\Desktop"))
            .with(KnownFolder::LocalAppData, join(user_profile, r"AppData\Local"))
            .with(KnownFolder::RoamingAppData, join(user_profile, r"AppData\Roaming"))
            .with(KnownFolder::LocalAppDataLow, join(user_profile, r"AppData\LocalLow"));

        match arch {
            Architecture::X64 => {
                let pf = join(&drive, "Program Files");
                let pf86 = join(&drive, "Program Files (x86)");
                table.insert(KnownFolder::SystemX86, join(&windows, "SysWOW64"));
                table.insert(KnownFolder::ProgramFilesX64, pf.clone());
                table.insert(KnownFolder::ProgramFilesCommonX64, join(&pf, "Common Files"));
                table.insert(KnownFolder::ProgramFilesX86, pf86.clone());
                table.insert(KnownFolder::ProgramFilesCommonX86, join(&pf86, "Common Files"));
            }
            Architecture::X86 => {
                let pf = join(&drive, "Program Files");
                table.insert(KnownFolder::SystemX86, join(&windows, "System32"));
                table.insert(KnownFolder::ProgramFilesX86, pf.clone());
                table.insert(KnownFolder::ProgramFilesCommonX86, join(&pf, "Common Files"));
            }
        }
        table
    }

    /// Build a table from environment variables as exposed by `lookup`,
    /// falling back to the default layout for anything unset.
    pub fn from_lookup(arch: Architecture, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let system_drive = var("SystemDrive").unwrap_or_else(|| "C:".to_owned());
        let user_profile = var("USERPROFILE").unwrap_or_else(|| join(&system_drive, r"Users\Default"));
        let mut table = Self::windows_defaults(&system_drive, &user_profile, arch);

        if let Some(root) = var("SystemRoot") {
            table.insert(KnownFolder::Windows, root.clone());
            table.insert(KnownFolder::System, join(&root, "System32"));
            table.insert(KnownFolder::Fonts, join(&root, "Fonts"));
            let wow = if arch == Architecture::X64 { "SysWOW64" } else { "System32" };
            table.insert(KnownFolder::SystemX86, join(&root, wow));
        }
        if let Some(data) = var("ProgramData") {
            table.insert(KnownFolder::ProgramData, data.clone());
            table.insert(
                KnownFolder::CommonPrograms,
                join(&data, r"Microsoft\Windows\Start Menu\Programs"),
            );
        }
        if let Some(public) = var("PUBLIC") {
            table.insert(KnownFolder::PublicDesktop, join(&public, "Desktop"));
        }
        if let Some(local) = var("LOCALAPPDATA") {
            table.insert(KnownFolder::LocalAppData, local);
        }
        if let Some(roaming) = var("APPDATA") {
            table.insert(KnownFolder::RoamingAppData, roaming);
        }

        let (native_pf, native_common) = match arch {
            Architecture::X64 => (KnownFolder::ProgramFilesX64, KnownFolder::ProgramFilesCommonX64),
            Architecture::X86 => (KnownFolder::ProgramFilesX86, KnownFolder::ProgramFilesCommonX86),
        };
        if let Some(pf) = var("ProgramFiles") {
            table.insert(native_pf, pf);
        }
        if let Some(common) = var("CommonProgramFiles") {
            table.insert(native_common, common);
        }
        if arch == Architecture::X64 {
            if let Some(pf86) = var("ProgramFiles(x86)") {
                table.insert(KnownFolder::ProgramFilesX86, pf86);
            }
            if let Some(common86) = var("CommonProgramFiles(x86)") {
                table.insert(KnownFolder::ProgramFilesCommonX86, common86);
            }
        }
        debug!("resolved {} known folders from environment", table.folders.len());
        table
    }

    pub fn from_env(arch: Architecture) -> Self {
        Self::from_lookup(arch, |name| std::env::var(name).ok())
    }
}

impl KnownFolderProvider for KnownFolderTable {
    fn known_folder(&self, folder: KnownFolder) -> Option<String> {
        self.folders.get(&folder).cloned()
    }
}

/// Resolve a configuration known-folder id (`"ProgramData"` or `{GUID}`).
pub fn resolve_known_folder_id(
    provider: &dyn KnownFolderProvider,
    id: &str,
    arch: Architecture,
) -> Option<String> {
    match KnownFolder::from_config_id(id, arch) {
        Ok(Some(folder)) => provider.known_folder(folder),
        Ok(None) => None,
        Err(e) => {
            debug!("{e}");
            None
        }
    }
}
