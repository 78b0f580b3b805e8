//! Known-folder identifiers.
//!
//! A known folder is an OS-resolved, semantically named directory. Configuration
//! refers to them either by a short name (`"ProgramData"`) or by the `{GUID}` of
//! the corresponding shell folder id.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KnownFolder {
    SystemX86,
    System,
    ProgramFilesX86,
    ProgramFilesCommonX86,
    ProgramFilesX64,
    ProgramFilesCommonX64,
    Windows,
    ProgramData,
    LocalAppData,
    RoamingAppData,
    Fonts,
    PublicDesktop,
    CommonPrograms,
    LocalAppDataLow,
}

/// Processor architecture of the hosting process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    X86,
    X64,
}

impl Architecture {
    pub fn host() -> Self {
        if cfg!(target_pointer_width = "32") {
            Architecture::X86
        } else {
            Architecture::X64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown known folder id '{0}'")]
pub struct UnknownKnownFolder(pub String);

const GUIDS: &[(KnownFolder, &str)] = &[
    (KnownFolder::SystemX86, "{D65231B0-B2F1-4857-A4CE-A8E7C6EA7D27}"),
    (KnownFolder::System, "{1AC14E77-02E7-4E5D-B744-2EB1AE5198B7}"),
    (KnownFolder::ProgramFilesX86, "{7C5A40EF-A0FB-4BFC-874A-C0F2E0B9FA8E}"),
    (KnownFolder::ProgramFilesCommonX86, "{DE974D24-D9C6-4D3E-BF91-F4455120B917}"),
    (KnownFolder::ProgramFilesX64, "{6D809377-6AF0-444B-8957-A3773F02200E}"),
    (KnownFolder::ProgramFilesCommonX64, "{6365D5A7-0F0D-45E5-87F6-0DA56B6A4F7D}"),
    (KnownFolder::Windows, "{F38BF404-1D43-42F2-9305-67DE0B28FC23}"),
    (KnownFolder::ProgramData, "{62AB5D82-FDC1-4DC3-A9DD-070D1D495D97}"),
    (KnownFolder::LocalAppData, "{F1B32785-6FBA-4FCF-9D55-7B8E7F157091}"),
    (KnownFolder::RoamingAppData, "{3EB685DB-65F9-4CF6-A03A-E3EF65729F3D}"),
    (KnownFolder::Fonts, "{FD228CB7-AE11-4AE3-864C-16F3910AB8FE}"),
    (KnownFolder::PublicDesktop, "{C4AA340D-F20F-4863-AFEF-F87EF2E6BA25}"),
    (KnownFolder::CommonPrograms, "{0139D44E-6AFE-49F2-8690-3DAFCAE6FFB8}"),
    (KnownFolder::LocalAppDataLow, "{A520A1A4-1780-4FF6-BD18-167343C5AF16}"),
];

impl KnownFolder {
    pub const ALL: [KnownFolder; 14] = [
        KnownFolder::SystemX86,
        KnownFolder::System,
        KnownFolder::ProgramFilesX86,
        KnownFolder::ProgramFilesCommonX86,
        KnownFolder::ProgramFilesX64,
        KnownFolder::ProgramFilesCommonX64,
        KnownFolder::Windows,
        KnownFolder::ProgramData,
        KnownFolder::LocalAppData,
        KnownFolder::RoamingAppData,
        KnownFolder::Fonts,
        KnownFolder::PublicDesktop,
        KnownFolder::CommonPrograms,
        KnownFolder::LocalAppDataLow,
    ];

    pub fn name(self) -> &'static str {
        match self {
            KnownFolder::SystemX86 => "SystemX86",
            KnownFolder::System => "System",
            KnownFolder::ProgramFilesX86 => "ProgramFilesX86",
            KnownFolder::ProgramFilesCommonX86 => "ProgramFilesCommonX86",
            KnownFolder::ProgramFilesX64 => "ProgramFilesX64",
            KnownFolder::ProgramFilesCommonX64 => "ProgramFilesCommonX64",
            KnownFolder::Windows => "Windows",
            KnownFolder::ProgramData => "ProgramData",
            KnownFolder::LocalAppData => "LocalAppData",
            KnownFolder::RoamingAppData => "RoamingAppData",
            KnownFolder::Fonts => "Fonts",
            KnownFolder::PublicDesktop => "PublicDesktop",
            KnownFolder::CommonPrograms => "CommonPrograms",
            KnownFolder::LocalAppDataLow => "LocalAppDataLow",
        }
    }

    pub fn guid(self) -> &'static str {
        GUIDS
            .iter()
            .find(|(folder, _)| *folder == self)
            .map_or("", |(_, guid)| guid)
    }

    /// 64-bit program-files folders do not exist for a 32-bit process.
    pub fn available_on(self, arch: Architecture) -> bool {
        !matches!(
            (self, arch),
            (
                KnownFolder::ProgramFilesX64 | KnownFolder::ProgramFilesCommonX64,
                Architecture::X86
            )
        )
    }

    /// Resolve a configuration id for the given host architecture.
    ///
    /// Returns `Ok(None)` for an id that is valid but has no folder on this
    /// architecture.
    pub fn from_config_id(
        id: &str,
        arch: Architecture,
    ) -> Result<Option<KnownFolder>, UnknownKnownFolder> {
        let folder: KnownFolder = id.parse()?;
        Ok(folder.available_on(arch).then_some(folder))
    }
}

impl FromStr for KnownFolder {
    type Err = UnknownKnownFolder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim();
        if id.len() >= 38 && id.starts_with('{') {
            return GUIDS
                .iter()
                .find(|(_, guid)| guid.eq_ignore_ascii_case(id))
                .map(|(folder, _)| *folder)
                .ok_or_else(|| UnknownKnownFolder(s.to_owned()));
        }
        // Only the names the configuration format documents are accepted.
        match id {
            "SystemX86" => Ok(KnownFolder::SystemX86),
            "System" => Ok(KnownFolder::System),
            "ProgramFilesX86" => Ok(KnownFolder::ProgramFilesX86),
            "ProgramFilesCommonX86" => Ok(KnownFolder::ProgramFilesCommonX86),
            "ProgramFilesX64" => Ok(KnownFolder::ProgramFilesX64),
            "ProgramFilesCommonX64" => Ok(KnownFolder::ProgramFilesCommonX64),
            "Windows" => Ok(KnownFolder::Windows),
            "ProgramData" => Ok(KnownFolder::ProgramData),
            "LocalAppData" => Ok(KnownFolder::LocalAppData),
            "RoamingAppData" => Ok(KnownFolder::RoamingAppData),
            _ => Err(UnknownKnownFolder(s.to_owned())),
        }
    }
}

impl fmt::Display for KnownFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_documented_names() {
        assert_eq!("ProgramData".parse::<KnownFolder>(), Ok(KnownFolder::ProgramData));
        assert_eq!("SystemX86".parse::<KnownFolder>(), Ok(KnownFolder::SystemX86));
        assert_eq!("RoamingAppData".parse::<KnownFolder>(), Ok(KnownFolder::RoamingAppData));
    }

    #[test]
    fn undocumented_names_are_rejected() {
        assert!("Fonts".parse::<KnownFolder>().is_err());
        assert!("programdata".parse::<KnownFolder>().is_err());
    }

    #[test]
    fn parses_guid_case_insensitively() {
        let folder: KnownFolder = "{f38bf404-1d43-42f2-9305-67de0b28fc23}".parse().unwrap();
        assert_eq!(folder, KnownFolder::Windows);
        let fonts: KnownFolder = KnownFolder::Fonts.guid().parse().unwrap();
        assert_eq!(fonts, KnownFolder::Fonts);
    }

    #[test]
    fn unknown_guid_is_an_error() {
        let err = "{00000000-0000-0000-0000-000000000000}"
            .parse::<KnownFolder>()
            .unwrap_err();
        assert!(err.to_string().contains("00000000"));
    }

    #[test]
    fn every_folder_has_a_guid() {
        for folder in KnownFolder::ALL {
            assert_eq!(folder.guid().len(), 38, "{folder}");
        }
    }

    #[test]
    fn x64_program_files_unavailable_on_x86() {
        assert_eq!(
            KnownFolder::from_config_id("ProgramFilesX64", Architecture::X86),
            Ok(None)
        );
        assert_eq!(
            KnownFolder::from_config_id("ProgramFilesX64", Architecture::X64),
            Ok(Some(KnownFolder::ProgramFilesX64))
        );
        assert_eq!(
            KnownFolder::from_config_id("ProgramFilesX86", Architecture::X86),
            Ok(Some(KnownFolder::ProgramFilesX86))
        );
    }
}
