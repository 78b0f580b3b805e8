use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse JSON configuration: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("failed to parse TOML configuration: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unsupported configuration file extension: '{0}' (expected json or toml)")]
    UnsupportedFormat(String),
    #[error("redirection rule '{base}' has no patterns")]
    NoPatterns { base: String },
    #[error("unknown known folder id: {0}")]
    UnknownKnownFolder(String),
}

/// Top-level redirection configuration document.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RedirectionConfig {
    #[serde(default)]
    pub redirected_paths: RedirectedPaths,
}

/// The three rule groups, each anchored at a different base selector.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RedirectedPaths {
    /// Rules whose `base` is relative to the package root.
    #[serde(default)]
    pub package_relative: Vec<RedirectionRecord>,
    /// Rules whose `base` is relative to the root of the package's drive.
    #[serde(default)]
    pub package_drive_relative: Vec<RedirectionRecord>,
    #[serde(default)]
    pub known_folders: Vec<KnownFolderRules>,
}

/// Rules anchored at a known folder, identified by name or `{GUID}`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KnownFolderRules {
    pub id: String,
    #[serde(default)]
    pub relative_paths: Vec<RedirectionRecord>,
}

/// One configured rule record. Each pattern becomes its own redirection spec.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RedirectionRecord {
    pub base: String,
    pub patterns: Vec<String>,
    #[serde(default)]
    pub redirect_target_base: Option<String>,
    #[serde(default)]
    pub is_exclusion: bool,
    #[serde(default)]
    pub is_read_only: bool,
}

impl RedirectedPaths {
    /// Total number of patterns across all groups.
    pub fn pattern_count(&self) -> usize {
        let records = self
            .package_relative
            .iter()
            .chain(&self.package_drive_relative)
            .chain(self.known_folders.iter().flat_map(|g| &g.relative_paths));
        records.map(|r| r.patterns.len()).sum()
    }
}

pub fn parse_config_json(input: &str) -> Result<RedirectionConfig, ConfigError> {
    Ok(serde_json::from_str(input)?)
}

pub fn parse_config_toml(input: &str) -> Result<RedirectionConfig, ConfigError> {
    Ok(toml::from_str(input)?)
}

/// Parse a configuration file, choosing the format from its extension.
pub fn parse_config_file(path: impl AsRef<Path>) -> Result<RedirectionConfig, ConfigError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let content = fs::read_to_string(path)?;
    match ext.as_str() {
        "json" => parse_config_json(&content),
        "toml" => parse_config_toml(&content),
        other => Err(ConfigError::UnsupportedFormat(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_json_document() {
        let input = r#"{
            "redirectedPaths": {
                "packageRelative": [
                    { "base": "logs", "patterns": [".*\\.log"] }
                ],
                "packageDriveRelative": [
                    { "base": "temp", "patterns": [".*"], "isReadOnly": true }
                ],
                "knownFolders": [
                    {
                        "id": "ProgramData",
                        "relativePaths": [
                            {
                                "base": "Vendor",
                                "patterns": [".*\\.ini", ".*\\.cfg"],
                                "redirectTargetBase": "H:\\Roaming",
                                "isExclusion": false
                            }
                        ]
                    }
                ]
            }
        }"#;
        let config = parse_config_json(input).expect("should parse");
        let paths = &config.redirected_paths;
        assert_eq!(paths.package_relative[0].base, "logs");
        assert!(paths.package_drive_relative[0].is_read_only);
        assert_eq!(paths.known_folders[0].id, "ProgramData");
        let record = &paths.known_folders[0].relative_paths[0];
        assert_eq!(record.redirect_target_base.as_deref(), Some("H:\\Roaming"));
        assert!(!record.is_exclusion);
        assert_eq!(paths.pattern_count(), 4);
    }

    #[test]
    fn parses_toml_document() {
        let input = r#"
[[redirectedPaths.packageRelative]]
base = "data"
patterns = ['.*\.dat']
isExclusion = true
"#;
        let config = parse_config_toml(input).expect("should parse");
        let record = &config.redirected_paths.package_relative[0];
        assert_eq!(record.patterns, vec![r".*\.dat"]);
        assert!(record.is_exclusion);
        assert!(!record.is_read_only);
        assert!(record.redirect_target_base.is_none());
    }

    #[test]
    fn missing_groups_default_to_empty() {
        let config = parse_config_json("{}").unwrap();
        assert_eq!(config, RedirectionConfig::default());
        assert_eq!(config.redirected_paths.pattern_count(), 0);
    }

    #[test]
    fn rejects_record_without_patterns_field() {
        let input = r#"{ "redirectedPaths": { "packageRelative": [ { "base": "x" } ] } }"#;
        assert!(parse_config_json(input).is_err());
    }

    #[test]
    fn parse_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("config.json");
        fs::write(
            &json,
            r#"{"redirectedPaths":{"packageRelative":[{"base":"a","patterns":[".*"]}]}}"#,
        )
        .unwrap();
        assert_eq!(parse_config_file(&json).unwrap().redirected_paths.pattern_count(), 1);

        let other = dir.path().join("config.yaml");
        fs::write(&other, "").unwrap();
        assert!(matches!(
            parse_config_file(&other),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
