use crate::config::{ConfigError, KnownFolderRules, RedirectedPaths, RedirectionConfig, RedirectionRecord};
use crate::known_folder::KnownFolder;
use tracing::{debug, warn};

impl RedirectionConfig {
    /// Normalize the document: trim bases and targets, drop empty patterns, and
    /// skip records that are left without any pattern.
    ///
    /// Group and record order is preserved; rule precedence depends on it.
    pub fn normalize(&self) -> RedirectedPaths {
        let paths = &self.redirected_paths;
        let known_folders = paths
            .known_folders
            .iter()
            .map(|group| KnownFolderRules {
                id: group.id.trim().to_owned(),
                relative_paths: normalize_records(&group.relative_paths),
            })
            .collect();

        RedirectedPaths {
            package_relative: normalize_records(&paths.package_relative),
            package_drive_relative: normalize_records(&paths.package_drive_relative),
            known_folders,
        }
    }

    /// Like [`normalize`](Self::normalize), but rejects records without
    /// patterns and requires every known-folder id to name a folder this
    /// crate knows about.
    pub fn normalize_strict(&self) -> Result<RedirectedPaths, ConfigError> {
        let paths = &self.redirected_paths;
        let records = paths
            .package_relative
            .iter()
            .chain(&paths.package_drive_relative)
            .chain(paths.known_folders.iter().flat_map(|g| &g.relative_paths));
        for record in records {
            if normalize_record(record).is_none() {
                return Err(ConfigError::NoPatterns {
                    base: record.base.trim().to_owned(),
                });
            }
        }
        for group in &paths.known_folders {
            group
                .id
                .trim()
                .parse::<KnownFolder>()
                .map_err(|e| ConfigError::UnknownKnownFolder(e.0))?;
        }
        Ok(self.normalize())
    }
}

fn normalize_records(records: &[RedirectionRecord]) -> Vec<RedirectionRecord> {
    records
        .iter()
        .filter_map(|record| {
            let normalized = normalize_record(record);
            if normalized.is_none() {
                warn!("skipping redirection rule '{}': no patterns", record.base.trim());
            }
            normalized
        })
        .collect()
}

fn normalize_record(record: &RedirectionRecord) -> Option<RedirectionRecord> {
    let patterns: Vec<String> = record
        .patterns
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect();
    if patterns.is_empty() {
        return None;
    }

    let redirect_target_base = match record.redirect_target_base.as_deref().map(str::trim) {
        Some("") => {
            debug!(
                "redirection rule '{}' has a blank target; it will use the default",
                record.base.trim()
            );
            None
        }
        other => other.map(str::to_owned),
    };

    Some(RedirectionRecord {
        base: record.base.trim().to_owned(),
        patterns,
        redirect_target_base,
        is_exclusion: record.is_exclusion,
        is_read_only: record.is_read_only,
    })
}

#[cfg(test)]
mod tests {
    use crate::config::{parse_config_json, ConfigError};

    #[test]
    fn trims_and_drops_empty_values() {
        let config = parse_config_json(
            r#"{"redirectedPaths":{"packageRelative":[
                {"base":"  logs ","patterns":["", ".*"],"redirectTargetBase":"  "}
            ]}}"#,
        )
        .unwrap();
        let paths = config.normalize();
        let record = &paths.package_relative[0];
        assert_eq!(record.base, "logs");
        assert_eq!(record.patterns, vec![".*"]);
        assert!(record.redirect_target_base.is_none());
    }

    #[test]
    fn preserves_record_order() {
        let config = parse_config_json(
            r#"{"redirectedPaths":{"packageRelative":[
                {"base":"b","patterns":["x"],"isExclusion":true},
                {"base":"a","patterns":["y"]}
            ]}}"#,
        )
        .unwrap();
        let paths = config.normalize();
        assert_eq!(paths.package_relative[0].base, "b");
        assert!(paths.package_relative[0].is_exclusion);
        assert_eq!(paths.package_relative[1].base, "a");
    }

    #[test]
    fn skips_record_with_only_empty_patterns() {
        let config = parse_config_json(
            r#"{"redirectedPaths":{"packageDriveRelative":[
                {"base":"tmp","patterns":[""]},
                {"base":"keep","patterns":[".*"]},
                {"base":"none","patterns":[]}
            ]}}"#,
        )
        .unwrap();
        let paths = config.normalize();
        assert_eq!(paths.package_drive_relative.len(), 1);
        assert_eq!(paths.package_drive_relative[0].base, "keep");
        assert!(matches!(
            config.normalize_strict(),
            Err(ConfigError::NoPatterns { base }) if base == "tmp"
        ));
    }

    #[test]
    fn strict_normalization_rejects_unknown_folder_ids() {
        let config = parse_config_json(
            r#"{"redirectedPaths":{"knownFolders":[
                {"id":"Nowhere","relativePaths":[{"base":"x","patterns":[".*"]}]}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(config.normalize().known_folders.len(), 1);
        assert!(matches!(
            config.normalize_strict(),
            Err(ConfigError::UnknownKnownFolder(id)) if id == "Nowhere"
        ));
    }
}
