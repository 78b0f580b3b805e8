use crate::known_folders::{resolve_known_folder_id, KnownFolderProvider};
use crate::package::PackageLayout;
use crate::winpath::{join, relative_to, trim_trailing_separators};
use pathshim_schema::{Architecture, RedirectedPaths, RedirectionRecord};
use regex::Regex;
use tracing::{debug, info, warn};

/// One configured rule: a base directory plus a pattern the remainder of a
/// path under that base must fully match.
#[derive(Debug, Clone)]
pub struct RedirectionSpec {
    pub base_path: String,
    pub pattern: String,
    regex: Regex,
    pub target_base: String,
    pub is_exclusion: bool,
    pub is_read_only: bool,
}

impl RedirectionSpec {
    /// Compile `pattern` as a whole-string match.
    pub fn new(
        base_path: &str,
        pattern: &str,
        target_base: &str,
        is_exclusion: bool,
        is_read_only: bool,
    ) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self {
            base_path: trim_trailing_separators(base_path).to_owned(),
            pattern: pattern.to_owned(),
            regex,
            target_base: trim_trailing_separators(target_base).to_owned(),
            is_exclusion,
            is_read_only,
        })
    }

    /// Remainder of `path` below `base_path` if the pattern fully matches it.
    pub fn matches<'a>(&self, path: &'a str) -> Option<&'a str> {
        let relative = relative_to(path, &self.base_path)?;
        self.regex.is_match(relative).then_some(relative)
    }
}

/// The rule that decided a path, and the path's remainder under its base.
#[derive(Debug, Clone, Copy)]
pub struct RuleMatch<'a> {
    pub spec: &'a RedirectionSpec,
    pub relative_path: &'a str,
}

/// Ordered rule list. The first rule whose base and pattern both match wins,
/// whether it includes or excludes.
#[derive(Debug, Clone, Default)]
pub struct RedirectionRules {
    specs: Vec<RedirectionSpec>,
}

impl RedirectionRules {
    pub fn new(specs: Vec<RedirectionSpec>) -> Self {
        Self { specs }
    }

    /// Expand configuration records into specs: package-relative group first,
    /// then package-drive-relative, then known folders. Each pattern of a
    /// record becomes its own spec.
    pub fn from_config(
        paths: &RedirectedPaths,
        layout: &PackageLayout,
        folders: &dyn KnownFolderProvider,
        arch: Architecture,
    ) -> Self {
        let mut rules = Self::default();
        rules.add_group(layout.package_root(), &paths.package_relative, layout);

        let drive_root = format!(r"{}:\", layout.package_drive());
        rules.add_group(&drive_root, &paths.package_drive_relative, layout);

        for group in &paths.known_folders {
            let Some(folder) = resolve_known_folder_id(folders, group.id.trim(), arch) else {
                warn!(
                    "known folder '{}' did not resolve; its {} rules are inert",
                    group.id,
                    group.relative_paths.len()
                );
                continue;
            };
            rules.add_group(&folder, &group.relative_paths, layout);
        }
        info!("loaded {} redirection rules", rules.specs.len());
        rules
    }

    fn add_group(&mut self, root: &str, records: &[RedirectionRecord], layout: &PackageLayout) {
        for record in records {
            let base = join(root, record.base.trim());
            let target = match record.redirect_target_base.as_deref().map(str::trim) {
                Some(t) if !t.is_empty() => t,
                Some(_) => {
                    debug!("rule under {base} has a blank target; using the writable package root");
                    layout.writable_package_root()
                }
                None => layout.writable_package_root(),
            };
            for pattern in &record.patterns {
                match RedirectionSpec::new(&base, pattern, target, record.is_exclusion, record.is_read_only) {
                    Ok(spec) => {
                        info!(
                            "rule: base={} pattern={} target={}{}",
                            spec.base_path,
                            spec.pattern,
                            spec.target_base,
                            if spec.is_exclusion { " (exclusion)" } else { "" }
                        );
                        self.specs.push(spec);
                    }
                    Err(e) => warn!("rule under {base} with pattern '{pattern}' is inert: {e}"),
                }
            }
        }
    }

    pub fn specs(&self) -> &[RedirectionSpec] {
        &self.specs
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn find_match<'a>(&'a self, vfs_path: &'a str) -> Option<RuleMatch<'a>> {
        for spec in &self.specs {
            match spec.matches(vfs_path) {
                Some(relative_path) => {
                    debug!("matched base {} with '{relative_path}'", spec.base_path);
                    return Some(RuleMatch { spec, relative_path });
                }
                None => debug!("no match against base {}", spec.base_path),
            }
        }
        None
    }
}
