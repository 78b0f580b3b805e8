//! Redirection configuration schema for pathshim.
//!
//! This crate defines the configuration layer: the `redirectedPaths` document
//! (`RedirectionConfig`) with its three rule groups, the per-rule record
//! (`RedirectionRecord`), JSON/TOML parsing, record normalization, and the
//! `KnownFolder` identifier used by known-folder-relative rules and the VFS
//! mapping table.

pub mod config;
pub mod known_folder;
pub mod normalize;

pub use config::{
    parse_config_file, parse_config_json, parse_config_toml, ConfigError, KnownFolderRules,
    RedirectedPaths, RedirectionConfig, RedirectionRecord,
};
pub use known_folder::{Architecture, KnownFolder, UnknownKnownFolder};
