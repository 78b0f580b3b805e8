//! Path redirection engine for packaged applications.
//!
//! A packaged application runs from a read-only install image, but still
//! expects to write next to its binaries and into system locations. This crate
//! decides, for any path the application hands to a filesystem API, whether the
//! access should go to a per-user writable location instead, and where.
//!
//! The pipeline is: [`normalize_path`] → [`VfsMappings::devirtualize`] /
//! [`VfsMappings::virtualize`] → [`RedirectionRules::find_match`] →
//! [`Resolver::resolve`], orchestrated by [`RedirectionEngine::should_redirect`].
//! All tables are built once at [`RedirectionEngine::initialize`] and are
//! read-only afterwards, so the engine can be shared across threads.

pub mod engine;
pub mod known_folders;
pub mod normalize;
pub mod package;
pub mod resolver;
pub mod rules;
pub mod vfs;
pub mod winpath;

pub use engine::{RedirectDecision, RedirectFlags, RedirectionEngine, WorkingDir};
pub use known_folders::{resolve_known_folder_id, KnownFolderProvider, KnownFolderTable};
pub use normalize::{normalize_path, NormalizedPath};
pub use package::{PackageIdentity, PackageLayout};
pub use resolver::{RedirectTarget, Resolver};
pub use rules::{RedirectionRules, RedirectionSpec, RuleMatch};
pub use vfs::{VfsFolderMapping, VfsMappings};
pub use winpath::PathKind;

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid package root '{0}': expected a drive-absolute path")]
    InvalidPackageRoot(String),
    #[error("failed to create {path}: {source}")]
    CreateRoot {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot compute a redirect destination for '{0}'")]
    Unresolvable(String),
    #[error("failed to create directory {directory} for {destination}: {source}")]
    Materialize {
        destination: String,
        directory: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to populate {destination} from {source_path}: {source}")]
    Populate {
        destination: String,
        source_path: String,
        #[source]
        source: io::Error,
    },
}

/// Raw OS error code of `err`, or 0 when it has none.
pub(crate) fn os_code(err: &io::Error) -> i32 {
    err.raw_os_error().unwrap_or(0)
}
