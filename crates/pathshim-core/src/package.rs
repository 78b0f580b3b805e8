use crate::winpath::{join, path_kind, paths_equal, strip_prefix_ignore_case, trim_trailing_separators, PathKind};
use crate::EngineError;
use pathshim_fs::FileSystem;
use tracing::{debug, info};

/// Identity facts about the running package, as supplied by the host.
#[derive(Debug, Clone, Default)]
pub struct PackageIdentity {
    /// Install location of the package image (`C:\Program Files\WindowsApps\...`).
    pub package_root: String,
    /// Run-time mount of the package when it differs from `package_root`.
    pub final_package_root: Option<String>,
    pub package_family_name: String,
    /// The user's local app-data folder.
    pub local_app_data: String,
    pub writable_root_override: Option<String>,
    pub redirect_root_override: Option<String>,
}

impl PackageIdentity {
    pub fn new(
        package_root: impl Into<String>,
        package_family_name: impl Into<String>,
        local_app_data: impl Into<String>,
    ) -> Self {
        Self {
            package_root: package_root.into(),
            package_family_name: package_family_name.into(),
            local_app_data: local_app_data.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_final_package_root(mut self, root: impl Into<String>) -> Self {
        self.final_package_root = Some(root.into());
        self
    }

    #[must_use]
    pub fn with_writable_root(mut self, root: impl Into<String>) -> Self {
        self.writable_root_override = Some(root.into());
        self
    }

    #[must_use]
    pub fn with_redirect_root(mut self, root: impl Into<String>) -> Self {
        self.redirect_root_override = Some(root.into());
        self
    }
}

/// The derived path roots every other component works against.
///
/// `package_root` is stored lower-cased with no trailing separator; all other
/// roots keep their case. Roots never end in a separator (except a bare drive
/// root such as `C:\`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    package_root: String,
    final_package_root: String,
    package_vfs_root: String,
    writable_package_root: String,
    redirect_root: String,
    package_family_name: String,
}

fn strip_device_prefix(path: &str) -> &str {
    strip_prefix_ignore_case(path, r"\\?\")
        .or_else(|| strip_prefix_ignore_case(path, r"\\.\"))
        .unwrap_or(path)
}

impl PackageLayout {
    pub fn new(identity: &PackageIdentity) -> Result<Self, EngineError> {
        let root = strip_device_prefix(identity.package_root.trim());
        if path_kind(root) != PathKind::DriveAbsolute {
            return Err(EngineError::InvalidPackageRoot(identity.package_root.clone()));
        }
        let package_root = trim_trailing_separators(root).to_lowercase();
        let final_package_root = identity
            .final_package_root
            .as_deref()
            .map_or_else(|| package_root.clone(), |r| trim_trailing_separators(r.trim()).to_owned());

        let family = identity.package_family_name.trim().to_owned();
        let package_data = join(
            &join(&identity.local_app_data, "Packages"),
            &format!(r"{family}\LocalCache\Local"),
        );
        let redirect_root = identity
            .redirect_root_override
            .as_deref()
            .map_or_else(|| join(&package_data, "VFS"), |r| trim_trailing_separators(r).to_owned());
        let writable_package_root = identity.writable_root_override.as_deref().map_or_else(
            || join(&package_data, r"Microsoft\WritablePackageRoot"),
            |r| trim_trailing_separators(r).to_owned(),
        );

        let layout = Self {
            package_vfs_root: join(&package_root, "VFS"),
            package_root,
            final_package_root,
            writable_package_root,
            redirect_root,
            package_family_name: family,
        };
        debug!(
            "package layout: root={} vfs={} writable={} redirect={}",
            layout.package_root, layout.package_vfs_root, layout.writable_package_root, layout.redirect_root
        );
        Ok(layout)
    }

    #[inline]
    pub fn package_root(&self) -> &str {
        &self.package_root
    }

    #[inline]
    pub fn final_package_root(&self) -> &str {
        &self.final_package_root
    }

    #[inline]
    pub fn package_vfs_root(&self) -> &str {
        &self.package_vfs_root
    }

    #[inline]
    pub fn writable_package_root(&self) -> &str {
        &self.writable_package_root
    }

    #[inline]
    pub fn redirect_root(&self) -> &str {
        &self.redirect_root
    }

    #[inline]
    pub fn package_family_name(&self) -> &str {
        &self.package_family_name
    }

    /// Upper-case drive letter of the package root.
    pub fn package_drive(&self) -> char {
        self.package_root
            .chars()
            .next()
            .map_or('C', |c| c.to_ascii_uppercase())
    }

    pub fn is_default_writable_root(&self, target_base: &str) -> bool {
        paths_equal(target_base, &self.writable_package_root)
    }

    pub fn is_default_redirect_root(&self, target_base: &str) -> bool {
        paths_equal(target_base, &self.redirect_root)
    }

    /// Create the writable and redirect roots. Without them no redirect can
    /// ever succeed, so failure here aborts startup.
    pub fn initialize(&self, fs: &dyn FileSystem) -> Result<(), EngineError> {
        for root in [&self.redirect_root, &self.writable_package_root] {
            fs.create_dir_all(root).map_err(|source| EngineError::CreateRoot {
                path: root.clone(),
                source,
            })?;
        }
        info!("initialized package roots on {} filesystem", fs.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathshim_fs::MemoryFileSystem;

    fn identity() -> PackageIdentity {
        PackageIdentity::new(
            r"\\?\C:\Program Files\WindowsApps\Contoso.App_1.0_x64__abc\",
            "Contoso.App_abc",
            r"C:\Users\me\AppData\Local",
        )
    }

    #[test]
    fn derives_roots_from_identity() {
        let layout = PackageLayout::new(&identity()).unwrap();
        assert_eq!(
            layout.package_root(),
            r"c:\program files\windowsapps\contoso.app_1.0_x64__abc"
        );
        assert_eq!(
            layout.package_vfs_root(),
            r"c:\program files\windowsapps\contoso.app_1.0_x64__abc\VFS"
        );
        assert_eq!(layout.final_package_root(), layout.package_root());
        assert_eq!(
            layout.redirect_root(),
            r"C:\Users\me\AppData\Local\Packages\Contoso.App_abc\LocalCache\Local\VFS"
        );
        assert_eq!(
            layout.writable_package_root(),
            r"C:\Users\me\AppData\Local\Packages\Contoso.App_abc\LocalCache\Local\Microsoft\WritablePackageRoot"
        );
        assert_eq!(layout.package_drive(), 'C');
    }

    #[test]
    fn overrides_replace_derived_roots() {
        let layout = PackageLayout::new(
            &identity()
                .with_final_package_root(r"\\?\D:\Mounted\App\")
                .with_writable_root(r"H:\Writable\")
                .with_redirect_root(r"H:\Redirect"),
        )
        .unwrap();
        assert_eq!(layout.final_package_root(), r"\\?\D:\Mounted\App");
        assert_eq!(layout.writable_package_root(), r"H:\Writable");
        assert!(layout.is_default_writable_root(r"h:\writable\"));
        assert!(layout.is_default_redirect_root(r"H:/Redirect"));
        assert!(!layout.is_default_redirect_root(r"H:\Writable"));
    }

    #[test]
    fn rejects_non_drive_package_root() {
        for root in [r"\\server\share\app", r"relative\app", ""] {
            let err = PackageLayout::new(&PackageIdentity::new(root, "f", r"C:\x")).unwrap_err();
            assert!(matches!(err, EngineError::InvalidPackageRoot(_)), "{root}");
        }
    }

    #[test]
    fn initialize_creates_roots_idempotently() {
        let fs = MemoryFileSystem::new();
        let layout = PackageLayout::new(&identity()).unwrap();
        layout.initialize(&fs).unwrap();
        layout.initialize(&fs).unwrap();
        assert!(fs.is_dir(layout.writable_package_root()));
        assert!(fs.is_dir(layout.redirect_root()));
    }

    #[test]
    fn initialize_reports_the_failing_root() {
        let fs = MemoryFileSystem::new();
        let layout = PackageLayout::new(&identity()).unwrap();
        fs.add_file(r"C:\Users\me\AppData\Local\Packages", "not a directory");
        match layout.initialize(&fs).unwrap_err() {
            EngineError::CreateRoot { path, .. } => assert_eq!(path, layout.redirect_root()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
