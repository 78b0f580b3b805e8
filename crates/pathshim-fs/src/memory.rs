use crate::FileSystem;
use std::collections::BTreeMap;
use std::io;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Dir,
    File(Vec<u8>),
}

/// In-memory filesystem keyed by case-folded Windows paths.
///
/// Drive roots (`C:`) and UNC share roots always exist. Everything else must
/// be created, either through the trait or with the `add_*` helpers.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    nodes: Mutex<BTreeMap<String, Node>>,
}

/// Canonical map key: device prefix stripped, separators folded to `\`,
/// trailing separators removed, lower-cased.
fn key(path: &str) -> String {
    let mut p = path.replace('/', "\\");
    if p.starts_with(r"\\?\") || p.starts_with(r"\\.\") {
        p.drain(..4);
    }
    let trimmed = p.trim_end_matches('\\');
    trimmed.to_lowercase()
}

fn parent(key: &str) -> Option<&str> {
    key.rfind('\\').map(|idx| &key[..idx])
}

/// Drive roots (`c:`) and UNC server/share roots are implicit.
fn is_root(key: &str) -> bool {
    if let Some(unc) = key.strip_prefix(r"\\") {
        return !unc.is_empty() && unc.matches('\\').count() <= 1;
    }
    let b = key.as_bytes();
    b.len() == 2 && b[0].is_ascii_alphabetic() && b[1] == b':'
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Node>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.nodes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Create a file (and any missing parent directories) with `contents`.
    pub fn add_file(&self, path: &str, contents: impl Into<Vec<u8>>) {
        let k = key(path);
        let mut nodes = self.lock();
        if let Some(p) = parent(&k) {
            insert_dirs(&mut nodes, p);
        }
        nodes.insert(k, Node::File(contents.into()));
    }

    pub fn add_dir(&self, path: &str) {
        insert_dirs(&mut self.lock(), &key(path));
    }

    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        match self.lock().get(&key(path)) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    /// All stored paths (case-folded), in sorted order.
    pub fn paths(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn parent_exists(nodes: &BTreeMap<String, Node>, k: &str) -> bool {
        match parent(k) {
            None => false,
            Some(p) => is_root(p) || matches!(nodes.get(p), Some(Node::Dir)),
        }
    }
}

fn insert_dirs(nodes: &mut BTreeMap<String, Node>, k: &str) {
    let mut current = String::new();
    for (i, segment) in k.split('\\').enumerate() {
        if i > 0 {
            current.push('\\');
        }
        current.push_str(segment);
        if segment.is_empty() || is_root(&current) {
            continue;
        }
        nodes.entry(current.clone()).or_insert(Node::Dir);
    }
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("not found: {path}"))
}

fn already_exists(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::AlreadyExists, format!("already exists: {path}"))
}

impl FileSystem for MemoryFileSystem {
    fn name(&self) -> &str {
        "memory"
    }

    fn exists(&self, path: &str) -> bool {
        let k = key(path);
        !k.is_empty() && (is_root(&k) || self.lock().contains_key(&k))
    }

    fn is_dir(&self, path: &str) -> bool {
        let k = key(path);
        !k.is_empty() && (is_root(&k) || matches!(self.lock().get(&k), Some(Node::Dir)))
    }

    fn create_dir(&self, path: &str) -> io::Result<()> {
        let k = key(path);
        if k.is_empty() || is_root(&k) {
            return Err(already_exists(path));
        }
        let mut nodes = self.lock();
        if nodes.contains_key(&k) {
            return Err(already_exists(path));
        }
        if !Self::parent_exists(&nodes, &k) {
            return Err(not_found(path));
        }
        nodes.insert(k, Node::Dir);
        Ok(())
    }

    fn create_dir_all(&self, path: &str) -> io::Result<()> {
        let k = key(path);
        let mut nodes = self.lock();
        let blocked = std::iter::successors(Some(k.as_str()), |&p| parent(p))
            .any(|p| matches!(nodes.get(p), Some(Node::File(_))));
        if blocked {
            return Err(already_exists(path));
        }
        insert_dirs(&mut nodes, &k);
        Ok(())
    }

    fn copy_file(&self, from: &str, to: &str) -> io::Result<()> {
        let (src, dest) = (key(from), key(to));
        let mut nodes = self.lock();
        let data = match nodes.get(&src) {
            Some(Node::File(data)) => data.clone(),
            Some(Node::Dir) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("source is a directory: {from}"),
                ))
            }
            None => return Err(not_found(from)),
        };
        if nodes.contains_key(&dest) {
            return Err(already_exists(to));
        }
        if !Self::parent_exists(&nodes, &dest) {
            return Err(not_found(to));
        }
        nodes.insert(dest, Node::File(data));
        Ok(())
    }

    fn create_dir_from_template(&self, template: &str, to: &str) -> io::Result<()> {
        let src = key(template);
        if !is_root(&src) && !matches!(self.lock().get(&src), Some(Node::Dir)) {
            return Err(not_found(template));
        }
        self.create_dir(to)
    }
}
