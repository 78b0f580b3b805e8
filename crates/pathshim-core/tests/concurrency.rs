//! Concurrent callers materializing redirect destinations on a real directory tree.

use pathshim_core::{
    PackageIdentity, PackageLayout, RedirectFlags, RedirectionEngine, RedirectionRules,
    RedirectionSpec, VfsFolderMapping, VfsMappings,
};
use pathshim_fs::{FileSystem, HostFileSystem};
use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;

const FLAGS: RedirectFlags = RedirectFlags::all();

fn setup(root: &std::path::Path) -> (Arc<RedirectionEngine>, HostFileSystem) {
    let host = HostFileSystem::rooted(root);
    let layout = PackageLayout::new(&PackageIdentity::new(
        r"C:\Program Files\WindowsApps\App",
        "App_abc",
        r"C:\Users\me\AppData\Local",
    ))
    .unwrap();
    layout.initialize(&host).unwrap();

    let windows_shadow = format!(r"{}\Windows", layout.package_vfs_root());
    let rules = RedirectionRules::new(vec![RedirectionSpec::new(
        &windows_shadow,
        ".*",
        layout.writable_package_root(),
        false,
        false,
    )
    .unwrap()]);
    let mappings = VfsMappings::from_entries([VfsFolderMapping::new(r"C:\Windows", "Windows")]);
    let engine = RedirectionEngine::from_parts(layout, mappings, rules, Arc::new(host.clone()));
    (Arc::new(engine), host)
}

fn write(host: &HostFileSystem, path: &str, contents: &str) {
    let target = host.host_path(path).unwrap();
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(target, contents).unwrap();
}

#[test]
fn racing_first_use_copies_agree() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, host) = setup(dir.path());
    let vfs_root = engine.layout().package_vfs_root().to_owned();
    write(&host, r"C:\Windows\app.ini", "system");
    write(&host, &format!(r"{vfs_root}\Windows\app.ini"), "packaged");

    let barrier = Arc::new(Barrier::new(8));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        let b = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            b.wait();
            engine.should_redirect(r"C:\Windows\app.ini", FLAGS)
        }));
    }
    let decisions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let first = &decisions[0];
    assert!(first.should_redirect);
    assert!(decisions.iter().all(|d| d == first), "all callers see one destination");
    let copied = fs::read_to_string(host.host_path(&first.redirect_path).unwrap()).unwrap();
    assert_eq!(copied, "packaged");
}

#[test]
fn racing_callers_never_see_a_partial_copy() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, host) = setup(dir.path());
    let vfs_root = engine.layout().package_vfs_root().to_owned();
    let big = vec![0x5a_u8; 16 * 1024 * 1024];
    let source = host.host_path(&format!(r"{vfs_root}\Windows\big.bin")).unwrap();
    fs::create_dir_all(source.parent().unwrap()).unwrap();
    fs::write(&source, &big).unwrap();

    let barrier = Arc::new(Barrier::new(8));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        let host = host.clone();
        let b = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            b.wait();
            let decision = engine.should_redirect(r"C:\Windows\big.bin", FLAGS);
            let len = fs::metadata(host.host_path(&decision.redirect_path).unwrap())
                .unwrap()
                .len();
            (decision, len)
        }));
    }

    for handle in handles {
        let (decision, len) = handle.join().unwrap();
        assert!(decision.should_redirect);
        assert_eq!(len, big.len() as u64, "returned before the copy was complete");
    }
}

#[test]
fn siblings_share_intermediate_directories() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, host) = setup(dir.path());
    for i in 0..6 {
        write(&host, &format!(r"C:\Windows\deep\tree\file{i}.dat"), &i.to_string());
    }

    let barrier = Arc::new(Barrier::new(6));
    let mut handles = Vec::new();
    for i in 0..6 {
        let engine = Arc::clone(&engine);
        let b = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            b.wait();
            engine.should_redirect(&format!(r"C:\Windows\deep\tree\file{i}.dat"), FLAGS)
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let decision = handle.join().unwrap();
        assert!(decision.should_redirect);
        assert!(host.exists(&decision.redirect_path), "file{i} was materialized");
        let copied = fs::read_to_string(host.host_path(&decision.redirect_path).unwrap()).unwrap();
        assert_eq!(copied, i.to_string());
    }
}

#[test]
fn repeated_calls_after_materialization_are_stable() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, host) = setup(dir.path());
    write(&host, r"C:\Windows\sub\note.txt", "v1");

    let first = engine.should_redirect(r"C:\Windows\sub\note.txt", FLAGS);
    write(&host, r"C:\Windows\sub\note.txt", "v2");
    let second = engine.should_redirect(r"C:\Windows\sub\note.txt", FLAGS);

    assert_eq!(first, second);
    let copied = fs::read_to_string(host.host_path(&second.redirect_path).unwrap()).unwrap();
    assert_eq!(copied, "v1", "an existing destination is never overwritten");
}
