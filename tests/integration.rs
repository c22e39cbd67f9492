//! End-to-end tests of the filesystem engine.
//!
//! These tests verify that:
//! 1. Tree mutations keep the parent/child structure acyclic and consistent
//! 2. Names and paths normalize the same way everywhere
//! 3. Quotas gate inserts, writes and truncates at partition boundaries
//! 4. Permission checks pick exactly one class
//! 5. Independent handles on one file keep independent cursors

use std::io::{Cursor, SeekFrom};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use vfs_tree::content::{EmptyContent, RandomContent, StreamContent, ZeroContent};
use vfs_tree::*;

fn unix() -> (FileSystem, NodeId) {
    let mut fs = FileSystem::new(Config::default()).unwrap();
    let root = fs.mount("", None).unwrap();
    (fs, root)
}

fn read_all(fs: &mut FileSystem, path: &str) -> Vec<u8> {
    let mut handle = FileHandle::open(fs, path, OpenFlags::READ).unwrap();
    let data = handle.read(fs, usize::MAX).unwrap();
    handle.close(fs).unwrap();
    data
}

// =============================================================================
// Tree structure
// =============================================================================

#[test]
fn node_cannot_become_its_own_parent() {
    let (mut fs, root) = unix();
    let dir = fs.create_dir(root, "d").unwrap();
    let err = fs.add_child(dir, dir).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Recursion);
    assert_eq!(fs.node(dir).unwrap().parent(), Some(Parent::Node(root)));
}

#[test]
fn node_cannot_move_below_its_descendant() {
    let (mut fs, root) = unix();
    let a = fs.create_dir(root, "a").unwrap();
    let b = fs.create_dir(a, "b").unwrap();
    let c = fs.create_dir(b, "c").unwrap();

    assert!(matches!(
        fs.rename(a, c, "a"),
        Err(FsError::Recursion { .. })
    ));
    assert_eq!(fs.find("/a/b/c"), Some(c));
    assert_eq!(fs.children(root).unwrap(), vec![a]);
}

#[test]
fn root_rejects_non_partitions() {
    let (mut fs, _) = unix();
    let file = fs.insert(Node::empty_file("f")).unwrap();
    assert_eq!(
        fs.add_child(Parent::Root, file).unwrap_err().kind(),
        ErrorKind::Structural
    );
}

#[test]
fn illegal_names_are_rejected_whenever_checked() {
    // invalid before a config is attached: rejected on insert
    let mut node = Node::directory("ok");
    node.set_name("..").unwrap();
    let (mut fs, root) = unix();
    assert_eq!(fs.insert(node).unwrap_err().kind(), ErrorKind::InvalidArgument);

    // invalid after: rejected immediately
    for bad in ["", ".", "..", "a/b", "nul\0"] {
        assert_eq!(
            fs.create_dir(root, bad).unwrap_err().kind(),
            ErrorKind::InvalidArgument,
            "name {bad:?}"
        );
    }
    assert!(fs.children(root).unwrap().is_empty());
}

#[test]
fn windows_blacklist_is_enforced() {
    let mut fs = FileSystem::new(Config::windows()).unwrap();
    let c = fs.mount("C", None).unwrap();
    for bad in ["a<b", "what?", "pipe|", "a/b", "x:y"] {
        let err = fs.create_file(c, bad, "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "name {bad:?}");
    }
    assert!(fs.create_file(c, "fine.txt", "").is_ok());
}

#[test]
fn listing_order_is_insertion_order() {
    let (mut fs, root) = unix();
    let names = ["zeta", "alpha", "mid"];
    for name in names {
        fs.create_file(root, name, "").unwrap();
    }
    let listed: Vec<_> = fs
        .read_dir(root)
        .unwrap()
        .into_iter()
        .map(|entry| entry.name)
        .skip(2)
        .collect();
    assert_eq!(listed, names);
}

// =============================================================================
// Paths
// =============================================================================

#[test]
fn sanitize_is_idempotent() {
    let (fs, _) = unix();
    for raw in [
        "/a/b/../c/./",
        "/../../a",
        "vfs:///x//y/",
        "/",
        "a/../../b",
        "VFS:///q/./r/..",
    ] {
        let once = fs.sanitize(raw);
        assert_eq!(fs.sanitize(&once), once, "input {raw:?}");
    }
    assert_eq!(fs.sanitize("/a/b/../c/./"), "/a/c");
    assert_eq!(fs.sanitize("/../../a"), "/a");
}

#[test]
fn case_folding_follows_config() {
    let mut fs = FileSystem::new(Config::windows()).unwrap();
    let c = fs.mount("C", None).unwrap();
    let users = fs.create_dir(c, "Users").unwrap();
    let readme = fs.create_file(users, "ReadMe.TXT", "hi").unwrap();

    assert_eq!(fs.find("c:/users/readme.txt"), Some(readme));
    assert_eq!(fs.find("vfs://C:\\USERS\\..\\Users\\README.txt"), Some(readme));
    assert_eq!(fs.url(readme).unwrap(), "vfs://C:\\Users\\ReadMe.TXT");

    let (mut unix_fs, root) = unix();
    let upper = unix_fs.create_file(root, "File", "").unwrap();
    assert_eq!(unix_fs.find("/file"), None);
    assert_eq!(unix_fs.find("/File"), Some(upper));
}

#[test]
fn partitions_accept_any_separator_suffix() {
    let mut fs = FileSystem::new(Config::windows()).unwrap();
    let d = fs.mount("D", None).unwrap();
    assert_eq!(fs.partition("D"), Some(d));
    assert_eq!(fs.partition("D:"), Some(d));
    assert_eq!(fs.partition("d:\\"), Some(d));
    assert_eq!(fs.find("D:"), Some(d));
    assert_eq!(fs.path(d).unwrap(), "D:\\");
}

#[test]
fn custom_resolver_plugs_in() {
    /// Resolves everything relative to one fixed directory.
    struct Chroot(NodeId);

    impl PathResolver for Chroot {
        fn resolve(&self, fs: &FileSystem, path: &str) -> Option<NodeId> {
            let prefix = fs.path(self.0).ok()?;
            Finder.resolve(fs, &format!("{prefix}/{path}"))
        }
    }

    let (mut fs, root) = unix();
    let jail = fs.create_dir(root, "jail").unwrap();
    let inside = fs.create_file(jail, "inside", "").unwrap();
    let resolver: Box<dyn PathResolver> = Box::new(Chroot(jail));
    assert_eq!(resolver.resolve(&fs, "inside"), Some(inside));
    assert_eq!(resolver.resolve(&fs, "jail"), None);
}

// =============================================================================
// Quotas
// =============================================================================

#[test]
fn quota_clamps_write() {
    let (mut fs, root) = unix();
    fs.set_quota(root, Arc::new(Quota::new(4, UNLIMITED))).unwrap();

    let mut handle = FileHandle::open(&mut fs, "/payload", OpenFlags::WRITE).unwrap();
    assert_eq!(handle.write(&mut fs, b"Hello, World!").unwrap(), 4);
    handle.close(&mut fs).unwrap();
    assert_eq!(read_all(&mut fs, "/payload"), b"Hell");
}

#[test]
fn truncate_under_quota() {
    let (mut fs, root) = unix();
    let file = fs.create_file(root, "f", "abc").unwrap();
    fs.set_quota(root, Arc::new(Quota::new(4, UNLIMITED))).unwrap();

    let mut handle = FileHandle::open(&mut fs, "/f", OpenFlags::READ_WRITE).unwrap();
    assert!(!handle.truncate(&mut fs, 8).unwrap());
    assert_eq!(read_all(&mut fs, "/f"), b"abc");

    fs.set_quota(root, Arc::new(Quota::new(UNLIMITED, UNLIMITED)))
        .unwrap();
    assert!(handle.truncate(&mut fs, 8).unwrap());
    assert_eq!(read_all(&mut fs, "/f"), b"abc\0\0\0\0\0");
    assert_eq!(fs.stat(file).unwrap().size, 8);
}

#[test]
fn file_count_quota_blocks_inserts() {
    let (mut fs, root) = unix();
    fs.set_quota(root, Arc::new(Quota::new(UNLIMITED, 2))).unwrap();
    fs.create_dir(root, "a").unwrap();
    fs.create_file(root, "b", "").unwrap();
    let err = fs.create_file(root, "c", "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoDiskSpace);
    assert_eq!(fs.find("/c"), None);
    assert_eq!(fs.free_disk_space(root).unwrap(), 0);
}

#[test]
fn subtree_must_fit_remaining_file_count() {
    let (mut fs, root) = unix();
    let scratch = fs.mount("scratch", None).unwrap();
    let bundle = fs.create_dir(scratch, "bundle").unwrap();
    let files: Vec<_> = (0..4)
        .map(|i| fs.create_file(bundle, &format!("f{i}"), "x").unwrap())
        .collect();

    fs.set_quota(root, Arc::new(Quota::new(UNLIMITED, 3))).unwrap();
    let err = fs.add_child(root, bundle).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoDiskSpace);
    assert_eq!(fs.path(bundle).unwrap(), "scratch/bundle");

    assert!(fs.unlink(files[0]).unwrap());
    fs.add_child(root, bundle).unwrap();
    assert_eq!(fs.path(bundle).unwrap(), "/bundle");
    assert!(!fs.has_child(scratch, "bundle").unwrap());
}

#[test]
fn quotas_stop_at_nested_partitions() {
    let (mut fs, root) = unix();
    let mnt = fs.create_dir(root, "mnt").unwrap();
    let usb = fs.create_partition(mnt, "usb", None).unwrap();
    fs.create_file(usb, "big", vec![0u8; 100]).unwrap();
    fs.create_file(mnt, "small", "12345").unwrap();

    assert_eq!(
        fs.summary(root, None, None).unwrap(),
        Summary { size: 5, file_count: 2 }
    );
    assert_eq!(
        fs.summary(usb, None, None).unwrap(),
        Summary { size: 100, file_count: 1 }
    );

    // the root quota does not see the nested partition's bytes
    fs.set_quota(root, Arc::new(Quota::new(10, UNLIMITED))).unwrap();
    assert_eq!(fs.free_disk_space(mnt).unwrap(), 5);
    assert_eq!(fs.free_disk_space(usb).unwrap(), UNLIMITED);
}

#[test]
fn scoped_quotas_follow_active_identity() {
    let collection = Collection::new()
        .with(Quota::new(3, UNLIMITED).for_owner(1000))
        .with(Quota::new(10, UNLIMITED));

    let mut fs = FileSystem::new(Config::default().with_default_user(1000)).unwrap();
    let root = fs.mount("", None).unwrap();
    fs.set_quota(root, Arc::new(collection.clone())).unwrap();
    let mut handle = FileHandle::open(&mut fs, "/f", OpenFlags::WRITE).unwrap();
    assert_eq!(handle.write(&mut fs, b"abcdef").unwrap(), 3);

    let mut other = FileSystem::new(Config::default().with_default_user(7)).unwrap();
    let root = other.mount("", None).unwrap();
    other.set_quota(root, Arc::new(collection)).unwrap();
    let mut handle = FileHandle::open(&mut other, "/f", OpenFlags::WRITE).unwrap();
    assert_eq!(handle.write(&mut other, b"abcdef").unwrap(), 6);
}

// =============================================================================
// Permissions and metadata
// =============================================================================

#[test]
fn permission_class_priority() {
    let node = Node::empty_file("f")
        .with_owner(1)
        .with_group(2)
        .with_permissions(0o470);

    // owner class only: r--
    assert!(node.is_readable(1, 2));
    assert!(!node.is_writable(1, 2));
    // group class only: rwx
    assert!(node.is_writable(5, 2));
    assert!(node.is_executable(5, 2));
    // other class: ---
    assert!(!node.is_readable(5, 6));
}

#[test]
fn umask_applies_to_defaults_only() {
    let mut fs = FileSystem::new(Config::default().with_umask(0o077)).unwrap();
    let root = fs.mount("", Some(0o755)).unwrap();
    let file = fs.create_file(root, "f", "").unwrap();
    let dir = fs.create_dir(root, "d").unwrap();
    let explicit = fs
        .create_node(root, Node::empty_file("e").with_permissions(0o666))
        .unwrap();

    assert_eq!(fs.stat(root).unwrap().mode, 0o040755);
    assert_eq!(fs.stat(file).unwrap().mode, 0o100600);
    assert_eq!(fs.stat(dir).unwrap().mode, 0o040700);
    assert_eq!(fs.stat(explicit).unwrap().mode, 0o100666);
}

#[test]
fn stat_is_addressable_by_index_and_name() {
    let (mut fs, root) = unix();
    let block = fs
        .create_node(root, Node::block("sda", ZeroContent))
        .unwrap();
    fs.touch(block, None, Some(UNIX_EPOCH)).unwrap();
    let stat = fs.stat(block).unwrap();

    assert_eq!(stat.mode & 0o170000, i64::from(FileType::TAG_BLOCK));
    assert_eq!(stat.get(9), Some(0));
    assert_eq!(stat.get_named("atime"), Some(0));
    assert_eq!(stat.get_named("blksize"), Some(Stat::UNKNOWN));
    assert_eq!(stat.get(1), Some(fs.node(block).unwrap().ino() as i64));
}

// =============================================================================
// Handles and content
// =============================================================================

#[test]
fn independent_handles_keep_their_own_cursor() {
    let (mut fs, root) = unix();
    fs.create_file(root, "shared", "").unwrap();
    let mut a = FileHandle::open(&mut fs, "/shared", OpenFlags::READ_WRITE).unwrap();
    let mut b = FileHandle::open(&mut fs, "/shared", OpenFlags::READ_WRITE).unwrap();

    a.write(&mut fs, b"first").unwrap();
    b.write(&mut fs, b"SECOND").unwrap();
    assert_eq!(a.tell(&mut fs).unwrap(), 5);
    assert_eq!(b.tell(&mut fs).unwrap(), 6);

    // last write wins on overlap
    assert_eq!(read_all(&mut fs, "/shared"), b"SECOND");

    a.write(&mut fs, b"!").unwrap();
    assert_eq!(read_all(&mut fs, "/shared"), b"SECON!");
    assert_eq!(b.tell(&mut fs).unwrap(), 6);
}

#[test]
fn special_contents_behave_like_devices() {
    let (mut fs, root) = unix();
    let dev = fs.create_dir(root, "dev").unwrap();
    fs.create_file_with(dev, "null", EmptyContent).unwrap();
    fs.create_file_with(dev, "zero", ZeroContent).unwrap();
    fs.create_file_with(dev, "urandom", RandomContent).unwrap();

    let mut null = FileHandle::open(&mut fs, "/dev/null", OpenFlags::READ_WRITE).unwrap();
    assert_eq!(null.write(&mut fs, b"discard").unwrap(), 7);
    assert!(null.read(&mut fs, 4).unwrap().is_empty());

    let mut zero = FileHandle::open(&mut fs, "/dev/zero", OpenFlags::READ).unwrap();
    assert_eq!(zero.read(&mut fs, 4).unwrap(), [0, 0, 0, 0]);

    let mut random = FileHandle::open(&mut fs, "/dev/urandom", OpenFlags::READ).unwrap();
    assert_eq!(random.read(&mut fs, 32).unwrap().len(), 32);
    assert!(!random.is_eof(&mut fs).unwrap());
}

#[test]
fn stream_backed_file() {
    let (mut fs, root) = unix();
    let content = StreamContent::new(Cursor::new(b"on disk".to_vec())).unwrap();
    let file = fs.create_file_with(root, "mirror", content).unwrap();
    assert_eq!(fs.stat(file).unwrap().size, 7);

    let mut handle = FileHandle::open(&mut fs, "/mirror", OpenFlags::READ_WRITE).unwrap();
    handle.seek(&mut fs, SeekFrom::End(0)).unwrap();
    handle.write(&mut fs, b"!").unwrap();
    assert!(handle.flush(&mut fs).unwrap());
    assert_eq!(read_all(&mut fs, "/mirror"), b"on disk!");
}

#[test]
fn unlink_removes_file_and_invalidates_handles() {
    let (mut fs, root) = unix();
    let file = fs.create_file(root, "gone", "bytes").unwrap();
    let mut handle = FileHandle::open(&mut fs, "/gone", OpenFlags::READ).unwrap();

    assert!(fs.unlink(file).unwrap());
    assert_eq!(fs.find("/gone"), None);
    assert_eq!(
        handle.read(&mut fs, 1).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(fs.node(file).unwrap_err().kind(), ErrorKind::NotFound);
}

// =============================================================================
// Workflows
// =============================================================================

#[test]
fn workflow_populate_and_browse() {
    let mut fs = FileSystem::new(Config::windows()).unwrap();
    let c = fs.mount("C", None).unwrap();
    fs.populate(
        c,
        &[
            Structure::directory(
                "Windows",
                [Structure::directory("System32", [Structure::file("drivers.ini", "[x]")])],
            ),
            Structure::directory("Users", []),
        ],
    )
    .unwrap();

    let system = fs.find("c:/windows/system32").unwrap();
    let names: Vec<_> = fs
        .read_dir(system)
        .unwrap()
        .into_iter()
        .map(|entry| (entry.name, entry.file_type))
        .collect();
    assert_eq!(
        names,
        [
            (".".to_string(), FileType::Directory),
            ("..".to_string(), FileType::Directory),
            ("drivers.ini".to_string(), FileType::File),
        ]
    );
}

#[test]
fn workflow_move_between_partitions() {
    let mut fs = FileSystem::new(Config::windows()).unwrap();
    let c = fs.mount("C", None).unwrap();
    let d = fs.mount("D", None).unwrap();
    let docs = fs.create_dir(c, "Docs").unwrap();
    let report = fs.create_file(docs, "report.txt", "q3").unwrap();

    fs.rename(report, d, "archive.txt").unwrap();
    assert_eq!(fs.find("C:\\Docs\\report.txt"), None);
    assert_eq!(fs.find("D:\\archive.txt"), Some(report));
    assert_eq!(read_all(&mut fs, "d:/ARCHIVE.txt"), b"q3");

    fs.set_name(docs, "Documents").unwrap();
    assert_eq!(fs.path(docs).unwrap(), "C:\\Documents");
}
