//! End-to-end digest runs over temporary trees, for both topologies and both walk modes.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use treesum::engine::{digest_bytes, running_as_root};
use treesum::{
    CancelToken, DigestAlgorithm, DigestError, DigestMap, DigestOpts, Topology, UnitTracker,
    WalkMode, digest_dir, digest_dir_tracked, digest_dir_with_cancel,
};

fn write(root: &Path, rel: &str, body: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn opts(topology: Topology) -> DigestOpts {
    DigestOpts {
        topology,
        ..Default::default()
    }
}

fn all_opts() -> Vec<DigestOpts> {
    let mut v = Vec::new();
    for topology in [Topology::Pool(20), Topology::Pool(1), Topology::PerFile] {
        for walk_mode in [WalkMode::Serial, WalkMode::Parallel] {
            v.push(DigestOpts {
                topology,
                walk_mode,
                ..Default::default()
            });
        }
    }
    v
}

fn sorted(map: &DigestMap) -> BTreeMap<PathBuf, String> {
    map.iter().map(|(p, d)| (p.clone(), d.to_hex())).collect()
}

#[test]
fn hello_world_tree() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.txt", b"hello");
    write(dir.path(), "sub/b.txt", b"world");

    for o in all_opts() {
        let map = digest_dir(dir.path(), &o).unwrap();
        assert_eq!(map.len(), 2, "{:?}", o);
        assert_eq!(
            map[&PathBuf::from("a.txt")].to_hex(),
            "5d41402abc4b2a76b9719d911017c592"
        );
        assert_eq!(
            map[&PathBuf::from("sub/b.txt")].to_hex(),
            "7d793037a0760186574b0282f2f435e7"
        );
    }
}

#[test]
fn key_set_matches_every_regular_file() {
    let dir = TempDir::new().unwrap();
    let mut expected = BTreeMap::new();
    for (i, rel) in ["x", "d1/y", "d1/d2/z", "d1/d2/d3/w", ".hidden", "d4/.also"]
        .iter()
        .enumerate()
    {
        let body = format!("body {i}");
        write(dir.path(), rel, body.as_bytes());
        expected.insert(
            PathBuf::from(rel),
            digest_bytes(DigestAlgorithm::Md5, body.as_bytes()).to_hex(),
        );
    }
    fs::create_dir_all(dir.path().join("empty/nested")).unwrap();

    for o in all_opts() {
        let map = digest_dir(dir.path(), &o).unwrap();
        assert_eq!(sorted(&map), expected, "{:?}", o);
    }
}

#[test]
fn empty_tree_is_empty_map_not_error() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
    for o in all_opts() {
        assert!(digest_dir(dir.path(), &o).unwrap().is_empty());
    }
}

#[test]
fn missing_root_is_a_walk_error() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("does-not-exist");
    for o in all_opts() {
        let err = digest_dir(&root, &o).unwrap_err();
        assert!(err.is_walk(), "{:?}: {err}", o);
    }
}

#[cfg(unix)]
#[test]
fn symlinks_are_skipped() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "real.txt", b"data");
    write(dir.path(), "d/inner.txt", b"inner");
    std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("d"), dir.path().join("dlink")).unwrap();

    for o in all_opts() {
        let map = digest_dir(dir.path(), &o).unwrap();
        let keys: Vec<_> = sorted(&map).into_keys().collect();
        assert_eq!(
            keys,
            vec![PathBuf::from("d/inner.txt"), PathBuf::from("real.txt")]
        );
    }
}

#[cfg(unix)]
#[test]
fn unreadable_file_fails_the_run() {
    use std::os::unix::fs::PermissionsExt;
    if running_as_root() {
        return;
    }
    let dir = TempDir::new().unwrap();
    for i in 0..50 {
        write(dir.path(), &format!("ok/{i}.txt"), b"fine");
    }
    write(dir.path(), "locked.txt", b"secret");
    let locked = dir.path().join("locked.txt");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    for o in all_opts() {
        let tracker = UnitTracker::new();
        let err = digest_dir_tracked(dir.path(), &o, &CancelToken::new(), &tracker).unwrap_err();
        assert!(err.is_read(), "{:?}: {err}", o);
        assert_eq!(err.path(), Some(Path::new("locked.txt")));
        assert_eq!(tracker.live(), 0);
    }
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}

#[cfg(unix)]
#[test]
fn unlistable_directory_fails_the_run() {
    use std::os::unix::fs::PermissionsExt;
    if running_as_root() {
        return;
    }
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.txt", b"a");
    write(dir.path(), "closed/b.txt", b"b");
    let closed = dir.path().join("closed");
    fs::set_permissions(&closed, fs::Permissions::from_mode(0o000)).unwrap();

    for o in all_opts() {
        let err = digest_dir(dir.path(), &o).unwrap_err();
        assert!(err.is_walk(), "{:?}: {err}", o);
    }
    fs::set_permissions(&closed, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
#[test]
fn unlistable_root_is_a_walk_error() {
    use std::os::unix::fs::PermissionsExt;
    if running_as_root() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("closed");
    write(&root, "a.txt", b"a");
    fs::set_permissions(&root, fs::Permissions::from_mode(0o000)).unwrap();

    for o in all_opts() {
        let tracker = UnitTracker::new();
        let err = digest_dir_tracked(&root, &o, &CancelToken::new(), &tracker).unwrap_err();
        assert!(err.is_walk(), "{:?}: {err}", o);
        assert_eq!(tracker.live(), 0);
    }
    fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
#[test]
fn backslash_in_a_file_name_is_its_own_key() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a/b.txt", b"real");
    write(dir.path(), "a\\b.txt", b"other");

    for o in all_opts() {
        let map = digest_dir(dir.path(), &o).unwrap();
        assert_eq!(map.len(), 2, "{:?}", o);
        assert_eq!(
            map[Path::new("a/b.txt")],
            digest_bytes(DigestAlgorithm::Md5, b"real")
        );
        assert_eq!(
            map[Path::new("a\\b.txt")],
            digest_bytes(DigestAlgorithm::Md5, b"other")
        );
    }
}

#[test]
fn repeated_runs_are_identical() {
    let dir = TempDir::new().unwrap();
    for i in 0..40 {
        write(dir.path(), &format!("d{}/f{i}", i % 4), i.to_string().as_bytes());
    }
    let first = digest_dir(dir.path(), &DigestOpts::default()).unwrap();
    let second = digest_dir(dir.path(), &DigestOpts::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn topologies_agree_on_a_large_tree() {
    let dir = TempDir::new().unwrap();
    for i in 0..1200 {
        write(
            dir.path(),
            &format!("d{}/e{}/f{i}.bin", i % 10, i % 7),
            format!("content {i}").as_bytes(),
        );
    }

    let per_file = digest_dir(dir.path(), &opts(Topology::PerFile)).unwrap();
    let pool = digest_dir(dir.path(), &opts(Topology::Pool(20))).unwrap();
    let parallel_walk = digest_dir(
        dir.path(),
        &DigestOpts {
            walk_mode: WalkMode::Parallel,
            ..opts(Topology::Pool(20))
        },
    )
    .unwrap();
    assert_eq!(per_file.len(), 1200);
    assert_eq!(per_file, pool);
    assert_eq!(pool, parallel_walk);
}

#[test]
fn blake3_digests_are_32_bytes() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.txt", b"hello");
    let map = digest_dir(
        dir.path(),
        &DigestOpts {
            algorithm: DigestAlgorithm::Blake3,
            ..Default::default()
        },
    )
    .unwrap();
    let d = map[&PathBuf::from("a.txt")];
    assert_eq!(d.as_bytes().len(), 32);
    assert_eq!(d, digest_bytes(DigestAlgorithm::Blake3, b"hello"));
}

#[test]
fn file_root_is_keyed_by_name() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "only.txt", b"hello");
    let map = digest_dir(&dir.path().join("only.txt"), &DigestOpts::default()).unwrap();
    assert_eq!(map.len(), 1);
    assert!(map.contains_key(&PathBuf::from("only.txt")));
}

#[test]
fn no_units_outlive_a_successful_run() {
    let dir = TempDir::new().unwrap();
    for i in 0..300 {
        write(dir.path(), &format!("f{i}"), b"x");
    }
    for o in all_opts() {
        let tracker = UnitTracker::new();
        let map = digest_dir_tracked(dir.path(), &o, &CancelToken::new(), &tracker).unwrap();
        assert_eq!(map.len(), 300);
        assert!(tracker.spawned() >= 2);
        assert_eq!(tracker.live(), 0, "{:?}", o);
    }
}

#[test]
fn pre_cancelled_run_reports_cancelled_and_joins() {
    let dir = TempDir::new().unwrap();
    for i in 0..100 {
        write(dir.path(), &format!("f{i}"), b"x");
    }
    for o in all_opts() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let tracker = UnitTracker::new();
        let err = digest_dir_tracked(dir.path(), &o, &cancel, &tracker).unwrap_err();
        assert!(matches!(err, DigestError::Cancelled), "{err}");
        assert_eq!(tracker.live(), 0);
    }
}

#[test]
fn cancel_from_another_thread() {
    let dir = TempDir::new().unwrap();
    for i in 0..2000 {
        write(dir.path(), &format!("d{}/f{i}", i % 20), b"some bytes");
    }
    let cancel = CancelToken::new();
    let remote = cancel.clone();
    let h = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(1));
        remote.cancel();
    });
    // Either the run finished before the cancel landed, or it reports Cancelled.
    match digest_dir_with_cancel(dir.path(), &opts(Topology::Pool(2)), &cancel) {
        Ok(map) => assert_eq!(map.len(), 2000),
        Err(err) => assert!(matches!(err, DigestError::Cancelled), "{err}"),
    }
    h.join().unwrap();
    assert!(cancel.is_cancelled());
}

#[test]
fn generous_timeout_does_not_fire() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a", b"a");
    let map = digest_dir(
        dir.path(),
        &DigestOpts {
            timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(map.len(), 1);
}

#[test]
fn tiny_channels_still_complete() {
    let dir = TempDir::new().unwrap();
    for i in 0..200 {
        write(dir.path(), &format!("f{i}"), i.to_string().as_bytes());
    }
    let map = digest_dir(
        dir.path(),
        &DigestOpts {
            channel_cap: Some(1),
            ..opts(Topology::Pool(3))
        },
    )
    .unwrap();
    assert_eq!(map.len(), 200);
}
