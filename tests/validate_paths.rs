mod common;

use assert_fs::TempDir;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

use common::{make_link, populated_source, running_as_root};
use sync_relocate::{
    RelocationOptions, RelocationRequest, ValidationFailure, ValidationWarning, validate,
};

fn check(src: &Path, target: &Path, options: RelocationOptions) -> Vec<ValidationFailure> {
    let req = RelocationRequest::new(src, target, options).unwrap();
    validate(&req).failures().to_vec()
}

/// Every path under `root` with its kind, bytes and modification time.
fn snapshot(root: &Path) -> Vec<(PathBuf, bool, Vec<u8>, SystemTime)> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .map(|e| {
            let e = e.unwrap();
            let meta = e.path().symlink_metadata().unwrap();
            let bytes = if meta.is_file() {
                fs::read(e.path()).unwrap()
            } else {
                Vec::new()
            };
            (e.path().to_path_buf(), meta.is_dir(), bytes, meta.modified().unwrap())
        })
        .collect()
}

#[test]
fn validating_repeatedly_changes_nothing_on_disk() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let src = populated_source(&root);
    let full = root.join("full");
    fs::create_dir(&full).unwrap();
    fs::write(full.join("keep.txt"), b"keep").unwrap();
    let linked = root.join("linked");
    make_link(&linked, &full);
    let before = snapshot(&root);

    let targets = [root.join("new").join("deep"), full.clone(), linked.clone()];
    for _ in 0..3 {
        for target in &targets {
            for source in [&src, &linked, &root.join("missing")] {
                let options = RelocationOptions {
                    min_free_space: 1,
                    protected_paths: vec![full.clone()],
                    ..Default::default()
                };
                let _ = check(source, target, options);
            }
        }
    }

    assert_eq!(snapshot(&root), before);
    assert!(!root.join("new").exists());
}

#[test]
fn clean_request_passes() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let src = populated_source(&root);
    let failures = check(&src, &root.join("a").join("b"), RelocationOptions::default());
    assert!(failures.is_empty(), "{failures:?}");
}

#[test]
fn every_problem_is_reported_in_check_order() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let target = root.join("cloud");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("x"), b"x").unwrap();

    let failures = check(&root.join("missing"), &target, RelocationOptions::default());
    let kinds: Vec<_> = failures.iter().map(ValidationFailure::kind).collect();
    assert_eq!(kinds, vec!["not_a_directory", "target_not_empty"]);
    assert!(matches!(
        failures[1],
        ValidationFailure::TargetNotEmpty { entries: 1, .. }
    ));
}

#[test]
fn source_file_is_not_a_directory() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let file = root.join("notes.txt");
    fs::write(&file, b"n").unwrap();
    let failures = check(&file, &root.join("t"), RelocationOptions::default());
    assert!(matches!(
        failures[0],
        ValidationFailure::NotADirectory { .. }
    ));
}

#[test]
fn linked_source_is_already_linked() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let real = populated_source(&root);
    let link = root.join("Pictures");
    make_link(&link, &real);

    let failures = check(&link, &root.join("t"), RelocationOptions::default());
    assert!(failures.contains(&ValidationFailure::AlreadyLinked {
        path: link.clone(),
        target: Some(real.clone()),
    }));
}

#[test]
fn link_as_target_is_refused() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let src = populated_source(&root);
    let elsewhere = root.join("elsewhere");
    fs::create_dir(&elsewhere).unwrap();
    let target = root.join("t");
    make_link(&target, &elsewhere);

    let failures = check(&src, &target, RelocationOptions::default());
    assert!(failures.iter().any(
        |f| matches!(f, ValidationFailure::NotADirectory { path, .. } if path == &target)
    ));
}

#[test]
fn overlapping_paths_both_ways() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let src = populated_source(&root);

    let inside = check(&src, &src.join("nested"), RelocationOptions::default());
    assert!(inside.iter().any(|f| f.kind() == "overlapping_paths"));

    let same = check(&src, &src, RelocationOptions::default());
    assert!(same.iter().any(|f| f.kind() == "overlapping_paths"));

    let sub = src.join("sub");
    let around = check(&sub, &src, RelocationOptions::default());
    assert!(around.iter().any(|f| f.kind() == "overlapping_paths"));
}

#[test]
fn configured_protected_path_is_refused() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let src = populated_source(&root);
    let options = RelocationOptions {
        protected_paths: vec![root.clone()],
        ..Default::default()
    };
    let failures = check(&src, &root.join("t"), options);
    // Both paths live below the protected tree.
    assert_eq!(
        failures
            .iter()
            .filter(|f| f.kind() == "protected_path")
            .count(),
        2
    );
}

#[cfg(unix)]
#[test]
fn system_directories_are_protected() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let failures = check(Path::new("/etc"), &root.join("t"), RelocationOptions::default());
    assert!(failures.iter().any(
        |f| matches!(f, ValidationFailure::ProtectedPath { path, .. } if path == Path::new("/etc"))
    ));

    let failures = check(Path::new("/"), &root.join("t"), RelocationOptions::default());
    assert!(failures.iter().any(|f| f.kind() == "protected_path"));
}

#[test]
fn home_directory_itself_is_protected() {
    let Some(home) = dirs::home_dir() else {
        return;
    };
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let failures = check(&home, &root.join("t"), RelocationOptions::default());
    assert!(failures.iter().any(|f| f.kind() == "protected_path"));
}

#[test]
fn impossible_free_space_requirement_is_reported() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let src = populated_source(&root);
    let options = RelocationOptions {
        min_free_space: u64::MAX,
        ..Default::default()
    };
    let failures = check(&src, &root.join("t"), options);
    assert!(matches!(
        failures.last(),
        Some(ValidationFailure::InsufficientSpace { required: u64::MAX, .. })
    ));
}

#[cfg(unix)]
#[test]
fn read_only_parent_is_a_permission_failure() {
    use std::os::unix::fs::PermissionsExt;

    if running_as_root() {
        eprintln!("skipping: permission bits do not bind root");
        return;
    }
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let parent = root.join("locked");
    fs::create_dir(&parent).unwrap();
    let src = populated_source(&parent);
    fs::set_permissions(&parent, fs::Permissions::from_mode(0o555)).unwrap();

    let failures = check(&src, &root.join("t"), RelocationOptions::default());
    fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(failures.iter().any(
        |f| matches!(f, ValidationFailure::PermissionDenied { path, .. } if path == &parent)
    ));
}

#[test]
fn overlong_target_is_reported() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let src = populated_source(&root);
    let mut target = root.clone();
    for _ in 0..25 {
        target.push("x".repeat(200));
    }

    let failures = check(&src, &target, RelocationOptions::default());
    let too_long: Vec<_> = failures
        .iter()
        .filter_map(|f| match f {
            ValidationFailure::PathTooLong { path, length, limit } => Some((path, *length, *limit)),
            _ => None,
        })
        .collect();
    assert_eq!(too_long.len(), 1, "{failures:?}");
    let (path, length, limit) = too_long[0];
    assert_eq!(path, &target);
    assert!(length > limit);
    assert!(!root.join("x".repeat(200)).exists());
}

#[test]
fn target_outside_the_sync_folder_warns_without_failing() {
    let td = TempDir::new().unwrap();
    let root = dunce::canonicalize(td.path()).unwrap();
    let src = populated_source(&root);
    let sync = root.join("OneDrive");
    fs::create_dir(&sync).unwrap();
    let options = RelocationOptions {
        sync_root: Some(sync.clone()),
        ..Default::default()
    };

    let outside = root.join("cloud");
    let req = RelocationRequest::new(&src, &outside, options.clone()).unwrap();
    let result = validate(&req);
    assert!(result.is_ok(), "{:?}", result.failures());
    assert_eq!(
        result.warnings(),
        [ValidationWarning::OutsideSyncRoot {
            target: outside,
            sync_root: sync.clone(),
        }]
    );

    let inside = sync.join("Backup").join("Documents");
    let req = RelocationRequest::new(&src, &inside, options).unwrap();
    let result = validate(&req);
    assert!(result.is_ok(), "{:?}", result.failures());
    assert!(result.warnings().is_empty());
}
