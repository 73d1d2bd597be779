mod common;

use std::fs;
use tempfile::tempdir;

use common::{FailingFs, is_link, names, populated_source, root_of};
use sync_relocate::{
    Execution, FailureKind, LinkStatus, NativeFs, OperationLog, Orchestrator, RelocationOptions,
    RelocationOutcome, RelocationRequest, ValidationFailure, inspect_one, relocate,
};

#[test]
fn relocation_moves_contents_and_leaves_a_link() {
    let td = tempdir().unwrap();
    let root = root_of(&td);
    let src = populated_source(&root);
    let target = root.join("cloud").join("Documents");

    let exec = Orchestrator::new(NativeFs::new())
        .execute(&src, &target, RelocationOptions::default())
        .unwrap();
    assert_eq!(
        exec,
        Execution::Relocated(RelocationOutcome::Success(src.clone()))
    );

    assert!(is_link(&src));
    assert_eq!(names(&target), vec!["a.txt", "b.txt", "sub"]);
    // Applications still reach the data through the old path.
    assert_eq!(fs::read(src.join("a.txt")).unwrap(), b"alpha");
    assert_eq!(fs::read(src.join("sub").join("c.txt")).unwrap(), b"gamma");

    let record = inspect_one(&src).unwrap();
    assert!(record.is_valid);
    assert_eq!(record.real_target, target);
}

#[test]
fn relocating_twice_changes_nothing() {
    let td = tempdir().unwrap();
    let root = root_of(&td);
    let src = populated_source(&root);
    let target = root.join("cloud");

    let first = Orchestrator::new(NativeFs::new())
        .execute(&src, &target, RelocationOptions::default())
        .unwrap();
    assert!(matches!(
        first,
        Execution::Relocated(RelocationOutcome::Success(_))
    ));

    let orch = Orchestrator::new(FailingFs::new());
    let second = orch
        .execute(&src, &target, RelocationOptions::default())
        .unwrap();
    assert_eq!(
        second,
        Execution::Relocated(RelocationOutcome::Success(src.clone()))
    );
    assert_eq!(orch.filesystem().mutations(), 0);
    assert_eq!(names(&target), vec!["a.txt", "b.txt", "sub"]);
}

#[test]
fn empty_existing_target_is_used_as_is() {
    let td = tempdir().unwrap();
    let root = root_of(&td);
    let src = populated_source(&root);
    let target = root.join("cloud");
    fs::create_dir(&target).unwrap();

    let orch = Orchestrator::new(FailingFs::new());
    let exec = orch
        .execute(&src, &target, RelocationOptions::default())
        .unwrap();
    assert!(matches!(
        exec,
        Execution::Relocated(RelocationOutcome::Success(_))
    ));
    assert!(
        !orch
            .filesystem()
            .calls
            .borrow()
            .iter()
            .any(|c| c.starts_with("mkdir"))
    );
    assert_eq!(orch.filesystem().moves.get(), 3);
}

#[test]
fn empty_source_still_gets_a_link() {
    let td = tempdir().unwrap();
    let root = root_of(&td);
    let src = root.join("Empty");
    fs::create_dir(&src).unwrap();
    let target = root.join("cloud");

    let exec = Orchestrator::new(NativeFs::new())
        .execute(&src, &target, RelocationOptions::default())
        .unwrap();
    assert!(matches!(
        exec,
        Execution::Relocated(RelocationOutcome::Success(_))
    ));
    assert!(is_link(&src));
    assert!(names(&target).is_empty());
}

#[test]
fn validate_only_reports_without_touching_anything() {
    let td = tempdir().unwrap();
    let root = root_of(&td);
    let src = populated_source(&root);
    let target = root.join("cloud");

    let orch = Orchestrator::new(FailingFs::new());
    let exec = orch
        .execute(
            &src,
            &target,
            RelocationOptions {
                validate_only: true,
                ..Default::default()
            },
        )
        .unwrap();
    match exec {
        Execution::Validated(result) => assert!(result.is_ok(), "{:?}", result.failures()),
        other => panic!("unexpected {other:?}"),
    }
    assert!(orch.filesystem().calls.borrow().is_empty());
    assert!(!is_link(&src));
    assert!(!target.exists());
}

#[test]
fn rejected_request_never_reaches_the_engine() {
    let td = tempdir().unwrap();
    let root = root_of(&td);
    let src = populated_source(&root);
    let target = root.join("cloud");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("existing.txt"), b"keep").unwrap();

    let orch = Orchestrator::new(FailingFs::new());
    let exec = orch
        .execute(&src, &target, RelocationOptions::default())
        .unwrap();
    match exec {
        Execution::Validated(result) => assert_eq!(
            result.failures(),
            [ValidationFailure::TargetNotEmpty {
                path: target.clone(),
                entries: 1,
            }]
        ),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(orch.filesystem().mutations(), 0);
    assert_eq!(names(&src), vec!["a.txt", "b.txt", "sub"]);
}

#[cfg(unix)]
#[test]
fn link_to_the_target_that_is_not_a_directory_is_not_already_done() {
    let td = tempdir().unwrap();
    let root = root_of(&td);
    let target = root.join("cloud");
    fs::write(&target, b"not a folder").unwrap();
    let src = root.join("Proj");
    std::os::unix::fs::symlink(&target, &src).unwrap();
    assert_eq!(inspect_one(&src).unwrap().status, LinkStatus::Misdirected);

    let fs_ = FailingFs::new();
    let req = RelocationRequest::new(&src, &target, RelocationOptions::default()).unwrap();
    let mut log = OperationLog::new();
    match relocate(&fs_, &req, &mut log) {
        RelocationOutcome::Failed { reason, residual } => {
            assert_eq!(reason.kind, FailureKind::PreconditionViolated);
            assert!(residual.completed.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(fs_.mutations(), 0);
    assert_eq!(fs::read(&target).unwrap(), b"not a folder");
}
