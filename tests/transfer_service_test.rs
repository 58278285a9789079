//! Tests for TransferService

use std::sync::Arc;

use clap::Parser;
use tempfile::TempDir;

use gridstage::application::services::TransferService;
use gridstage::application::{GetOptions, PutOptions, Resolved};
use gridstage::config::Settings;
use gridstage::domain::{Credentials, ErrorCode, ErrorRecord, MetaTriple, StorageConfig};
use gridstage::infrastructure::traits::RealFileSystem;
use gridstage::util::testing::{FakeGrid, GridCall};

fn resolved<O>(options: O, job_uuid: Option<&str>) -> Resolved<O> {
    Resolved {
        options,
        credentials: Credentials {
            job_uuid: job_uuid.map(String::from),
            ..Credentials::default()
        },
        config: StorageConfig::new("{}"),
    }
}

fn service(grid: FakeGrid) -> (TransferService, Arc<FakeGrid>) {
    let grid = Arc::new(grid);
    (
        TransferService::new(
            Arc::new(RealFileSystem),
            grid.clone(),
            Arc::new(Settings::default()),
        ),
        grid,
    )
}

/// Creates `files` (relative paths) below a fresh directory.
fn source_tree(files: &[&str]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for file in files {
        let path = temp.path().join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, file).unwrap();
    }
    temp
}

fn uploads(calls: &[GridCall]) -> Vec<String> {
    calls
        .iter()
        .filter_map(|c| match c {
            GridCall::Upload { destination, .. } => Some(destination.clone()),
            _ => None,
        })
        .collect()
}

fn tags_on(calls: &[GridCall], path: &str) -> Vec<MetaTriple> {
    calls
        .iter()
        .filter_map(|c| match c {
            GridCall::AddMeta { path: p, triple, .. } if p == path => Some(triple.clone()),
            _ => None,
        })
        .collect()
}

// ============================================================
// get()
// ============================================================

#[test]
fn given_source_and_list_when_get_then_downloads_in_order() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let list = temp.path().join("list.txt");
    std::fs::write(&list, "/zone/b\n  \n/zone/c\n").unwrap();
    let (svc, grid) = service(FakeGrid::new());
    let options = GetOptions::try_parse_from([
        "-s",
        "/zone/a",
        "-l",
        list.to_str().unwrap(),
        "-d",
        temp.path().to_str().unwrap(),
    ])
    .unwrap();

    // Act
    let summary = svc.get(&resolved(options, None)).unwrap();

    // Assert
    assert_eq!(summary.items, vec!["/zone/a", "/zone/b", "/zone/c"]);
    let sources: Vec<String> = grid
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            GridCall::Download { source, destination } => {
                assert_eq!(destination, temp.path());
                Some(source)
            }
            _ => None,
        })
        .collect();
    assert_eq!(sources, vec!["/zone/a", "/zone/b", "/zone/c"]);
}

#[test]
fn given_download_failure_when_get_then_record_propagates() {
    let (svc, _) = service(FakeGrid::new().fail_on("download", ErrorRecord::bad_exit_code(4)));
    let options = GetOptions::try_parse_from(["-s", "/zone/a"]).unwrap();

    let err = svc.get(&resolved(options, None)).unwrap_err();

    assert_eq!(err.record().unwrap().exit_code, Some(4));
}

// ============================================================
// put()
// ============================================================

#[test]
fn given_exclude_and_include_lists_when_put_then_uploads_remaining_files() {
    // Arrange
    let src = source_tree(&["a.txt", "logs/run.log", "logs/keep.log", "scratch.tmp"]);
    let lists = TempDir::new().unwrap();
    let exclude = lists.path().join("exclude.txt");
    std::fs::write(&exclude, "logs/run.log;logs/keep.log; scratch.tmp ;").unwrap();
    let (svc, grid) = service(FakeGrid::new());
    let options = PutOptions::try_parse_from([
        "-s",
        src.path().to_str().unwrap(),
        "-d",
        "/zone/out",
        "-e",
        exclude.to_str().unwrap(),
        "-x",
        ";",
        "-i",
        "keep.log",
    ])
    .unwrap();

    // Act
    let summary = svc.put(&resolved(options, None)).unwrap();

    // Assert
    assert_eq!(summary.items, vec!["/zone/out/a.txt", "/zone/out/logs/keep.log"]);
    let calls = grid.calls();
    assert_eq!(uploads(&calls), summary.items);
    assert!(calls.contains(&GridCall::Mkdir("/zone/out".into())));
    assert!(calls.contains(&GridCall::Mkdir("/zone/out/logs".into())));
}

#[test]
fn given_job_uuid_and_meta_when_put_then_tags_files_and_destination() {
    // Arrange
    let src = source_tree(&["data.csv"]);
    let (svc, grid) = service(FakeGrid::new());
    let options = PutOptions::try_parse_from([
        "-s",
        src.path().to_str().unwrap(),
        "-d",
        "/zone/out/",
        "-m",
        "a,1,cm",
        "-m",
        "b,2,",
    ])
    .unwrap();

    // Act
    svc.put(&resolved(options, Some("job-7"))).unwrap();

    // Assert
    let expected = vec![
        MetaTriple::new("ipc-uuid", "job-7", ""),
        MetaTriple::new("a", "1", "cm"),
        MetaTriple::new("b", "2", ""),
    ];
    let calls = grid.calls();
    assert_eq!(tags_on(&calls, "/zone/out/data.csv"), expected);
    assert_eq!(tags_on(&calls, "/zone/out/"), expected);
}

#[test]
fn given_skip_parent_meta_when_put_then_destination_is_not_tagged() {
    let src = source_tree(&["data.csv"]);
    let (svc, grid) = service(FakeGrid::new());
    let options = PutOptions::try_parse_from([
        "-s",
        src.path().to_str().unwrap(),
        "-d",
        "/zone/out",
        "-p",
    ])
    .unwrap();

    svc.put(&resolved(options, Some("job-7"))).unwrap();

    let calls = grid.calls();
    assert!(tags_on(&calls, "/zone/out").is_empty());
    assert_eq!(tags_on(&calls, "/zone/out/data.csv").len(), 1);
    assert!(!calls.iter().any(|c| matches!(c, GridCall::GrantOwn { .. })));
}

#[test]
fn given_empty_job_uuid_when_put_then_only_meta_tags() {
    let src = source_tree(&["data.csv"]);
    let (svc, grid) = service(FakeGrid::new());
    let options = PutOptions::try_parse_from([
        "-s",
        src.path().to_str().unwrap(),
        "-d",
        "/zone/out",
        "-m",
        "a,1",
    ])
    .unwrap();

    svc.put(&resolved(options, Some(""))).unwrap();

    assert_eq!(
        tags_on(&grid.calls(), "/zone/out/data.csv"),
        vec![MetaTriple::new("a", "1", "")]
    );
}

#[test]
fn given_permission_error_on_upload_when_put_then_access_denied() {
    let src = source_tree(&["data.csv"]);
    let (svc, _) = service(FakeGrid::new().fail_on("upload", ErrorRecord::access_denied()));
    let options = PutOptions::try_parse_from([
        "-s",
        src.path().to_str().unwrap(),
        "-d",
        "/zone/out",
    ])
    .unwrap();

    let err = svc.put(&resolved(options, None)).unwrap_err();

    assert_eq!(err.record().unwrap().error_code, ErrorCode::AccessDenied);
}

#[test]
fn given_user_when_put_then_grants_ownership_last() {
    let src = source_tree(&["data.csv"]);
    let (svc, grid) = service(FakeGrid::new());
    let options = PutOptions::try_parse_from([
        "-s",
        src.path().to_str().unwrap(),
        "-d",
        "/zone/out",
        "-u",
        "bob",
    ])
    .unwrap();

    svc.put(&resolved(options, None)).unwrap();

    assert_eq!(
        grid.calls().last(),
        Some(&GridCall::GrantOwn {
            user: "bob".into(),
            path: "/zone/out".into(),
        })
    );
}

#[test]
fn given_source_removed_after_validation_when_put_then_does_not_exist() {
    let temp = TempDir::new().unwrap();
    let gone = temp.path().join("results");
    let (svc, grid) = service(FakeGrid::new());
    let options = PutOptions::try_parse_from([
        "-s",
        gone.to_str().unwrap(),
        "-d",
        "/zone/out",
    ])
    .unwrap();

    let err = svc.put(&resolved(options, None)).unwrap_err();

    assert_eq!(err.record(), Some(&ErrorRecord::does_not_exist(&gone)));
    assert!(uploads(&grid.calls()).is_empty());
}
