//! Integration tests: parallel fetch against a local mirror.

mod common;

use common::mirror_server::{MirrorServer, Route};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use sysfetch_core::config::TransferOptions;
use sysfetch_core::fetcher::{fetch_all, FetchError};
use sysfetch_core::manifest::{build_manifest, Release};
use tempfile::tempdir;

const PREFIX: &str = "/snapshots/amd64/";

fn body_for(name: &str) -> Vec<u8> {
    name.bytes().cycle().take(16 * 1024 + name.len()).collect()
}

fn full_mirror(files: &[String]) -> HashMap<String, Route> {
    files
        .iter()
        .map(|f| (format!("{}{}", PREFIX, f), Route::ok(body_for(f))))
        .collect()
}

fn manifest_files() -> Vec<String> {
    build_manifest(Release::new(66).unwrap(), "amd64")
        .files()
        .to_vec()
}

#[test]
fn all_artifacts_land_with_remote_content() {
    let files = manifest_files();
    let server = MirrorServer::start(full_mirror(&files));
    let dir = tempdir().unwrap();
    let base = format!("{}snapshots/amd64/", server.base_url());

    fetch_all(&base, dir.path(), &files, TransferOptions::default()).expect("fetch_all");

    for f in &files {
        let got = std::fs::read(dir.path().join(f)).unwrap();
        assert_eq!(got, body_for(f), "content of {f}");
    }
    let mut requested = server.requests();
    requested.sort();
    let mut expected: Vec<String> = files.iter().map(|f| format!("{}{}", PREFIX, f)).collect();
    expected.sort();
    assert_eq!(requested, expected);
}

#[test]
fn existing_files_are_replaced() {
    let files = vec!["bsd".to_string()];
    let server = MirrorServer::start(full_mirror(&files));
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("bsd"), vec![b'x'; 64 * 1024]).unwrap();
    let base = format!("{}snapshots/amd64/", server.base_url());

    fetch_all(&base, dir.path(), &files, TransferOptions::default()).unwrap();

    assert_eq!(std::fs::read(dir.path().join("bsd")).unwrap(), body_for("bsd"));
}

#[test]
fn one_missing_artifact_fails_fast_with_its_error() {
    let files = manifest_files();
    let mut routes = full_mirror(&files);
    routes.remove(&format!("{}base66.tgz", PREFIX));
    // A transfer that would take a minute unless cancelled.
    routes.insert(
        format!("{}bsd.rd", PREFIX),
        Route::stalled(body_for("bsd.rd"), Duration::from_secs(60)),
    );
    let server = MirrorServer::start(routes);
    let dir = tempdir().unwrap();
    let base = format!("{}snapshots/amd64/", server.base_url());

    let started = Instant::now();
    let err = fetch_all(&base, dir.path(), &files, TransferOptions::default()).unwrap_err();
    let elapsed = started.elapsed();

    match err {
        FetchError::Http { file, status } => {
            assert_eq!(file, "base66.tgz");
            assert_eq!(status, 404);
        }
        other => panic!("expected Http 404, got {other:?}"),
    }
    assert!(
        elapsed < Duration::from_secs(20),
        "cancellation took {elapsed:?}"
    );
    // The 404 body never reaches disk.
    assert_eq!(std::fs::metadata(dir.path().join("base66.tgz")).unwrap().len(), 0);
}

#[test]
fn first_of_several_failures_is_reported() {
    let files = vec![
        "SHA256.sig".to_string(),
        "bsd".to_string(),
        "bsd.mp".to_string(),
    ];
    let mut routes = HashMap::new();
    routes.insert(format!("{}SHA256.sig", PREFIX), Route::ok(body_for("SHA256.sig")));
    routes.insert(format!("{}bsd", PREFIX), Route::status(500));
    routes.insert(format!("{}bsd.mp", PREFIX), Route::status(403));
    let server = MirrorServer::start(routes);
    let dir = tempdir().unwrap();
    let base = format!("{}snapshots/amd64/", server.base_url());

    let err = fetch_all(&base, dir.path(), &files, TransferOptions::default()).unwrap_err();
    assert!(!err.is_cancelled(), "cancellation must not be the reported error");
    match err {
        FetchError::Http { file, status } => {
            assert!(
                (file == "bsd" && status == 500) || (file == "bsd.mp" && status == 403),
                "unexpected {file} {status}"
            );
        }
        other => panic!("expected Http, got {other:?}"),
    }
}

#[test]
fn missing_directory_issues_no_requests() {
    let files = manifest_files();
    let server = MirrorServer::start(full_mirror(&files));
    let dir = tempdir().unwrap();
    let missing = dir.path().join("_sysupgrade");
    let base = format!("{}snapshots/amd64/", server.base_url());

    let err = fetch_all(&base, &missing, &files, TransferOptions::default()).unwrap_err();
    assert!(matches!(err, FetchError::Create { .. }));
    std::thread::sleep(Duration::from_millis(100));
    assert!(server.requests().is_empty());
    assert!(!missing.exists());
}

#[test]
fn unreachable_mirror_is_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let dir = tempdir().unwrap();
    let files = vec!["bsd".to_string()];
    let base = format!("http://127.0.0.1:{}/snapshots/amd64/", port);

    let err = fetch_all(&base, dir.path(), &files, TransferOptions::default()).unwrap_err();
    assert!(matches!(err, FetchError::Transport { ref file, .. } if file == "bsd"));
}
