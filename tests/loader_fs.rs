//! Route loading from a real directory tree.

use std::fs;

use axum::http::{Method, StatusCode};
use fsroute::dispatch::DispatcherState;
use fsroute::routing::{load_routes, FsSource, LoadError, LoadWarning};
use fsroute::{Dispatcher, RouteModule, RouteRegistry};
use serde_json::json;

mod common;

use common::{request, send};

fn named(label: &'static str) -> RouteModule {
    RouteModule::new().get(move |req, res| {
        Box::pin(async move { Ok(res.json(&json!({ "route": label, "params": req.params }))?) })
    })
}

fn registry() -> RouteRegistry {
    RouteRegistry::new()
        .with("index.rs", named("index"))
        .with("users/index.rs", named("users"))
        .with("users/[id].rs", named("user"))
        .with("docs/[...slug].rs", named("docs"))
        .with("late.rs", named("late"))
}

fn touch(root: &std::path::Path, file: &str) {
    let path = root.join(file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, "").unwrap();
}

#[test]
fn test_walks_directory_tree() {
    let dir = tempfile::tempdir().unwrap();
    for file in ["index.rs", "users/index.rs", "users/[id].rs", "docs/[...slug].rs", "notes.txt", "orphan.ts"] {
        touch(dir.path(), file);
    }

    let (table, report) = load_routes(&FsSource::new(dir.path()), &registry()).unwrap();
    let patterns: Vec<&str> = table.entries().iter().map(|e| e.pattern()).collect();
    assert_eq!(patterns, vec!["/docs/slug*", "/", "/users/:id", "/users"]);
    assert_eq!(report.routes, 4);
    assert_eq!(report.warnings, vec![LoadWarning::Unregistered { file: "orphan".into() }]);
}

#[test]
fn test_missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");

    let err = load_routes(&FsSource::new(&missing), &registry()).unwrap_err();
    assert!(matches!(err, LoadError::ReadRoot { .. }));
}

#[tokio::test]
async fn test_missing_root_serves_404() {
    let dir = tempfile::tempdir().unwrap();
    let d = Dispatcher::builder()
        .routes_dir(dir.path().join("nope"))
        .registry(registry())
        .build()
        .unwrap();

    assert_eq!(send(&d, request(Method::GET, "/")).await.status, StatusCode::NOT_FOUND);
    assert_eq!(d.state(), DispatcherState::Ready);
}

#[tokio::test]
async fn test_reload_picks_up_new_files() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "index.rs");
    touch(dir.path(), "users/[id].rs");

    let d = Dispatcher::builder()
        .routes_dir(dir.path())
        .registry(registry())
        .build()
        .unwrap();

    let reply = send(&d, request(Method::GET, "/users/9")).await;
    assert_eq!(reply.json(), json!({ "route": "user", "params": { "id": "9" } }));
    assert_eq!(send(&d, request(Method::GET, "/late")).await.status, StatusCode::NOT_FOUND);

    touch(dir.path(), "late.rs");
    let report = d.reload().await.unwrap();
    assert_eq!(report.routes, 3);
    assert_eq!(send(&d, request(Method::GET, "/late")).await.status, StatusCode::OK);

    // A failed reload keeps the previous table.
    fs::remove_dir_all(dir.path()).unwrap();
    assert!(d.reload().await.is_err());
    assert_eq!(send(&d, request(Method::GET, "/late")).await.status, StatusCode::OK);
}
