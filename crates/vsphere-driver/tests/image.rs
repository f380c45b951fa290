//! Image acquisition tests against a local HTTP server.

mod common;

use axum::body::Body;
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use common::serve;
use vsphere_driver::{image, DriverError};

const ORIGINAL: &[u8] = b"previous image";

async fn entries(dir: &std::path::Path) -> Vec<String> {
    let mut names = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await.unwrap();
    while let Some(entry) = read_dir.next_entry().await.unwrap() {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    names
}

#[tokio::test]
async fn test_fetch_writes_exact_bytes() {
    let payload: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
    let served = payload.clone();
    let app = Router::new().route("/image.iso", get(move || async move { served }));
    let addr = serve(app).await;

    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("image.iso"), ORIGINAL)
        .await
        .unwrap();

    let path = image::fetch(dir.path(), "image.iso", &format!("http://{addr}/image.iso"))
        .await
        .unwrap();

    assert_eq!(path, dir.path().join("image.iso"));
    assert_eq!(tokio::fs::read(&path).await.unwrap(), payload);
    assert_eq!(entries(dir.path()).await, vec!["image.iso"]);
}

#[tokio::test]
async fn test_fetch_creates_missing_directory() {
    let app = Router::new().route("/image.iso", get(|| async { "iso" }));
    let addr = serve(app).await;

    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("machines").join("dev");
    image::fetch(&dir, "image.iso", &format!("http://{addr}/image.iso"))
        .await
        .unwrap();
    assert_eq!(tokio::fs::read(dir.join("image.iso")).await.unwrap(), b"iso");
}

#[tokio::test]
async fn test_fetch_interrupted_stream_leaves_destination_untouched() {
    let app = Router::new().route(
        "/image.iso",
        get(|| async {
            let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
                Ok(Bytes::from_static(b"partial image data")),
                Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "stream interrupted",
                )),
            ];
            Body::from_stream(futures::stream::iter(chunks))
        }),
    );
    let addr = serve(app).await;

    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("image.iso"), ORIGINAL)
        .await
        .unwrap();

    let result = image::fetch(dir.path(), "image.iso", &format!("http://{addr}/image.iso")).await;

    assert!(matches!(result, Err(DriverError::Download { .. })));
    assert_eq!(
        tokio::fs::read(dir.path().join("image.iso")).await.unwrap(),
        ORIGINAL
    );
    assert_eq!(entries(dir.path()).await, vec!["image.iso"]);
}

#[tokio::test]
async fn test_fetch_error_status() {
    let app = Router::new();
    let addr = serve(app).await;

    let dir = tempfile::tempdir().unwrap();
    let result = image::fetch(dir.path(), "image.iso", &format!("http://{addr}/missing.iso")).await;

    match result {
        Err(DriverError::HttpStatus { status, url }) => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/missing.iso"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(entries(dir.path()).await.is_empty());
}

#[tokio::test]
async fn test_fetch_unreachable_server() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let result = image::fetch(dir.path(), "image.iso", &format!("http://{addr}/image.iso")).await;
    assert!(matches!(result, Err(DriverError::Download { .. })));
    assert!(entries(dir.path()).await.is_empty());
}
