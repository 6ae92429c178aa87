#![cfg(feature = "reqwest")]

use std::io::Write;

use hoist_transfer::{
    BlobTransfer, CancellationToken, CopyChain, HttpTransport, NegotiationResponse, Placement,
    ReqwestTransport, TransferDecision, TransferError, decide,
};
use hoist_verify::ArtifactDigest;
use httpmock::prelude::*;
use url::Url;

fn transport(server: &MockServer) -> ReqwestTransport {
    ReqwestTransport::from_base(Url::parse(&server.base_url()).unwrap()).unwrap()
}

#[tokio::test]
async fn negotiate_reads_local_location_without_following() {
    let server = MockServer::start_async().await;
    let digest = ArtifactDigest::of_bytes(b"weights");
    let dest = std::env::temp_dir().join("blobs").join("sha256-weights");

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/api/blobs/{digest}"))
                .header("X-Redirect-Create", "1");
            then.status(307)
                .header("LocalLocation", dest.to_string_lossy().to_string())
                .header("Location", "/elsewhere");
        })
        .await;

    let answer = transport(&server).negotiate(&digest, 5).await.unwrap();
    mock.assert_async().await;

    assert_eq!(answer.status, 307);
    assert_eq!(decide(&answer).unwrap(), TransferDecision::LocalDestination(dest));
}

#[tokio::test]
async fn negotiate_captures_error_body() {
    let server = MockServer::start_async().await;
    let digest = ArtifactDigest::of_bytes(b"weights");

    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/api/blobs/{digest}"));
            then.status(500).body("disk full");
        })
        .await;

    let answer = transport(&server).negotiate(&digest, 5).await.unwrap();

    assert_eq!(answer, NegotiationResponse::new(500).with_message("disk full"));
    match decide(&answer) {
        Err(TransferError::Negotiation(msg)) => assert!(msg.contains("disk full")),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn uploads_when_authority_requires_bytes() {
    let server = MockServer::start_async().await;
    let payload = b"quantized layer data".repeat(1000);
    let digest = ArtifactDigest::of_bytes(&payload);
    let path = format!("/api/blobs/{digest}");

    let negotiation = server
        .mock_async(|when, then| {
            when.method(POST).path(path.clone()).header("X-Redirect-Create", "1");
            then.status(202);
        })
        .await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST).path(path.clone()).body(String::from_utf8_lossy(&payload).to_string());
            then.status(201);
        })
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&payload).unwrap();
    file.flush().unwrap();

    let transfer = BlobTransfer::new(transport(&server)).with_chain(CopyChain::new(Vec::new()));
    let report = transfer.transfer(file.path(), &CancellationToken::new()).await.unwrap();

    negotiation.assert_async().await;
    upload.assert_async().await;
    assert_eq!(report.placement, Placement::Network);
    assert_eq!(report.digest, digest);
}

#[tokio::test]
async fn rejected_upload_is_network_error() {
    let server = MockServer::start_async().await;
    let digest = ArtifactDigest::of_bytes(b"abc");

    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/api/blobs/{digest}"));
            then.status(400).body("digest mismatch");
        })
        .await;

    let body = Box::pin(futures_util::stream::iter(vec![Ok(bytes::Bytes::from_static(b"abc"))]));
    let err = transport(&server).upload(&digest, 3, body).await.unwrap_err();

    match err {
        TransferError::Network(msg) => assert!(msg.contains("digest mismatch")),
        other => panic!("unexpected {other:?}"),
    }
}
