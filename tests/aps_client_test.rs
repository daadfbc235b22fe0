use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use apsgate::aps::types::{ListQuery, PolicyKey, Region, ScopeSet, ThumbnailSize};
use apsgate::aps::{
    ApsClient, ApsError, Authenticator, ClientSettings, ContentSource, DerivativeService,
    ObjectStorage, UPLOAD_CHUNK_BYTES,
};
use apsgate::storage::BucketManager;

fn client(server: &MockServer) -> ApsClient {
    ApsClient::new(ClientSettings {
        base_url: server.uri(),
        client_id: "id".to_string(),
        client_secret: "secret".to_string(),
        ..ClientSettings::default()
    })
    .expect("Failed to build client")
}

fn details_json(bucket: &str, key: &str, size: u64) -> serde_json::Value {
    json!({
        "bucketKey": bucket,
        "objectKey": key,
        "objectId": format!("urn:adsk.objects:os.object:{bucket}/{key}"),
        "size": size,
        "location": format!("https://example.com/{bucket}/{key}"),
    })
}

#[tokio::test]
async fn test_token_request_uses_client_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/authentication/v2/token"))
        .and(header("authorization", "Basic aWQ6c2VjcmV0"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("scope=viewables%3Aread"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "abc",
            "expires_in": 3599,
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = client(&server)
        .two_legged_token(ScopeSet::Viewer)
        .await
        .unwrap();
    assert_eq!(credentials.access_token, "abc");
    assert_eq!(credentials.expires_in, 3599);
}

#[tokio::test]
async fn test_missing_object_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oss/v2/buckets/models/objects/plans%2Fsite.dwg/details"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let err = client(&server)
        .object_details("tok", "models", "plans/site.dwg")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_server_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oss/v2/buckets/models/details"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client(&server)
        .bucket_details("tok", "models")
        .await
        .unwrap_err();
    match err {
        ApsError::Status { status, body } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_list_objects_sends_paging_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oss/v2/buckets/models/objects"))
        .and(query_param("limit", "2"))
        .and(query_param("startAt", "f/c.rvt"))
        .and(query_param("beginsWith", "f/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [details_json("models", "f/c.rvt", 1)],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .list_objects(
            "tok",
            "models",
            &ListQuery {
                limit: 2,
                start_at: Some("f/c.rvt".into()),
                begins_with: Some("f/".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].object_key, "f/c.rvt");
    assert!(page.next.is_none());
}

#[tokio::test]
async fn test_upload_goes_through_signed_urls() {
    let server = MockServer::start().await;
    let upload_path = "/oss/v2/buckets/models/objects/f%2Fa.rvt/signeds3upload";

    Mock::given(method("GET"))
        .and(path(upload_path))
        .and(query_param("parts", "1"))
        .and(query_param("firstPart", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uploadKey": "upload-1",
            "urls": [format!("{}/s3/part-1", server.uri())],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/s3/part-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(upload_path))
        .and(body_json(json!({ "uploadKey": "upload-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(details_json("models", "f/a.rvt", 3)))
        .expect(1)
        .mount(&server)
        .await;

    let details = client(&server)
        .upload_object(
            "tok",
            "models",
            "f/a.rvt",
            ContentSource::Bytes(Bytes::from_static(b"abc")),
        )
        .await
        .unwrap();
    assert_eq!(details.object_key, "f/a.rvt");
    assert_eq!(details.size, 3);

    let received = server.received_requests().await.unwrap();
    let part = received
        .iter()
        .find(|request| request.url.path() == "/s3/part-1")
        .unwrap();
    assert_eq!(part.body, b"abc");
}

#[tokio::test]
async fn test_upload_from_path_sends_one_request_per_part() {
    let server = MockServer::start().await;
    let upload_path = "/oss/v2/buckets/models/objects/big.rvt/signeds3upload";
    let total = UPLOAD_CHUNK_BYTES + 10;

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("big.rvt");
    let content: Vec<u8> = (0..total).map(|i| (i % 251) as u8).collect();
    std::fs::write(&file_path, &content).unwrap();

    Mock::given(method("GET"))
        .and(path(upload_path))
        .and(query_param("parts", "2"))
        .and(query_param("firstPart", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uploadKey": "upload-big",
            "urls": [
                format!("{}/s3/big-1", server.uri()),
                format!("{}/s3/big-2", server.uri()),
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;
    for part in ["/s3/big-1", "/s3/big-2"] {
        Mock::given(method("PUT"))
            .and(path(part))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path(upload_path))
        .and(body_json(json!({ "uploadKey": "upload-big" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(details_json("models", "big.rvt", total as u64)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let details = client(&server)
        .upload_object("tok", "models", "big.rvt", ContentSource::Path(file_path))
        .await
        .unwrap();
    assert_eq!(details.size, total as u64);

    let received = server.received_requests().await.unwrap();
    let body_of = |part: &str| {
        received
            .iter()
            .find(|request| request.url.path() == part)
            .map(|request| request.body.clone())
            .unwrap()
    };
    assert_eq!(body_of("/s3/big-1"), &content[..UPLOAD_CHUNK_BYTES]);
    assert_eq!(body_of("/s3/big-2"), &content[UPLOAD_CHUNK_BYTES..]);
}

#[tokio::test]
async fn test_bucket_conflict_counts_as_existing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oss/v2/buckets/models/details"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oss/v2/buckets"))
        .and(header("x-ads-region", "US"))
        .and(body_json(json!({ "bucketKey": "models", "policyKey": "persistent" })))
        .respond_with(ResponseTemplate::new(409).set_body_string("already exists"))
        .expect(1)
        .mount(&server)
        .await;

    let manager = BucketManager::new(Arc::new(client(&server)), Region::Us, PolicyKey::Persistent);
    manager.ensure_exists("tok", "models").await.unwrap();
    // Remembered: no further platform calls
    manager.ensure_exists("tok", "models").await.unwrap();
}

#[tokio::test]
async fn test_manifest_and_thumbnail() {
    let server = MockServer::start().await;
    let urn = "dXJuOmFkc2sub2JqZWN0czpvcy5vYmplY3Q6bW9kZWxzL2EucnZ0";

    Mock::given(method("GET"))
        .and(path(format!("/modelderivative/v2/designdata/{urn}/manifest")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "progress": "complete",
            "derivatives": [{ "messages": [], "children": [{ "messages": [{ "code": "x" }] }] }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/modelderivative/v2/designdata/{urn}/thumbnail")))
        .and(query_param("width", "100"))
        .and(query_param("height", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG".to_vec()))
        .mount(&server)
        .await;

    let client = client(&server);
    let manifest = client.manifest("tok", urn).await.unwrap();
    assert_eq!(manifest.status, "success");
    assert_eq!(manifest.derivatives[0].children[0].messages.len(), 1);

    let png = client
        .thumbnail("tok", urn, ThumbnailSize::Small)
        .await
        .unwrap();
    assert_eq!(&png[..], b"\x89PNG");
}
