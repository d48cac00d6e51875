//! Size aggregation and safe delete against a mocked registry.
//!
//! Repository `app` has `v1 -> [a, b, c]` (schema 1) and `v2 -> [b, c, d]`
//! (schema 2). Deleting `v1` may only remove `a`.

use registry_janitor::{
    ImageManager, Logger, RegistryApi, RegistryClient, RegistryConfig, RegistryError,
};
use serde_json::json;
use sha2::{Digest, Sha256};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn digest_of(data: &str) -> String {
    format!("sha256:{:x}", Sha256::digest(data.as_bytes()))
}

struct Fixture {
    server: MockServer,
    a: String,
    b: String,
    c: String,
    d: String,
    v1_digest: String,
    v2_digest: String,
}

impl Fixture {
    async fn start() -> Self {
        let server = MockServer::start().await;
        let (a, b, c, d) = (
            digest_of("a"),
            digest_of("b"),
            digest_of("c"),
            digest_of("d"),
        );

        Mock::given(method("GET"))
            .and(path("/v2/"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("docker-distribution-api-version", "registry/2.0"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/_catalog"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"repositories": ["app"]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/app/tags/list"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"name": "app", "tags": ["v1", "v2"]})),
            )
            .mount(&server)
            .await;

        let v1 = json!({
            "schemaVersion": 1,
            "name": "app",
            "tag": "v1",
            "fsLayers": [{"blobSum": a}, {"blobSum": b}, {"blobSum": c}],
        })
        .to_string();
        let v1_digest = digest_of(&v1);
        Mock::given(method("GET"))
            .and(path("/v2/app/manifests/v1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("docker-content-digest", v1_digest.as_str())
                    .set_body_string(v1),
            )
            .mount(&server)
            .await;

        let v2 = json!({
            "schemaVersion": 2,
            "layers": [{"digest": b}, {"digest": c}, {"digest": d}],
        })
        .to_string();
        let v2_digest = digest_of(&v2);
        Mock::given(method("GET"))
            .and(path("/v2/app/manifests/v2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("docker-content-digest", v2_digest.as_str())
                    .set_body_string(v2),
            )
            .mount(&server)
            .await;

        Self {
            server,
            a,
            b,
            c,
            d,
            v1_digest,
            v2_digest,
        }
    }

    async fn mount_blob(&self, digest: &str, size: usize) {
        Mock::given(method("HEAD"))
            .and(path(format!("/v2/app/blobs/{}", digest)))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("docker-content-digest", digest)
                    .set_body_bytes(vec![0u8; size]),
            )
            .mount(&self.server)
            .await;
    }

    async fn expect_blob_delete(&self, digest: &str, status: u16, times: u64) {
        Mock::given(method("DELETE"))
            .and(path(format!("/v2/app/blobs/{}", digest)))
            .respond_with(ResponseTemplate::new(status))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    async fn expect_manifest_delete(&self, digest: &str, times: u64) {
        Mock::given(method("DELETE"))
            .and(path(format!("/v2/app/manifests/{}", digest)))
            .respond_with(ResponseTemplate::new(202))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    async fn manager(&self) -> ImageManager<RegistryClient> {
        let client = RegistryClient::builder(RegistryConfig::new(self.server.uri()))
            .with_logger(Logger::new_quiet())
            .connect()
            .await
            .expect("handshake failed");
        ImageManager::new(client, Logger::new_quiet())
    }
}

#[tokio::test]
async fn test_image_size_sums_layers() {
    let fixture = Fixture::start().await;
    fixture.mount_blob(&fixture.a, 100).await;
    fixture.mount_blob(&fixture.b, 250).await;
    fixture.mount_blob(&fixture.c, 4096).await;

    let manager = fixture.manager().await;
    assert_eq!(manager.image_size("app", "v1").await.unwrap(), 4446);
}

#[tokio::test]
async fn test_image_size_aborts_on_digest_mismatch() {
    let fixture = Fixture::start().await;
    fixture.mount_blob(&fixture.b, 250).await;
    fixture.mount_blob(&fixture.c, 4096).await;
    // `d` answers under the identity of `b`
    Mock::given(method("HEAD"))
        .and(path(format!("/v2/app/blobs/{}", fixture.d)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("docker-content-digest", fixture.b.as_str())
                .set_body_bytes(vec![0u8; 10]),
        )
        .mount(&fixture.server)
        .await;

    let manager = fixture.manager().await;
    let result = manager.image_size("app", "v2").await;
    assert!(matches!(result, Err(RegistryError::DigestMismatch { .. })));
}

#[tokio::test]
async fn test_delete_removes_only_unshared_blobs() {
    let fixture = Fixture::start().await;
    fixture.expect_blob_delete(&fixture.a, 202, 1).await;
    fixture.expect_blob_delete(&fixture.b, 202, 0).await;
    fixture.expect_blob_delete(&fixture.c, 202, 0).await;
    fixture.expect_blob_delete(&fixture.d, 202, 0).await;
    fixture.expect_manifest_delete(&fixture.v1_digest, 1).await;
    fixture.expect_manifest_delete(&fixture.v2_digest, 0).await;

    let manager = fixture.manager().await;
    let report = manager.delete_image("app", "v1").await.unwrap();

    assert_eq!(report.manifest_digest, fixture.v1_digest);
    assert_eq!(report.deleted_blobs, vec![fixture.a.clone()]);
    assert_eq!(report.retained_blobs, vec![fixture.b.clone(), fixture.c.clone()]);

    let v2 = manager.registry().manifest("app", "v2").await.unwrap();
    assert_eq!(v2.blobs, vec![fixture.b.clone(), fixture.c.clone(), fixture.d.clone()]);
}

#[tokio::test]
async fn test_failed_blob_delete_keeps_manifest() {
    let fixture = Fixture::start().await;
    fixture.expect_blob_delete(&fixture.a, 500, 1).await;
    fixture.expect_manifest_delete(&fixture.v1_digest, 0).await;

    let manager = fixture.manager().await;
    match manager.delete_image("app", "v1").await {
        Err(RegistryError::Aborted { image, deleted, source }) => {
            assert_eq!(image, "app:v1");
            assert!(deleted.is_empty());
            assert!(matches!(*source, RegistryError::BadStatus { status: 500, .. }));
        }
        other => panic!("expected Aborted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_unknown_tag_touches_nothing() {
    let fixture = Fixture::start().await;
    fixture.expect_blob_delete(&fixture.a, 202, 0).await;
    fixture.expect_manifest_delete(&fixture.v1_digest, 0).await;

    let manager = fixture.manager().await;
    let result = manager.delete_image("app", "v9").await;
    assert!(matches!(result, Err(RegistryError::NotFound { .. })));
}

#[tokio::test]
async fn test_delete_keeps_layers_of_multi_platform_tag() {
    let server = MockServer::start().await;
    let (a, x) = (digest_of("a"), digest_of("x"));

    Mock::given(method("GET"))
        .and(path("/v2/"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("docker-distribution-api-version", "registry/2.0"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/_catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"repositories": ["app"]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"name": "app", "tags": ["v1", "multi"]})),
        )
        .mount(&server)
        .await;

    let v1 = json!({"schemaVersion": 2, "layers": [{"digest": a}, {"digest": x}]}).to_string();
    let v1_digest = digest_of(&v1);
    Mock::given(method("GET"))
        .and(path("/v2/app/manifests/v1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("docker-content-digest", v1_digest.as_str())
                .set_body_string(v1),
        )
        .mount(&server)
        .await;

    // linux/amd64 image of "multi", also built on layer `a`
    let child = json!({"schemaVersion": 2, "layers": [{"digest": a}]}).to_string();
    let child_digest = digest_of(&child);
    Mock::given(method("GET"))
        .and(path(format!("/v2/app/manifests/{}", child_digest)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("docker-content-digest", child_digest.as_str())
                .set_body_string(child),
        )
        .mount(&server)
        .await;

    let index = json!({
        "schemaVersion": 2,
        "mediaType": "application/vnd.docker.distribution.manifest.list.v2+json",
        "manifests": [{"digest": child_digest, "platform": {"architecture": "amd64", "os": "linux"}}],
    })
    .to_string();
    Mock::given(method("GET"))
        .and(path("/v2/app/manifests/multi"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("docker-content-digest", digest_of(&index).as_str())
                .set_body_string(index),
        )
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("/v2/app/blobs/{}", a)))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/v2/app/blobs/{}", x)))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/v2/app/manifests/{}", v1_digest)))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let client = RegistryClient::builder(RegistryConfig::new(server.uri()))
        .with_logger(Logger::new_quiet())
        .connect()
        .await
        .expect("handshake failed");
    let manager = ImageManager::new(client, Logger::new_quiet());

    let report = manager.delete_image("app", "v1").await.unwrap();
    assert_eq!(report.deleted_blobs, vec![x]);
    assert_eq!(report.retained_blobs, vec![a]);
}

#[tokio::test]
async fn test_delete_refuses_tag_aliasing_another() {
    let fixture = Fixture::start().await;
    // `latest` resolves to the same manifest digest as `v1`
    Mock::given(method("GET"))
        .and(path("/v2/app/tags/list"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"name": "app", "tags": ["v1", "latest"]})),
        )
        .with_priority(1)
        .mount(&fixture.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/app/manifests/latest"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("docker-content-digest", fixture.v1_digest.as_str())
                .set_body_json(json!({"schemaVersion": 1, "fsLayers": [{"blobSum": fixture.a}]})),
        )
        .mount(&fixture.server)
        .await;
    fixture.expect_blob_delete(&fixture.a, 202, 0).await;
    fixture.expect_manifest_delete(&fixture.v1_digest, 0).await;

    let manager = fixture.manager().await;
    let result = manager.delete_image("app", "v1").await;
    assert!(matches!(result, Err(RegistryError::Aborted { .. })));
}
