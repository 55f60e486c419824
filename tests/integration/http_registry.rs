//! HTTP registry client against a local stub server

use crate::integration::test_utils::{StubEmoji, StubHttpRegistry};
use emote_sync::registry::{HttpRegistryClient, HttpRegistryConfig};
use emote_sync::content::fingerprint_bytes;
use emote_sync::{
    DesiredEmotes, EmoteSpecification, EmoteSynchronizer, Handle, Ledger, LedgerEntry,
    MemoryContentSource, RegistryClient, RegistryError, RemoteResource,
};
use std::sync::Arc;
use std::time::Duration;

const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\nrest";

fn client(stub: &StubHttpRegistry, token: Option<&str>) -> HttpRegistryClient {
    let mut config = HttpRegistryConfig::new(stub.base_url.clone(), stub.collection.clone());
    config.token = token.map(str::to_string);
    config.request_timeout = Duration::from_secs(5);
    HttpRegistryClient::new(config).unwrap()
}

#[tokio::test]
async fn test_list_parses_string_ids() {
    let stub = StubHttpRegistry::start("guild-1")
        .with_emoji(11, "okay", false)
        .with_emoji(12, "party", true);

    let resources = client(&stub, None).list_resources().await.unwrap();
    assert_eq!(
        resources,
        vec![
            RemoteResource {
                id: 11,
                name: "okay".to_string(),
                animated: false
            },
            RemoteResource {
                id: 12,
                name: "party".to_string(),
                animated: true
            },
        ]
    );
    assert_eq!(stub.requests(), vec!["GET /collections/guild-1/emojis".to_string()]);
}

#[tokio::test]
async fn test_create_uploads_multipart_form() {
    let stub = StubHttpRegistry::start("guild-1");
    let client = client(&stub, None);

    let still = client.create_resource("okay", PNG.to_vec()).await.unwrap();
    let moving = client.create_resource("party", GIF.to_vec()).await.unwrap();

    assert!(!still.animated);
    assert!(moving.animated);
    assert_eq!(
        stub.emojis(),
        vec![
            StubEmoji {
                id: still.id,
                name: "okay".to_string(),
                animated: false
            },
            StubEmoji {
                id: moving.id,
                name: "party".to_string(),
                animated: true
            },
        ]
    );
}

#[tokio::test]
async fn test_delete_and_missing_delete() {
    let stub = StubHttpRegistry::start("guild-1").with_emoji(11, "okay", false);
    let client = client(&stub, None);

    client.delete_resource(11).await.unwrap();
    assert!(stub.emojis().is_empty());
    assert!(matches!(
        client.delete_resource(11).await,
        Err(RegistryError::NotFound(11))
    ));
}

#[tokio::test]
async fn test_bearer_token_and_unauthorized() {
    let stub = StubHttpRegistry::start("guild-1").with_emoji(11, "okay", false);
    stub.require_token("secret");

    assert!(matches!(
        client(&stub, None).list_resources().await,
        Err(RegistryError::Unauthorized(_))
    ));
    assert!(matches!(
        client(&stub, Some("wrong")).delete_resource(11).await,
        Err(RegistryError::Unauthorized(_))
    ));
    assert_eq!(client(&stub, Some("secret")).list_resources().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let stub = StubHttpRegistry::start("guild-1");
    stub.rate_limit_creates(true);

    let result = client(&stub, None).create_resource("okay", PNG.to_vec()).await;
    assert!(matches!(
        result,
        Err(RegistryError::RateLimited {
            retry_after: Some(d)
        }) if d == Duration::from_secs(3)
    ));
}

#[tokio::test]
async fn test_unreachable_registry_is_request_error() {
    let config = HttpRegistryConfig {
        connect_timeout: Duration::from_millis(500),
        ..HttpRegistryConfig::new("http://127.0.0.1:9", "guild-1")
    };
    let client = HttpRegistryClient::new(config).unwrap();
    assert!(matches!(
        client.list_resources().await,
        Err(RegistryError::Request(_))
    ));
}

#[tokio::test]
async fn test_unnamed_emoji_stays_in_listing() {
    let stub = StubHttpRegistry::start("guild-1").with_emoji(123, "", false);

    let resources = client(&stub, None).list_resources().await.unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].id, 123);
    assert!(resources[0].name.is_empty());
}

#[tokio::test]
async fn test_tracked_unnamed_emoji_is_not_pruned() {
    let stub = StubHttpRegistry::start("guild-1").with_emoji(123, "", false);
    let content: MemoryContentSource = [("okay", b"B".to_vec())].into_iter().collect();
    let synchronizer = EmoteSynchronizer::new(Arc::new(content), Arc::new(client(&stub, None)));

    let mut desired = DesiredEmotes::new();
    desired.bind("okay", EmoteSpecification::internal("okay"), |_: &Handle| {});
    let mut ledger = Ledger::from_entries([LedgerEntry {
        key: "okay".to_string(),
        remote_id: 123,
        animated: false,
        content_identifier: fingerprint_bytes(b"B"),
    }]);

    let report = synchronizer.synchronize(&desired, &mut ledger).await.unwrap();

    assert!(report.is_converged());
    assert!(report.pruned.is_empty());
    assert!(report.added.is_empty());
    assert_eq!(ledger.get("okay").map(|e| e.remote_id), Some(123));
    assert_eq!(stub.requests(), vec!["GET /collections/guild-1/emojis".to_string()]);
    assert_eq!(stub.emojis().len(), 1);
}

#[tokio::test]
async fn test_unknown_collection_is_request_error() {
    let stub = StubHttpRegistry::start("guild-1");
    let config = HttpRegistryConfig::new(stub.base_url.clone(), "guild-2");
    let client = HttpRegistryClient::new(config).unwrap();

    assert!(matches!(
        client.list_resources().await,
        Err(RegistryError::Request(message)) if message.contains("404")
    ));
    assert!(matches!(
        client.create_resource("okay", PNG.to_vec()).await,
        Err(RegistryError::Request(_))
    ));
}
