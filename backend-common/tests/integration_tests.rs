//! Integration tests across auth, mapvalue and cache.

use std::time::Duration;

use backend_common::mapvalue::{self, JsonMap};
use backend_common::{CacheClient, MemoryBackend, SessionUser, TypedCache, UserInfo};
use test_utils::fixtures::{admin_session_json, sample_object, standard_session_json};

fn object(value: serde_json::Value) -> JsonMap {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn test_admin_session_claims() {
    let user: SessionUser = serde_json::from_value(admin_session_json()).unwrap();

    assert!(user.is_admin());
    assert!(user.is_platform_admin());
    assert_eq!(user.field_value("site_id"), Some("site-1"));
    assert_eq!(user.field_value("password"), None);
    assert_eq!(
        user.identity_provider_claim("groups"),
        Some(&["engineering".to_string(), "admins".to_string()][..])
    );
    assert_eq!(user.identity_provider_claim("empty"), None);
    assert_eq!(user.identity_attribute_name("idp_attribute"), "groups");
    assert_eq!(user.feature_flags().get("new-builder"), Some(&true));
}

#[test]
fn test_standard_session_defaults() {
    let user: SessionUser = serde_json::from_value(standard_session_json()).unwrap();

    assert!(!user.is_admin());
    assert!(!user.is_platform_admin());
    assert!(user.named_permissions.is_empty());
    assert_eq!(user.identity_attribute_name("idp_attribute"), "");
    assert_eq!(user.profile_name(), "Standard User");
}

#[test]
fn test_session_inspection_with_mapvalue() {
    let session = object(admin_session_json());

    assert!(mapvalue::is_string(&session, "email").is_ok());
    assert!(mapvalue::is_map(&session, "namedPermissions").is_ok());
    assert_eq!(mapvalue::string(&session, "subdomain"), "acme");

    let sample = object(sample_object());
    assert_eq!(mapvalue::integer(&sample, "count"), 3);
    assert_eq!(mapvalue::map_slice(&sample, "children").len(), 2);
    assert_eq!(mapvalue::string_slice(&sample, "tags"), vec!["a", "b"]);
    assert!(mapvalue::bool(&sample, "enabled", false));
}

#[tokio::test]
async fn test_session_round_trip_through_typed_cache() {
    let cache = TypedCache::new(MemoryBackend::default());
    let user: SessionUser = serde_json::from_value(admin_session_json()).unwrap();

    cache
        .set("session:ada", &user, Duration::from_secs(300))
        .await
        .unwrap();
    let loaded: Option<SessionUser> = cache.get("session:ada").await.unwrap();
    assert_eq!(loaded, Some(user));

    cache.delete("session:ada").await.unwrap();
    let loaded: Option<SessionUser> = cache.get("session:ada").await.unwrap();
    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_flattened_object_in_hash_cache() {
    let client = CacheClient::new(MemoryBackend::default());
    let sample = object(sample_object());

    client
        .set_map_values("object:1", &sample, Duration::ZERO)
        .await
        .unwrap();
    let stored = client.get_map("object:1").await.unwrap();

    assert_eq!(stored["name"], "widget");
    assert_eq!(stored["count"], "3");
    assert_eq!(stored["tags"], r#"["a","b"]"#);
    assert_eq!(stored["nothing"], "null");
}
