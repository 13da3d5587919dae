//! Integration tests for the Redis-backed token lifecycle
//!
//! These tests require a running Redis instance to execute.
//! Run with: cargo test -p gp_infra --test redis_integration -- --ignored

use std::sync::Arc;

use uuid::Uuid;

use gp_core::domain::AccountIdentity;
use gp_core::errors::{DomainError, TokenError};
use gp_core::services::token::{
    generate_rsa_pem_pair, KeyMaterial, RequestContext, TokenLifecycleConfig,
    TokenLifecycleManager,
};
use gp_infra::cache::{CacheConfig, RedisClient, RedisSessionStore};

async fn manager() -> TokenLifecycleManager<RedisSessionStore> {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let config = CacheConfig::new(url).with_prefix(format!("it-{}", Uuid::new_v4()));
    let client = RedisClient::new(config).await.expect("Failed to connect to Redis");

    let (private_pem, public_pem) = generate_rsa_pem_pair(2048).unwrap();
    let keys = KeyMaterial::from_pem_strings(&private_pem, &public_pem, b"redis-it-secret").unwrap();

    TokenLifecycleManager::new(
        RedisSessionStore::new(client),
        Arc::new(keys),
        TokenLifecycleConfig::default(),
    )
    .unwrap()
}

fn is_invalid_refresh<T>(result: &Result<T, DomainError>) -> bool {
    matches!(
        result,
        Err(DomainError::Token(TokenError::InvalidRefreshToken))
    )
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_issue_rotate_revoke_over_redis() {
    let manager = manager().await;
    let ctx = RequestContext::background();
    let account = AccountIdentity::new(Uuid::new_v4(), 2);

    let first = manager.issue_pair(&ctx, &account, None).await.unwrap();
    let second = manager
        .rotate(&ctx, &first.refresh_token, &account)
        .await
        .unwrap();
    assert!(is_invalid_refresh(
        &manager.rotate(&ctx, &first.refresh_token, &account).await
    ));

    manager.issue_pair(&ctx, &account, None).await.unwrap();
    assert_eq!(manager.revoke_all(&ctx, account.id).await.unwrap(), 2);
    assert!(is_invalid_refresh(
        &manager.rotate(&ctx, &second.refresh_token, &account).await
    ));

    manager.close().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_concurrent_rotation_over_redis() {
    let manager = Arc::new(manager().await);
    let ctx = RequestContext::background();
    let account = AccountIdentity::new(Uuid::new_v4(), 2);
    let pair = manager.issue_pair(&ctx, &account, None).await.unwrap();

    let (a, b) = tokio::join!(
        manager.issue_pair(&ctx, &account, Some(pair.refresh_token_id)),
        manager.issue_pair(&ctx, &account, Some(pair.refresh_token_id)),
    );

    assert_eq!([&a, &b].iter().filter(|r| r.is_ok()).count(), 1);
    assert!(is_invalid_refresh(&a) || is_invalid_refresh(&b));

    manager.revoke_all(&ctx, account.id).await.unwrap();
}
