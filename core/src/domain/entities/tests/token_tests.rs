//! Unit tests for token entities

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::entities::account::AccountIdentity;
use crate::domain::entities::token::{
    account_key_prefix, session_key, IdentityClaims, RefreshClaims, RefreshTokenSession,
    TokenPair, VerifiedClaims,
};

#[test]
fn test_identity_claims() {
    let account = AccountIdentity::new(Uuid::new_v4(), 2);
    let claims = IdentityClaims::new(account, Duration::minutes(30)).unwrap();

    assert_eq!(claims.account, account);
    assert_eq!(claims.exp - claims.iat, 30 * 60);
}

#[test]
fn test_refresh_claims_have_unique_ids() {
    let account_id = Uuid::new_v4();
    let first = RefreshClaims::new(account_id, 2, Duration::days(3)).unwrap();
    let second = RefreshClaims::new(account_id, 2, Duration::days(3)).unwrap();

    assert_eq!(first.account_id, account_id);
    assert_ne!(first.jti, second.jti);
}

#[test]
fn test_identity_claims_wire_format() {
    let account = AccountIdentity::new(Uuid::new_v4(), 1);
    let claims = IdentityClaims::new(account, Duration::minutes(5)).unwrap();

    let json = serde_json::to_value(&claims).unwrap();
    assert_eq!(json["account"]["id"], account.id.to_string());
    assert_eq!(json["account"]["roleId"], 1);
    assert!(json["exp"].is_i64());
}

#[test]
fn test_verified_claims_expiry() {
    let account = AccountIdentity::new(Uuid::new_v4(), 2);
    let claims = VerifiedClaims::Identity(IdentityClaims::new(account, Duration::zero()).unwrap());
    let now = Utc::now().timestamp();

    assert!(claims.is_expired_at(now, 0));
    assert!(!claims.is_expired_at(now, 30));
}

#[test]
fn test_unrepresentable_expiry_is_rejected() {
    let account = AccountIdentity::new(Uuid::new_v4(), 2);
    // Far beyond the largest representable date
    let huge = Duration::days(365 * 1_000_000);

    assert!(IdentityClaims::new(account, huge).is_none());
    assert!(RefreshClaims::new(account.id, 2, huge).is_none());
}

#[test]
fn test_verified_claims_accessors() {
    let refresh = RefreshClaims::new(Uuid::new_v4(), 7, Duration::hours(1)).unwrap();
    let claims = VerifiedClaims::Refresh(refresh.clone());

    assert_eq!(claims.role_id(), 7);
    assert_eq!(claims.expires_at(), refresh.exp);
    assert!(claims.clone().into_identity().is_none());
    assert_eq!(claims.into_refresh(), Some(refresh));
}

#[test]
fn test_refresh_session_from_claims() {
    let claims = RefreshClaims::new(Uuid::new_v4(), 2, Duration::hours(1)).unwrap();
    let session = RefreshTokenSession::from(("signed".to_string(), claims.clone()));

    assert_eq!(session.id, claims.jti);
    assert_eq!(session.account_id, claims.account_id);
    assert_eq!(session.signed_string, "signed");
}

#[test]
fn test_session_keys() {
    let account_id = Uuid::new_v4();
    let token_id = Uuid::new_v4();

    let key = session_key(account_id, token_id);
    assert_eq!(key, format!("{}:{}", account_id, token_id));
    assert!(key.starts_with(&account_key_prefix(account_id)));
}

#[test]
fn test_token_pair_hides_ids() {
    let pair = TokenPair {
        identity_token: "id".to_string(),
        refresh_token: "refresh".to_string(),
        refresh_token_id: Uuid::new_v4(),
        account_id: Uuid::new_v4(),
        identity_expires_in: 1800,
        refresh_expires_in: 259_200,
    };

    let json = serde_json::to_value(&pair).unwrap();
    assert_eq!(json["identityToken"], "id");
    assert_eq!(json["refreshToken"], "refresh");
    assert!(json.get("refreshTokenId").is_none());
    assert!(json.get("accountId").is_none());
}
