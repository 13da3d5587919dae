//! Unit tests for the claims codec

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use crate::domain::entities::{AccountIdentity, TokenKind, VerifiedClaims};
use crate::errors::TokenError;
use crate::services::token::{ClaimsCodec, KeyMaterial, RoleRequirement};

use super::mocks::{ADMIN_ROLE, TEST_KEYS, TEST_PEMS, USER_ROLE};

fn codec() -> ClaimsCodec {
    ClaimsCodec::new(TEST_KEYS.clone(), ADMIN_ROLE, 0)
}

fn user() -> AccountIdentity {
    AccountIdentity::new(Uuid::new_v4(), USER_ROLE)
}

fn admin() -> AccountIdentity {
    AccountIdentity::new(Uuid::new_v4(), ADMIN_ROLE)
}

#[test]
fn test_identity_token_round_trip() {
    let codec = codec();
    let account = user();

    let token = codec
        .sign_identity_token(&account, Duration::minutes(15))
        .expect("Failed to sign identity token");
    let claims = codec
        .parse_identity_token(&token)
        .expect("Failed to parse identity token");

    assert_eq!(claims.account, account);
    assert_eq!(claims.exp - claims.iat, 15 * 60);
}

#[test]
fn test_refresh_token_round_trip() {
    let codec = codec();
    let account_id = Uuid::new_v4();

    let signed = codec
        .sign_refresh_token(account_id, USER_ROLE, Duration::days(3))
        .expect("Failed to sign refresh token");
    let claims = codec
        .parse_refresh_token(&signed.signed_string)
        .expect("Failed to parse refresh token");

    assert_eq!(claims.account_id, account_id);
    assert_eq!(claims.role_id, USER_ROLE);
    assert_eq!(claims.jti, signed.id);
    assert_eq!(signed.expires_in, std::time::Duration::from_secs(3 * 24 * 60 * 60));
}

#[test]
fn test_refresh_tokens_get_distinct_ids() {
    let codec = codec();
    let account_id = Uuid::new_v4();

    let first = codec
        .sign_refresh_token(account_id, USER_ROLE, Duration::hours(1))
        .unwrap();
    let second = codec
        .sign_refresh_token(account_id, USER_ROLE, Duration::hours(1))
        .unwrap();

    assert_ne!(first.id, second.id);
}

#[test]
fn test_zero_ttl_tokens_are_expired() {
    let codec = codec();
    let account = user();

    let identity = codec.sign_identity_token(&account, Duration::zero()).unwrap();
    assert_eq!(
        codec.parse_identity_token(&identity),
        Err(TokenError::Expired)
    );

    let refresh = codec
        .sign_refresh_token(account.id, account.role_id, Duration::zero())
        .unwrap();
    assert_eq!(
        codec.parse_refresh_token(&refresh.signed_string),
        Err(TokenError::Expired)
    );
}

#[test]
fn test_leeway_accepts_recently_expired_token() {
    let account = user();
    let token = codec()
        .sign_identity_token(&account, Duration::seconds(-5))
        .unwrap();

    let lenient = ClaimsCodec::new(TEST_KEYS.clone(), ADMIN_ROLE, 60);
    assert_eq!(lenient.parse_identity_token(&token).unwrap().account, account);
    assert_eq!(codec().parse_identity_token(&token), Err(TokenError::Expired));
}

#[test]
fn test_admin_parsing_requires_admin_role() {
    let codec = codec();

    let user_token = codec.sign_identity_token(&user(), Duration::minutes(5)).unwrap();
    assert_eq!(
        codec.parse_admin_identity_token(&user_token),
        Err(TokenError::InsufficientRole)
    );

    let admin_account = admin();
    let admin_token = codec
        .sign_identity_token(&admin_account, Duration::minutes(5))
        .unwrap();
    assert_eq!(
        codec.parse_admin_identity_token(&admin_token).unwrap().account,
        admin_account
    );

    let user_refresh = codec
        .sign_refresh_token(Uuid::new_v4(), USER_ROLE, Duration::hours(1))
        .unwrap();
    assert_eq!(
        codec.parse_admin_refresh_token(&user_refresh.signed_string),
        Err(TokenError::InsufficientRole)
    );

    let admin_refresh = codec
        .sign_refresh_token(Uuid::new_v4(), ADMIN_ROLE, Duration::hours(1))
        .unwrap();
    assert!(codec
        .parse_admin_refresh_token(&admin_refresh.signed_string)
        .is_ok());
}

#[test]
fn test_expired_admin_token_is_rejected_as_expired() {
    let codec = codec();
    let token = codec.sign_identity_token(&admin(), Duration::zero()).unwrap();

    assert_eq!(
        codec.parse_admin_identity_token(&token),
        Err(TokenError::Expired)
    );
}

#[test]
fn test_tampered_token_is_rejected() {
    let codec = codec();
    let token = codec.sign_identity_token(&user(), Duration::minutes(5)).unwrap();

    let (head, signature) = token.rsplit_once('.').unwrap();
    let mut signature: Vec<char> = signature.chars().collect();
    signature[0] = if signature[0] == 'A' { 'B' } else { 'A' };
    let tampered = format!("{}.{}", head, signature.into_iter().collect::<String>());

    assert_eq!(
        codec.parse_identity_token(&tampered),
        Err(TokenError::InvalidSignature)
    );
}

#[test]
fn test_malformed_token_is_invalid_signature() {
    let codec = codec();

    assert_eq!(codec.parse_identity_token(""), Err(TokenError::InvalidSignature));
    assert_eq!(
        codec.parse_refresh_token("not.a.jwt"),
        Err(TokenError::InvalidSignature)
    );
}

#[test]
fn test_token_kinds_are_not_interchangeable() {
    let codec = codec();
    let account = user();

    let identity = codec.sign_identity_token(&account, Duration::minutes(5)).unwrap();
    let refresh = codec
        .sign_refresh_token(account.id, account.role_id, Duration::hours(1))
        .unwrap();

    assert_eq!(
        codec.parse_refresh_token(&identity),
        Err(TokenError::InvalidSignature)
    );
    assert_eq!(
        codec.parse_identity_token(&refresh.signed_string),
        Err(TokenError::InvalidSignature)
    );
}

#[test]
fn test_refresh_token_from_other_secret_is_rejected() {
    let (private_pem, public_pem) = &*TEST_PEMS;
    let other_keys =
        KeyMaterial::from_pem_strings(private_pem, public_pem, b"a-completely-different-secret")
            .unwrap();
    let other = ClaimsCodec::new(Arc::new(other_keys), ADMIN_ROLE, 0);

    let foreign = other
        .sign_refresh_token(Uuid::new_v4(), USER_ROLE, Duration::hours(1))
        .unwrap();

    assert_eq!(
        codec().parse_refresh_token(&foreign.signed_string),
        Err(TokenError::InvalidSignature)
    );
}

#[test]
fn test_parse_returns_tagged_claims() {
    let codec = codec();
    let account = admin();
    let token = codec.sign_identity_token(&account, Duration::minutes(5)).unwrap();

    let claims = codec
        .parse(TokenKind::Identity, RoleRequirement::Admin, &token)
        .unwrap();

    assert_eq!(claims.role_id(), ADMIN_ROLE);
    assert!(matches!(claims, VerifiedClaims::Identity(_)));
}

#[test]
fn test_negative_refresh_ttl_is_a_signing_failure() {
    let result = codec().sign_refresh_token(Uuid::new_v4(), USER_ROLE, Duration::seconds(-1));

    assert!(matches!(result, Err(TokenError::SigningFailed { .. })));
}

#[test]
fn test_unrepresentable_ttl_is_a_signing_failure() {
    let codec = codec();
    let ttl = Duration::days(365 * 1_000_000);

    let identity = codec.sign_identity_token(&user(), ttl);
    let refresh = codec.sign_refresh_token(Uuid::new_v4(), USER_ROLE, ttl);

    assert!(matches!(identity, Err(TokenError::SigningFailed { .. })));
    assert!(matches!(refresh, Err(TokenError::SigningFailed { .. })));
}
