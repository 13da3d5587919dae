//! Tests for error classification and client responses

use gp_shared::errors::{error_codes, messages, ErrorResponse, IntoErrorResponse};

use super::{DomainError, TokenError};

#[test]
fn test_credential_failures_map_to_401() {
    let failures = [
        TokenError::InvalidSignature,
        TokenError::Expired,
        TokenError::InsufficientRole,
        TokenError::InvalidRefreshToken,
        TokenError::MalformedAuthorizationHeader,
    ];

    for failure in failures {
        let err = DomainError::from(failure);
        assert!(err.is_authorization_failure(), "{err} should be a 4xx");
        assert_eq!(err.status_code(), 401);
    }
}

#[test]
fn test_system_failures_map_to_500() {
    let failures = [
        DomainError::internal("redis down"),
        DomainError::KeyMaterial { message: "bad pem".to_string() },
        DomainError::PartialRevocation { revoked: 2, failed: 1 },
        DomainError::Canceled,
        DomainError::Token(TokenError::SigningFailed { message: "bad key".to_string() }),
    ];

    for err in failures {
        assert!(!err.is_authorization_failure(), "{err} should be a 5xx");
        assert_eq!(err.status_code(), 500);
    }
}

#[test]
fn test_authorization_responses_are_uniform() {
    let expired: ErrorResponse = (&DomainError::from(TokenError::Expired)).into();
    let bad_signature: ErrorResponse = (&DomainError::from(TokenError::InvalidSignature)).into();
    let revoked = DomainError::from(TokenError::InvalidRefreshToken).to_error_response();

    for response in [&expired, &bad_signature, &revoked] {
        assert_eq!(response.error, error_codes::UNAUTHORIZED);
        assert_eq!(response.message, messages::INVALID_CREDENTIAL);
    }
}

#[test]
fn test_internal_response_is_opaque() {
    let err = DomainError::internal("connection refused to 10.0.0.3:6379");
    let response = err.to_error_response();

    assert_eq!(response.error, error_codes::INTERNAL_ERROR);
    assert!(!response.message.contains("10.0.0.3"));
    // The full cause is still available for server-side logs
    assert!(err.to_string().contains("10.0.0.3"));
}

#[test]
fn test_partial_revocation_message() {
    let err = DomainError::PartialRevocation { revoked: 3, failed: 2 };
    assert_eq!(
        err.to_string(),
        "Revocation incomplete: 3 sessions revoked, 2 deletions failed"
    );
}
