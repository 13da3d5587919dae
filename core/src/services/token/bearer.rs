use crate::errors::TokenError;

/// Extracts the token from an `Authorization: Bearer {token}` header value
pub fn extract_bearer_token(header: &str) -> Result<&str, TokenError> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(TokenError::MalformedAuthorizationHeader),
    }
}
