//! Authorizer extractor

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::authorizer::RoleBindingAuthorizer;
use crate::error::{Error, Result};
use crate::state::AppState;

/// Extract a bearer token from the `Authorization` header
///
/// Returns `Ok(None)` when the header is absent. Any other scheme, or a value
/// that is not valid ASCII, is rejected.
pub fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| Error::Unauthorized("Invalid Authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(|token| Some(token.trim()))
        .ok_or_else(|| Error::Unauthorized("Invalid Authorization header format".to_string()))
}

impl FromRequestParts<AppState> for RoleBindingAuthorizer {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = extract_bearer(&parts.headers)?;
        state.authenticator().authenticate(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_missing_header_is_none() {
        assert_eq!(extract_bearer(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer(&headers).unwrap(), Some("abc123"));
    }

    #[test]
    fn test_other_scheme_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(matches!(
            extract_bearer(&headers),
            Err(Error::Unauthorized(_))
        ));
    }
}
