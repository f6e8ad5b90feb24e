use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64ct::{Base64, Encoding};
use sea_orm::DatabaseConnection;

use crate::errors::EsdrError;
use crate::storage;

/// Authenticated caller: the user behind the credential plus the OAuth2
/// client the bearer token was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub client_id: i64,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let auth_val = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok())?;
    let b64 = auth_val.strip_prefix("Basic ")?;
    let decoded = Base64::decode_vec(b64).ok()?;
    let s = String::from_utf8(decoded).ok()?;
    let (username, password) = s.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Resolves a bearer token to its principal. Unknown, expired, and revoked
/// tokens all come back None.
pub async fn resolve_bearer(
    db: &DatabaseConnection,
    headers: &HeaderMap,
) -> Result<Option<Principal>, EsdrError> {
    let token = match bearer_token(headers) {
        Some(t) => t,
        None => return Ok(None),
    };
    let row = match storage::get_access_token(db, &token).await? {
        Some(r) => r,
        None => return Ok(None),
    };
    Ok(Some(Principal {
        user_id: row.user_id,
        client_id: row.client_id,
    }))
}

/// Authenticates a caller that may present either a bearer token or HTTP
/// Basic user credentials. Returns the user id.
pub async fn resolve_user(
    db: &DatabaseConnection,
    headers: &HeaderMap,
) -> Result<Option<i64>, EsdrError> {
    if let Some(principal) = resolve_bearer(db, headers).await? {
        return Ok(Some(principal.user_id));
    }
    if let Some((username, password)) = basic_credentials(headers) {
        if let Some(user) = storage::verify_user_password(db, &username, &password).await? {
            return Ok(Some(user.id));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        let headers = headers_with_auth("Bearer abc123");
        assert_eq!(bearer_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn test_bearer_token_absent() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        let headers = headers_with_auth("Basic abc123");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_basic_credentials_decoded() {
        let encoded = Base64::encode_string(b"alice:s3cret");
        let headers = headers_with_auth(&format!("Basic {}", encoded));
        assert_eq!(
            basic_credentials(&headers),
            Some(("alice".to_string(), "s3cret".to_string()))
        );
    }

    #[test]
    fn test_basic_credentials_password_may_contain_colon() {
        let encoded = Base64::encode_string(b"alice:pa:ss");
        let headers = headers_with_auth(&format!("Basic {}", encoded));
        assert_eq!(
            basic_credentials(&headers),
            Some(("alice".to_string(), "pa:ss".to_string()))
        );
    }

    #[test]
    fn test_basic_credentials_rejects_garbage() {
        let headers = headers_with_auth("Basic not-base64!");
        assert_eq!(basic_credentials(&headers), None);
        let headers = headers_with_auth("Bearer abc");
        assert_eq!(basic_credentials(&headers), None);
    }
}
