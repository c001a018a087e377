//! HTTP route handlers.

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod items;
pub mod metrics;

use axum::http::HeaderMap;
use uuid::Uuid;

use common::{Identity, SessionId, UserId};

use crate::error::ApiError;

const USER_HEADER: &str = "x-user-id";
const SESSION_HEADER: &str = "x-session-id";

/// Resolves the caller's identity from request headers.
///
/// `X-User-Id` wins over `X-Session-Id`; one of the two is required for
/// cart and checkout operations.
pub(crate) fn caller_identity(headers: &HeaderMap) -> Result<Identity, ApiError> {
    if let Some(uuid) = header_uuid(headers, USER_HEADER)? {
        return Ok(Identity::User(UserId::from_uuid(uuid)));
    }
    if let Some(uuid) = header_uuid(headers, SESSION_HEADER)? {
        return Ok(Identity::Anonymous(SessionId::from_uuid(uuid)));
    }
    Err(ApiError::BadRequest(
        "Missing X-User-Id or X-Session-Id header".to_string(),
    ))
}

/// Resolves the caller's anonymous session, if the header is present.
pub(crate) fn caller_session(headers: &HeaderMap) -> Result<Option<SessionId>, ApiError> {
    Ok(header_uuid(headers, SESSION_HEADER)?.map(SessionId::from_uuid))
}

fn header_uuid(headers: &HeaderMap, name: &str) -> Result<Option<Uuid>, ApiError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    let text = value
        .to_str()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {name} header")))?;
    Uuid::parse_str(text)
        .map(Some)
        .map_err(|e| ApiError::BadRequest(format!("Invalid {name} header: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_header_wins_over_session() {
        let user = Uuid::new_v4();
        let session = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, user.to_string().parse().unwrap());
        headers.insert(SESSION_HEADER, session.to_string().parse().unwrap());

        let identity = caller_identity(&headers).unwrap();
        assert_eq!(identity, Identity::User(UserId::from_uuid(user)));
    }

    #[test]
    fn session_header_yields_anonymous() {
        let session = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, session.to_string().parse().unwrap());

        let identity = caller_identity(&headers).unwrap();
        assert_eq!(identity, Identity::Anonymous(SessionId::from_uuid(session)));
    }

    #[test]
    fn missing_headers_are_rejected() {
        let result = caller_identity(&HeaderMap::new());
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn malformed_uuid_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, "not-a-uuid".parse().unwrap());
        let result = caller_identity(&headers);
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}
