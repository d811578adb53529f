//! # Caller Identity
//!
//! Authentication happens upstream. The gateway forwards the resolved session
//! as two headers, which this extractor turns into an [`Identity`]:
//!
//! - `X-User-Id`: the user's UUID
//! - `X-User-Type`: `customer`, `instructor` or `admin`
//!
//! Requests without a usable identity are rejected with 401.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use classbook_core::models::people::{Identity, UserType};
use serde_json::json;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_TYPE_HEADER: &str = "x-user-type";

/// Extractor for the authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Identity);

#[derive(Debug)]
pub struct AuthRejection(String);

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": format!("Authentication error: {}", self.0) }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AuthRejection> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| AuthRejection(format!("missing {name} header")))?
        .to_str()
        .map_err(|_| AuthRejection(format!("malformed {name} header")))
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = Uuid::parse_str(header(parts, USER_ID_HEADER)?.trim())
            .map_err(|_| AuthRejection(format!("malformed {USER_ID_HEADER} header")))?;
        let user_type: UserType = header(parts, USER_TYPE_HEADER)?
            .trim()
            .to_ascii_lowercase()
            .parse()
            .map_err(AuthRejection)?;

        Ok(Caller(Identity { user_id, user_type }))
    }
}
