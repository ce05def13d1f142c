use std::convert::Infallible;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use uuid::Uuid;
use brandbot_core::auth::tenant::RequestContext;
use brandbot_core::Error;

use super::ApiError;

pub const SESSION_HEADER: &str = "x-session-token";
pub const COMPANY_HEADER: &str = "x-company-id";

/// JSON request body whose rejections answer as `{"detail": ...}`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Tenant-relevant request headers.
#[derive(Debug, Clone, Default)]
pub struct RequestCtx(pub RequestContext);

impl<S> FromRequestParts<S> for RequestCtx
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Ok(RequestCtx(RequestContext {
            session_token: header(SESSION_HEADER),
            company_header: header(COMPANY_HEADER),
        }))
    }
}

impl RequestCtx {
    pub fn session_token(&self) -> Option<&str> {
        self.0.session_token.as_deref()
    }
}

/// Path ids that are not UUIDs name no bot.
pub fn parse_bot_id(raw: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(raw).map_err(|_| Error::NotFound("Bot not found".into()))
}
