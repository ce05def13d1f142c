use async_trait::async_trait;
use crate::error::Error;
use crate::models::Company;

/// The parts of an incoming request that tenant resolution may look at.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub session_token: Option<String>,
    /// Raw `X-Company-Id` header value.
    pub company_header: Option<String>,
}

impl RequestContext {
    pub fn with_session(token: &str) -> Self {
        Self {
            session_token: Some(token.to_string()),
            company_header: None,
        }
    }

    pub fn with_company_header(value: &str) -> Self {
        Self {
            session_token: None,
            company_header: Some(value.to_string()),
        }
    }
}

/// Supplies the current Company for a request. Fails with `Error::NotFound`
/// when no tenant can be resolved.
#[async_trait]
pub trait TenantResolver: Send + Sync {
    async fn resolve_tenant(&self, ctx: &RequestContext) -> Result<Company, Error>;
}
