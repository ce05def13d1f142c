//! Tenant resolution strategies.
//!
//! Every strategy fails with `Error::NotFound("Company not found")` when it
//! cannot name a company, so callers map an unresolved tenant to 404.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;
use brandbot_common::models::Company;
pub use brandbot_common::traits::tenant_traits::{RequestContext, TenantResolver};
use crate::auth::SessionStore;
use crate::repositories::{CompanyRepository, UserRepository};
use crate::Error;

fn company_not_found() -> Error {
    Error::NotFound("Company not found".into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TenantStrategy {
    /// Oldest company in the store. Single-tenant deployments and demos.
    #[default]
    First,
    Header,
    Session,
}

impl fmt::Display for TenantStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TenantStrategy::First => "first",
            TenantStrategy::Header => "header",
            TenantStrategy::Session => "session",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TenantStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(TenantStrategy::First),
            "header" => Ok(TenantStrategy::Header),
            "session" => Ok(TenantStrategy::Session),
            other => Err(format!("Unknown tenant strategy: {other}")),
        }
    }
}

impl TenantStrategy {
    pub fn build(
        self,
        companies: Arc<dyn CompanyRepository>,
        users: Arc<dyn UserRepository>,
        sessions: Arc<SessionStore>,
    ) -> Arc<dyn TenantResolver> {
        match self {
            TenantStrategy::First => Arc::new(FirstCompanyResolver::new(companies)),
            TenantStrategy::Header => Arc::new(HeaderTenantResolver::new(companies)),
            TenantStrategy::Session => Arc::new(SessionTenantResolver::new(companies, users, sessions)),
        }
    }
}

pub struct FirstCompanyResolver {
    companies: Arc<dyn CompanyRepository>,
}

impl FirstCompanyResolver {
    pub fn new(companies: Arc<dyn CompanyRepository>) -> Self {
        Self { companies }
    }
}

#[async_trait]
impl TenantResolver for FirstCompanyResolver {
    async fn resolve_tenant(&self, _ctx: &RequestContext) -> Result<Company, Error> {
        self.companies.first_company().await?.ok_or_else(company_not_found)
    }
}

/// Reads the company id from the `X-Company-Id` header.
pub struct HeaderTenantResolver {
    companies: Arc<dyn CompanyRepository>,
}

impl HeaderTenantResolver {
    pub fn new(companies: Arc<dyn CompanyRepository>) -> Self {
        Self { companies }
    }
}

#[async_trait]
impl TenantResolver for HeaderTenantResolver {
    async fn resolve_tenant(&self, ctx: &RequestContext) -> Result<Company, Error> {
        let Some(raw) = ctx.company_header.as_deref() else {
            return Err(company_not_found());
        };
        let Ok(company_id) = Uuid::parse_str(raw.trim()) else {
            debug!("Ignoring malformed X-Company-Id header: {}", raw);
            return Err(company_not_found());
        };
        self.companies.get_company(company_id).await?.ok_or_else(company_not_found)
    }
}

/// The company of the user behind the session token.
pub struct SessionTenantResolver {
    companies: Arc<dyn CompanyRepository>,
    users: Arc<dyn UserRepository>,
    sessions: Arc<SessionStore>,
}

impl SessionTenantResolver {
    pub fn new(
        companies: Arc<dyn CompanyRepository>,
        users: Arc<dyn UserRepository>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self { companies, users, sessions }
    }
}

#[async_trait]
impl TenantResolver for SessionTenantResolver {
    async fn resolve_tenant(&self, ctx: &RequestContext) -> Result<Company, Error> {
        let session = ctx
            .session_token
            .as_deref()
            .and_then(|token| self.sessions.get(token))
            .ok_or_else(company_not_found)?;

        let user = self.users.get_user(session.user_id).await?.ok_or_else(company_not_found)?;
        let company_id = user.company_id.ok_or_else(company_not_found)?;
        self.companies.get_company(company_id).await?.ok_or_else(company_not_found)
    }
}
