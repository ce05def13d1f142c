use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use brandbot_core::models::{Company, CompanyUpdate};
use brandbot_core::Error;

use super::request::JsonBody;
use super::{ApiResult, AppState, RequestCtx};

pub async fn get_company(
    State(state): State<AppState>,
    ctx: RequestCtx,
) -> ApiResult<Json<Company>> {
    let tenant = state.tenants.resolve_tenant(&ctx.0).await?;
    Ok(Json(state.companies.get_company(&tenant).await?))
}

/// Updates the resolved tenant, or provisions one when nothing resolves.
pub async fn upsert_company(
    State(state): State<AppState>,
    ctx: RequestCtx,
    JsonBody(body): JsonBody<CompanyUpdate>,
) -> ApiResult<(StatusCode, Json<Company>)> {
    let tenant = match state.tenants.resolve_tenant(&ctx.0).await {
        Ok(company) => Some(company),
        Err(Error::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };
    let company = state.companies.upsert_company(tenant.as_ref(), body).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn delete_company(
    State(state): State<AppState>,
    ctx: RequestCtx,
) -> ApiResult<StatusCode> {
    let user = state.accounts.current_user(ctx.session_token()).await?;
    let tenant = state.tenants.resolve_tenant(&ctx.0).await?;
    state.companies.delete_company(&tenant).await?;
    if user.company_id == Some(tenant.id) {
        state.accounts.end_sessions_for(user.id);
    }
    Ok(StatusCode::NO_CONTENT)
}
