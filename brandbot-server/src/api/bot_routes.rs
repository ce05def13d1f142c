use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use brandbot_core::models::{BotAggregate, CreateBot};
use brandbot_core::services::{BotStatus, DomainsUpdated};
use brandbot_core::training::TrainingTrigger;

use super::request::{parse_bot_id, JsonBody};
use super::{ApiResult, AppState, RequestCtx};

#[derive(Debug, Deserialize)]
pub struct DomainsBody {
    #[serde(default)]
    pub domains: Vec<String>,
}

pub async fn create_bot(
    State(state): State<AppState>,
    ctx: RequestCtx,
    JsonBody(body): JsonBody<CreateBot>,
) -> ApiResult<(StatusCode, Json<BotAggregate>)> {
    let company = state.tenants.resolve_tenant(&ctx.0).await?;
    let bot = state.bots.create_bot(&company, body).await?;
    Ok((StatusCode::CREATED, Json(bot)))
}

pub async fn list_bots(
    State(state): State<AppState>,
    ctx: RequestCtx,
) -> ApiResult<Json<Vec<BotAggregate>>> {
    let company = state.tenants.resolve_tenant(&ctx.0).await?;
    Ok(Json(state.bots.list_bots(&company).await?))
}

pub async fn get_bot(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path(id): Path<String>,
) -> ApiResult<Json<BotAggregate>> {
    let company = state.tenants.resolve_tenant(&ctx.0).await?;
    let bot_id = parse_bot_id(&id)?;
    Ok(Json(state.bots.get_bot(&company, bot_id).await?))
}

pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BotStatus>> {
    let bot_id = parse_bot_id(&id)?;
    Ok(Json(state.status.get_status(bot_id).await?))
}

pub async fn train_bot(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<TrainingTrigger>)> {
    let company = state.tenants.resolve_tenant(&ctx.0).await?;
    let bot_id = parse_bot_id(&id)?;
    let trigger = state.bots.retrain_bot(&company, bot_id).await?;
    Ok((StatusCode::ACCEPTED, Json(trigger)))
}

pub async fn replace_domains(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<DomainsBody>,
) -> ApiResult<Json<DomainsUpdated>> {
    let company = state.tenants.resolve_tenant(&ctx.0).await?;
    let bot_id = parse_bot_id(&id)?;
    let updated = state
        .bots
        .replace_whitelisted_domains(&company, bot_id, &body.domains)
        .await?;
    Ok(Json(updated))
}
