use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::Json;

use brandbot_core::models::{LoginUser, RegisterUser, UserProfile};
use brandbot_core::services::AuthenticatedUser;
use brandbot_core::Error;

use super::request::JsonBody;
use super::{ApiResult, AppState, RequestCtx, SESSION_HEADER};

type WithToken = ([(HeaderName, HeaderValue); 1], Json<UserProfile>);

fn with_token(auth: AuthenticatedUser) -> ApiResult<WithToken> {
    let value = HeaderValue::from_str(&auth.token)
        .map_err(|e| Error::Config(format!("unusable session token: {e}")))?;
    Ok(([(HeaderName::from_static(SESSION_HEADER), value)], Json(auth.user)))
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterUser>,
) -> ApiResult<(StatusCode, WithToken)> {
    let auth = state.accounts.register(body).await?;
    Ok((StatusCode::CREATED, with_token(auth)?))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginUser>,
) -> ApiResult<WithToken> {
    let auth = state.accounts.login(body).await?;
    with_token(auth)
}

pub async fn logout(State(state): State<AppState>, ctx: RequestCtx) -> StatusCode {
    if let Some(token) = ctx.session_token() {
        state.accounts.logout(token);
    }
    StatusCode::NO_CONTENT
}

pub async fn me(State(state): State<AppState>, ctx: RequestCtx) -> ApiResult<Json<UserProfile>> {
    let user = state.accounts.current_user(ctx.session_token()).await?;
    Ok(Json(UserProfile::from(&user)))
}
