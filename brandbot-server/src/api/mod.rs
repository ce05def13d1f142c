//! brandbot-server/src/api/mod.rs
//!
//! HTTP surface under `/rest/v1`.

mod auth_routes;
mod bot_routes;
mod company_routes;
mod error;
mod health;
mod request;


use std::sync::Arc;
use axum::Router;
use axum::routing::{get, post, put};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use brandbot_core::auth::tenant::TenantResolver;
use brandbot_core::services::{AccountService, BotService, CompanyService, StatusService};

pub use error::{ApiError, ApiResult};
pub use request::{RequestCtx, SESSION_HEADER};

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub tenants: Arc<dyn TenantResolver>,
    pub bots: Arc<BotService>,
    pub status: Arc<StatusService>,
    pub companies: Arc<CompanyService>,
    pub accounts: Arc<AccountService>,
}

pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/health/live", get(health::live))
        .route("/bot", post(bot_routes::create_bot))
        .route("/bots", get(bot_routes::list_bots))
        .route("/bot/{id}", get(bot_routes::get_bot))
        .route("/bot/{id}/status", get(bot_routes::get_status))
        .route("/bot/{id}/train", post(bot_routes::train_bot))
        .route("/bot/{id}/domains", put(bot_routes::replace_domains))
        .route(
            "/company",
            get(company_routes::get_company)
                .post(company_routes::upsert_company)
                .delete(company_routes::delete_company),
        )
        .route("/register", post(auth_routes::register))
        .route("/login", post(auth_routes::login))
        .route("/logout", post(auth_routes::logout))
        .route("/me", get(auth_routes::me))
        .with_state(state);

    Router::new()
        .nest("/rest/v1", v1)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}
