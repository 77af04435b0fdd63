use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::SmartIpKeyExtractor,
    GovernorLayer,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod routes;
pub mod stats;
pub mod store;
pub mod validation;

use crate::config::Settings;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, settings: Settings) -> Self {
        AppState {
            db,
            settings: Arc::new(settings),
        }
    }
}

/// Health check endpoint, also pings the database
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String),
        (status = 503, description = "Database unreachable", body = String)
    )
)]
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (StatusCode::OK, "Service is healthy"),
        Err(e) => {
            tracing::error!("Health check failed to reach database: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Database unreachable")
        }
    }
}

struct TokenAuthAddon;

impl Modify for TokenAuthAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "Authorization",
                    "User API token, sent as `Token <token>`",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Company Tracker API",
        version = "0.1.0",
        description = "Companies, their employees, deals and monitors, plus aggregate statistics"
    ),
    paths(
        health_check,
        routes::legacy::legacy_stats,
        routes::stats::company_stats,
        routes::companies::list_companies,
        routes::companies::create_company,
        routes::companies::get_company,
        routes::companies::update_company,
        routes::companies::delete_company,
        routes::companies::monitor_company,
        routes::companies::monitored_companies,
        routes::companies::list_employees,
        routes::companies::add_employee,
        routes::companies::list_deals,
        routes::companies::record_deal,
        routes::companies::list_countries
    ),
    components(schemas(
        routes::companies::CompanyOut,
        routes::companies::CreateCompanyRequest,
        routes::companies::UpdateCompanyRequest,
        routes::companies::EmployeeOut,
        routes::companies::NewEmployeeRequest,
        routes::companies::DealOut,
        routes::companies::NewDealRequest,
        routes::companies::CountryOut,
        routes::stats::CompanyStatsResponse,
        routes::legacy::LegacyStatsResponse,
        stats::QuarterCount,
        stats::CreatorTopCompany,
        stats::CountryDealAverage,
        entities::Gender
    )),
    modifiers(&TokenAuthAddon)
)]
struct ApiDoc;

/// Create the application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let rate_limit = state.settings.rate_limit;

    // --- Define API routes separately ---
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/stats/", get(routes::legacy::legacy_stats))
        .route("/api/countries", get(routes::companies::list_countries))
        .route(
            "/api/companies",
            get(routes::companies::list_companies).post(routes::companies::create_company),
        )
        .route("/api/companies/stats", get(routes::stats::company_stats))
        .route("/api/companies/monitors", get(routes::companies::monitored_companies))
        .route("/api/companies/monitor/{id}", patch(routes::companies::monitor_company))
        .route(
            "/api/companies/{id}",
            get(routes::companies::get_company)
                .patch(routes::companies::update_company)
                .delete(routes::companies::delete_company),
        )
        .route(
            "/api/companies/{id}/employees",
            get(routes::companies::list_employees).post(routes::companies::add_employee),
        )
        .route(
            "/api/companies/{id}/deals",
            get(routes::companies::list_deals).post(routes::companies::record_deal),
        )
        .with_state(state);

    // --- Rate limiting, only when configured ---
    let api_routes = match rate_limit {
        Some(limit) => {
            let governor_conf = GovernorConfigBuilder::default()
                .key_extractor(SmartIpKeyExtractor)
                .period(Duration::from_secs(limit.period_secs))
                .burst_size(limit.burst_size)
                .finish();
            match governor_conf {
                Some(conf) => api_routes.layer(GovernorLayer { config: Arc::new(conf) }),
                None => {
                    tracing::warn!(?limit, "Rate limit settings rejected; serving without rate limiting");
                    api_routes
                }
            }
        }
        None => api_routes,
    };

    let docs_router = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    // --- Build the final application router ---
    Router::new()
        .merge(api_routes)
        .merge(docs_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
