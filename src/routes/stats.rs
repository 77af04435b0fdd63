use axum::{extract::State, Json};
use sea_orm::TransactionTrait;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::routes::companies::CompanyOut;
use crate::stats::{self, CountryDealAverage, CreatorTopCompany, QuarterCount};
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct CompanyStatsResponse {
    /// Most recently founded companies, newest first
    pub recently_founded: Vec<CompanyOut>,
    /// Companies founded per calendar quarter, keyed by quarter start date
    pub quarter_wise: Vec<QuarterCount>,
    /// Employees per company; null when there are no companies
    pub avg_employees: Option<f64>,
    /// Username of the user who created the most companies
    pub most_companies_created_by_user: Option<String>,
    /// Each creator's company with the most employees
    pub user_company_with_max_emp: Vec<CreatorTopCompany>,
    /// Average deal amount raised per country
    pub country_avg_deal_amt: Vec<CountryDealAverage>,
}

/// Aggregate statistics over all companies
#[utoipa::path(
    get,
    path = "/api/companies/stats",
    responses(
        (status = 200, description = "Statistics computed from one consistent snapshot", body = CompanyStatsResponse),
        (status = 500, description = "Database error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn company_stats(State(state): State<AppState>) -> Result<Json<CompanyStatsResponse>, AppError> {
    let txn = state.db.begin().await?;

    let recently_founded = stats::recently_founded(&txn, state.settings.recently_founded_limit).await?;
    let quarter_wise = stats::quarter_wise(&txn, state.settings.quarter_wise_years).await?;
    let avg_employees = stats::avg_employees_if_any(&txn).await?;
    let most_companies_created_by_user = stats::most_companies_created_by_user(&txn).await?;
    let user_company_with_max_emp = stats::user_company_with_max_emp(&txn).await?;
    let country_avg_deal_amt = stats::country_avg_deal_amt(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        recently_founded = recently_founded.len(),
        quarters = quarter_wise.len(),
        "Computed company stats"
    );

    Ok(Json(CompanyStatsResponse {
        recently_founded: recently_founded.into_iter().map(CompanyOut::from).collect(),
        quarter_wise,
        avg_employees,
        most_companies_created_by_user,
        user_company_with_max_emp,
        country_avg_deal_amt,
    }))
}
