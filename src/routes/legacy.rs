//! `GET /stats/`, the original dashboard feed. Its shape (and its odd ordering
//! of `most_recently_founded`) is kept as-is for the existing front end.

use axum::{extract::State, Json};
use chrono::{Datelike, NaiveDate};
use sea_orm::TransactionTrait;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::stats::{self, CreatorTopCompany, QuarterCount};
use crate::store::{self, CompanySummary};
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct LegacyCompany {
    pub companies_house_id: String,
    pub name: String,
    pub description: String,
    pub date_founded: Option<NaiveDate>,
    #[serde(rename = "country__iso_code")]
    pub country_iso_code: String,
    #[serde(rename = "creator__username")]
    pub creator_username: Option<String>,
}

impl From<CompanySummary> for LegacyCompany {
    fn from(summary: CompanySummary) -> Self {
        LegacyCompany {
            companies_house_id: summary.company.companies_house_id,
            name: summary.company.name,
            description: summary.company.description,
            date_founded: summary.company.date_founded,
            country_iso_code: summary.country_iso_code,
            creator_username: summary.creator_username,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LegacyQuarter {
    pub year: i32,
    pub quarter: u32,
    pub value: u64,
}

impl From<QuarterCount> for LegacyQuarter {
    fn from(count: QuarterCount) -> Self {
        LegacyQuarter {
            year: count.founded_quarter.year(),
            quarter: count.founded_quarter.month0() / 3 + 1,
            value: count.companies,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LegacyCountryAverage {
    /// Country ISO code
    pub country: String,
    pub average_deal_amount_raised: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LegacyStatsResponse {
    pub most_recently_founded: Vec<LegacyCompany>,
    pub average_employee_count: Option<f64>,
    pub companies_founded_per_quarter: Vec<LegacyQuarter>,
    pub user_created_most_companies: Option<String>,
    pub user_created_most_employees: Option<String>,
    pub average_deal_amount_raised_by_country: Vec<LegacyCountryAverage>,
}

/// The first `limit` companies by id, then sorted by founding date, oldest
/// first. Undated companies sort ahead of dated ones.
pub fn most_recently_founded_companies(mut companies: Vec<CompanySummary>, limit: usize) -> Vec<LegacyCompany> {
    companies.truncate(limit);
    companies.sort_by_key(|summary| summary.company.date_founded);
    companies.into_iter().map(LegacyCompany::from).collect()
}

/// Owner of the single company with the most employees.
fn user_with_largest_company(rows: &[CreatorTopCompany]) -> Option<String> {
    rows.iter()
        .max_by(|a, b| a.emp_count.cmp(&b.emp_count).then(b.creator_id.cmp(&a.creator_id)))
        .map(|row| row.username.clone())
}

/// Legacy dashboard statistics
#[utoipa::path(
    get,
    path = "/stats/",
    responses(
        (status = 200, description = "Dashboard statistics in the original shape", body = LegacyStatsResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn legacy_stats(State(state): State<AppState>) -> Result<Json<LegacyStatsResponse>, AppError> {
    let limit = state.settings.recently_founded_limit;
    let txn = state.db.begin().await?;

    let summaries = store::list_company_summaries(&txn, limit).await?;
    let average_employee_count = stats::avg_employees_if_any(&txn).await?;
    let quarters = stats::quarter_wise(&txn, state.settings.quarter_wise_years).await?;
    let user_created_most_companies = stats::most_companies_created_by_user(&txn).await?;
    let top_companies = stats::user_company_with_max_emp(&txn).await?;
    let country_averages = stats::country_avg_deal_amt(&txn).await?;

    txn.commit().await?;

    Ok(Json(LegacyStatsResponse {
        most_recently_founded: most_recently_founded_companies(summaries, limit as usize),
        average_employee_count,
        companies_founded_per_quarter: quarters.into_iter().map(LegacyQuarter::from).collect(),
        user_created_most_companies,
        user_created_most_employees: user_with_largest_company(&top_companies),
        average_deal_amount_raised_by_country: country_averages
            .into_iter()
            .map(|avg| LegacyCountryAverage {
                country: avg.iso_code,
                average_deal_amount_raised: avg.avg_amt,
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::company;
    use chrono::Utc;

    fn summary(id: i32, date_founded: Option<NaiveDate>) -> CompanySummary {
        let now = Utc::now();
        CompanySummary {
            company: company::Model {
                id,
                companies_house_id: format!("CH{}", id),
                name: format!("Company {}", id),
                description: String::new(),
                date_founded,
                country_id: 1,
                creator_id: None,
                created_at: now,
                updated_at: now,
            },
            country_iso_code: "gb".to_string(),
            creator_username: None,
        }
    }

    #[test]
    fn test_most_recently_founded_keeps_legacy_ascending_order() {
        let d = |y| NaiveDate::from_ymd_opt(y, 1, 1);
        let rows = vec![summary(1, d(2019)), summary(2, d(2017)), summary(3, None), summary(4, d(2018))];

        let picked = most_recently_founded_companies(rows, 3);
        let ids: Vec<&str> = picked.iter().map(|c| c.companies_house_id.as_str()).collect();
        // limit applies before sorting, so company 4 never shows up
        assert_eq!(ids, vec!["CH3", "CH2", "CH1"]);
    }

    #[test]
    fn test_quarter_labels() {
        let q = LegacyQuarter::from(QuarterCount {
            founded_quarter: NaiveDate::from_ymd_opt(2018, 10, 1).unwrap(),
            companies: 4,
        });
        assert_eq!((q.year, q.quarter, q.value), (2018, 4, 4));
    }

    #[test]
    fn test_user_with_largest_company_prefers_lower_creator_on_tie() {
        let row = |creator_id, username: &str, emp_count| CreatorTopCompany {
            id: creator_id * 10,
            name: "x".to_string(),
            creator_id,
            username: username.to_string(),
            emp_count,
        };
        let rows = vec![row(1, "jane", 3), row(2, "jeff", 5), row(3, "joan", 5)];
        assert_eq!(user_with_largest_company(&rows), Some("jeff".to_string()));
        assert_eq!(user_with_largest_company(&[]), None);
    }
}
