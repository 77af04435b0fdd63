//! Aggregate views over the record store.
//!
//! Every function takes any [`ConnectionTrait`], so callers can run a batch of
//! them inside one transaction and get figures from the same snapshot.

use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, FromQueryResult, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

use crate::entities::{company, country, deal, employee, user, Company, Deal, Employee};

#[derive(Debug)]
pub enum StatsError {
    /// An average over companies was asked for while there are none.
    NoCompanies,
    Database(DbErr),
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::NoCompanies => write!(f, "No companies to average over"),
            StatsError::Database(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for StatsError {}

impl From<DbErr> for StatsError {
    fn from(err: DbErr) -> Self {
        StatsError::Database(err)
    }
}

/// Number of companies founded in the quarter starting on `founded_quarter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct QuarterCount {
    pub founded_quarter: NaiveDate,
    pub companies: u64,
}

/// The creator's company with the most employees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema, FromQueryResult)]
pub struct CreatorTopCompany {
    pub id: i32,
    pub name: String,
    pub creator_id: i32,
    pub username: String,
    pub emp_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CountryDealAverage {
    pub country: i32,
    pub country_name: String,
    pub iso_code: String,
    pub avg_amt: f64,
}

#[derive(Debug, FromQueryResult)]
struct CreatorTally {
    username: String,
}

#[derive(Debug, FromQueryResult)]
struct CountryDealTotals {
    country_id: i32,
    country_name: String,
    iso_code: String,
    total_raised: f64,
    deals: i64,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// First day of the calendar quarter holding `date`.
pub fn quarter_start(date: NaiveDate) -> NaiveDate {
    let month = (date.month0() / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
}

/// Same calendar day `years` years before `today`; 29 February falls back to the 28th.
/// Windows reaching past the representable range start at [`NaiveDate::MIN`].
pub fn years_before(today: NaiveDate, years: u32) -> NaiveDate {
    i32::try_from(years)
        .ok()
        .and_then(|years| today.year().checked_sub(years))
        .and_then(|year| {
            today
                .with_year(year)
                .or_else(|| NaiveDate::from_ymd_opt(year, today.month(), 28))
        })
        .unwrap_or(NaiveDate::MIN)
}

/// The `limit` most recently founded companies, newest first. Companies with no
/// founding date are left out; equal dates come out by id.
pub async fn recently_founded<C: ConnectionTrait>(
    db: &C,
    limit: u64,
) -> Result<Vec<company::Model>, StatsError> {
    Ok(Company::find()
        .filter(company::Column::DateFounded.is_not_null())
        .order_by_desc(company::Column::DateFounded)
        .order_by_asc(company::Column::Id)
        .limit(limit)
        .all(db)
        .await?)
}

/// Companies founded per calendar quarter over the last `years_back` years.
pub async fn quarter_wise<C: ConnectionTrait>(
    db: &C,
    years_back: u32,
) -> Result<Vec<QuarterCount>, StatsError> {
    quarter_wise_since(db, years_before(Utc::now().date_naive(), years_back)).await
}

/// Quarter buckets for companies founded on or after `start_date`, oldest first.
pub async fn quarter_wise_since<C: ConnectionTrait>(
    db: &C,
    start_date: NaiveDate,
) -> Result<Vec<QuarterCount>, StatsError> {
    let founded = Company::find()
        .filter(company::Column::DateFounded.gte(start_date))
        .all(db)
        .await?;

    let mut buckets: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for date in founded.iter().filter_map(|c| c.date_founded) {
        *buckets.entry(quarter_start(date)).or_default() += 1;
    }

    Ok(buckets
        .into_iter()
        .map(|(founded_quarter, companies)| QuarterCount { founded_quarter, companies })
        .collect())
}

/// Employees per company across all companies, to two decimals.
pub async fn avg_employees<C: ConnectionTrait>(db: &C) -> Result<f64, StatsError> {
    let companies = Company::find().count(db).await?;
    if companies == 0 {
        return Err(StatsError::NoCompanies);
    }
    let employees = Employee::find().count(db).await?;
    Ok(round2(employees as f64 / companies as f64))
}

/// [`avg_employees`] with an empty store read as `None`, which the stats
/// views render as `null`.
pub async fn avg_employees_if_any<C: ConnectionTrait>(db: &C) -> Result<Option<f64>, StatsError> {
    match avg_employees(db).await {
        Ok(avg) => Ok(Some(avg)),
        Err(StatsError::NoCompanies) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Username of whoever created the most companies, lowest user id on a tie.
pub async fn most_companies_created_by_user<C: ConnectionTrait>(
    db: &C,
) -> Result<Option<String>, StatsError> {
    let top = Company::find()
        .select_only()
        .column(user::Column::Username)
        .join(JoinType::InnerJoin, company::Relation::Creator.def())
        .group_by(user::Column::Id)
        .group_by(user::Column::Username)
        .order_by_desc(company::Column::Id.count())
        .order_by_asc(user::Column::Id)
        .into_model::<CreatorTally>()
        .one(db)
        .await?;
    Ok(top.map(|t| t.username))
}

/// One row per creator: their company with the most employees. Companies with
/// no employees never qualify; the lower company id wins a tie.
pub async fn user_company_with_max_emp<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<CreatorTopCompany>, StatsError> {
    let headcounts = Company::find()
        .select_only()
        .column(company::Column::Id)
        .column(company::Column::Name)
        .column(company::Column::CreatorId)
        .column(user::Column::Username)
        .column_as(employee::Column::Id.count(), "emp_count")
        .join(JoinType::InnerJoin, company::Relation::Creator.def())
        .join(JoinType::InnerJoin, company::Relation::Employee.def())
        .group_by(company::Column::Id)
        .group_by(company::Column::Name)
        .group_by(company::Column::CreatorId)
        .group_by(user::Column::Username)
        .order_by_asc(company::Column::CreatorId)
        .order_by_desc(employee::Column::Id.count())
        .order_by_asc(company::Column::Id)
        .into_model::<CreatorTopCompany>()
        .all(db)
        .await?;

    Ok(first_per_creator(headcounts))
}

/// Keeps the first row of each run of equal `creator_id`s.
fn first_per_creator(rows: Vec<CreatorTopCompany>) -> Vec<CreatorTopCompany> {
    let mut top: Vec<CreatorTopCompany> = Vec::new();
    for row in rows {
        if top.last().map(|last| last.creator_id) != Some(row.creator_id) {
            top.push(row);
        }
    }
    top
}

/// Mean deal size per country, to two decimals. Countries whose average isn't
/// positive (including those without deals) are dropped.
pub async fn country_avg_deal_amt<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<CountryDealAverage>, StatsError> {
    let totals = Deal::find()
        .select_only()
        .column_as(country::Column::Id, "country_id")
        .column_as(country::Column::Name, "country_name")
        .column_as(country::Column::IsoCode, "iso_code")
        .column_as(deal::Column::AmountRaised.sum(), "total_raised")
        .column_as(deal::Column::Id.count(), "deals")
        .join(JoinType::InnerJoin, deal::Relation::Company.def())
        .join(JoinType::InnerJoin, company::Relation::Country.def())
        .group_by(country::Column::Id)
        .group_by(country::Column::Name)
        .group_by(country::Column::IsoCode)
        .order_by_asc(country::Column::Id)
        .into_model::<CountryDealTotals>()
        .all(db)
        .await?;

    // filter on the raw mean; rounding only shapes the output
    Ok(totals
        .into_iter()
        .filter(|t| t.deals > 0)
        .map(|t| (t.total_raised / t.deals as f64, t))
        .filter(|(mean, _)| *mean > 0.0)
        .map(|(mean, t)| CountryDealAverage {
            country: t.country_id,
            country_name: t.country_name,
            iso_code: t.iso_code,
            avg_amt: round2(mean),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_quarter_start() {
        assert_eq!(quarter_start(date(2019, 1, 1)), date(2019, 1, 1));
        assert_eq!(quarter_start(date(2019, 3, 31)), date(2019, 1, 1));
        assert_eq!(quarter_start(date(2019, 4, 1)), date(2019, 4, 1));
        assert_eq!(quarter_start(date(2019, 8, 15)), date(2019, 7, 1));
        assert_eq!(quarter_start(date(2019, 12, 31)), date(2019, 10, 1));
    }

    #[test]
    fn test_years_before_handles_leap_day() {
        assert_eq!(years_before(date(2024, 6, 1), 5), date(2019, 6, 1));
        assert_eq!(years_before(date(2024, 2, 29), 1), date(2023, 2, 28));
        assert_eq!(years_before(date(2024, 2, 29), 4), date(2020, 2, 29));
    }

    #[test]
    fn test_years_before_saturates_on_huge_windows() {
        assert_eq!(years_before(date(2024, 6, 1), u32::MAX), NaiveDate::MIN);
        assert_eq!(years_before(date(2024, 6, 1), i32::MAX as u32), NaiveDate::MIN);
        assert_eq!(years_before(date(2024, 6, 1), 1_000_000), NaiveDate::MIN);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.0), 1.0);
        assert_eq!(round2(2.0 / 3.0), 0.67);
        assert_eq!(round2(1234.5678), 1234.57);
    }

    #[test]
    fn test_first_per_creator_keeps_leading_row() {
        let row = |id, creator_id, emp_count| CreatorTopCompany {
            id,
            name: format!("company {}", id),
            creator_id,
            username: format!("user{}", creator_id),
            emp_count,
        };
        let top = first_per_creator(vec![row(4, 1, 5), row(2, 1, 3), row(7, 2, 1), row(9, 3, 2), row(3, 3, 2)]);
        let picked: Vec<(i32, i32)> = top.iter().map(|r| (r.creator_id, r.id)).collect();
        assert_eq!(picked, vec![(1, 4), (2, 7), (3, 9)]);
    }
}
