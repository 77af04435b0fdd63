//! Record store: typed reads and writes over users, countries, companies,
//! their monitors, employees and deals.

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use std::collections::HashMap;
use std::fmt;

use crate::entities::{
    company, company_monitor, country, deal, employee, user, Company, CompanyMonitor, Country,
    Deal, Employee, Gender, User,
};
use crate::validation::{validate_date_founded, validate_max_len, validate_required, ValidationError};

#[derive(Debug)]
pub enum StoreError {
    NotFound { entity: &'static str, id: i32 },
    Validation(ValidationError),
    Conflict(String),
    Protected(String),
    Database(DbErr),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { entity, id } => write!(f, "{} {} not found", entity, id),
            StoreError::Validation(err) => write!(f, "{}", err),
            StoreError::Conflict(msg) => write!(f, "{}", msg),
            StoreError::Protected(msg) => write!(f, "{}", msg),
            StoreError::Database(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        StoreError::Database(err)
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::Validation(err)
    }
}

#[derive(Debug, Clone)]
pub struct NewCompany {
    pub name: String,
    pub description: String,
    pub companies_house_id: String,
    pub date_founded: Option<NaiveDate>,
    pub country_id: i32,
}

/// Partial update; `None` leaves the column alone. `date_founded: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct CompanyChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub companies_house_id: Option<String>,
    pub date_founded: Option<Option<NaiveDate>>,
    pub country_id: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub name: String,
    pub job_title: String,
    pub gender: Gender,
    pub email: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Copy)]
pub struct NewDeal {
    pub date_of_deal: NaiveDate,
    pub amount_raised: f64,
}

/// A company joined with the bits of its country and creator that listings show.
#[derive(Debug, Clone)]
pub struct CompanySummary {
    pub company: company::Model,
    pub country_iso_code: String,
    pub creator_username: Option<String>,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// --- users ---

#[tracing::instrument(skip(db))]
pub async fn create_user<C: ConnectionTrait>(
    db: &C,
    username: &str,
    email: &str,
) -> Result<user::Model, StoreError> {
    validate_required("username", username, 150)?;
    if User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
        .is_some()
    {
        return Err(StoreError::Conflict(format!("username {} is taken", username)));
    }

    let user = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        token: Set(uuid::Uuid::new_v4().simple().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!(user_id = user.id, "Created user");
    Ok(user)
}

pub async fn get_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, StoreError> {
    User::find_by_id(id)
        .one(db)
        .await?
        .ok_or(StoreError::NotFound { entity: "user", id })
}

pub async fn find_user_by_token<C: ConnectionTrait>(
    db: &C,
    token: &str,
) -> Result<Option<user::Model>, StoreError> {
    Ok(User::find()
        .filter(user::Column::Token.eq(token))
        .one(db)
        .await?)
}

/// Companies the user created survive with `creator_id` nulled by the foreign key.
#[tracing::instrument(skip(db))]
pub async fn delete_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), StoreError> {
    let result = User::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(StoreError::NotFound { entity: "user", id });
    }
    Ok(())
}

// --- countries ---

#[tracing::instrument(skip(db))]
pub async fn get_or_create_country<C: ConnectionTrait>(
    db: &C,
    iso_code: &str,
    name: &str,
) -> Result<country::Model, StoreError> {
    validate_required("iso_code", iso_code, 3)?;
    if let Some(existing) = Country::find()
        .filter(country::Column::IsoCode.eq(iso_code))
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    validate_required("name", name, 200)?;
    let country = country::ActiveModel {
        iso_code: Set(iso_code.to_string()),
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(country)
}

pub async fn list_countries<C: ConnectionTrait>(db: &C) -> Result<Vec<country::Model>, StoreError> {
    Ok(Country::find()
        .order_by_asc(country::Column::Name)
        .all(db)
        .await?)
}

pub async fn find_country_by_iso<C: ConnectionTrait>(
    db: &C,
    iso_code: &str,
) -> Result<Option<country::Model>, StoreError> {
    Ok(Country::find()
        .filter(country::Column::IsoCode.eq(iso_code))
        .one(db)
        .await?)
}

/// Refuses while any company still points at the country.
#[tracing::instrument(skip(db))]
pub async fn delete_country<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), StoreError> {
    let referencing = Company::find()
        .filter(company::Column::CountryId.eq(id))
        .count(db)
        .await?;
    if referencing > 0 {
        return Err(StoreError::Protected(format!(
            "country {} is referenced by {} companies",
            id, referencing
        )));
    }

    match Country::delete_by_id(id).exec(db).await {
        Ok(result) if result.rows_affected == 0 => Err(StoreError::NotFound { entity: "country", id }),
        Ok(_) => Ok(()),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) => Err(
            StoreError::Protected(format!("country {} is referenced by companies", id)),
        ),
        Err(e) => Err(e.into()),
    }
}

async fn ensure_country<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), StoreError> {
    match Country::find_by_id(id).one(db).await? {
        Some(_) => Ok(()),
        None => Err(StoreError::NotFound { entity: "country", id }),
    }
}

// --- companies ---

#[tracing::instrument(skip(db, new), fields(name = %new.name))]
pub async fn create_company<C: ConnectionTrait>(
    db: &C,
    new: NewCompany,
    creator_id: Option<i32>,
) -> Result<company::Model, StoreError> {
    validate_required("name", &new.name, 200)?;
    validate_max_len("companies_house_id", &new.companies_house_id, 8)?;
    validate_date_founded(new.date_founded, today())?;
    ensure_country(db, new.country_id).await?;

    let now = Utc::now();
    let company = company::ActiveModel {
        name: Set(new.name),
        description: Set(new.description),
        companies_house_id: Set(new.companies_house_id),
        date_founded: Set(new.date_founded),
        country_id: Set(new.country_id),
        creator_id: Set(creator_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!(company_id = company.id, "Created company");
    Ok(company)
}

pub async fn get_company<C: ConnectionTrait>(db: &C, id: i32) -> Result<company::Model, StoreError> {
    Company::find_by_id(id)
        .one(db)
        .await?
        .ok_or(StoreError::NotFound { entity: "company", id })
}

#[tracing::instrument(skip(db, changes))]
pub async fn update_company<C: ConnectionTrait>(
    db: &C,
    id: i32,
    changes: CompanyChanges,
) -> Result<company::Model, StoreError> {
    let mut active: company::ActiveModel = get_company(db, id).await?.into();

    if let Some(name) = changes.name {
        validate_required("name", &name, 200)?;
        active.name = Set(name);
    }
    if let Some(description) = changes.description {
        active.description = Set(description);
    }
    if let Some(companies_house_id) = changes.companies_house_id {
        validate_max_len("companies_house_id", &companies_house_id, 8)?;
        active.companies_house_id = Set(companies_house_id);
    }
    if let Some(date_founded) = changes.date_founded {
        validate_date_founded(date_founded, today())?;
        active.date_founded = Set(date_founded);
    }
    if let Some(country_id) = changes.country_id {
        ensure_country(db, country_id).await?;
        active.country_id = Set(country_id);
    }

    Ok(active.update(db).await?)
}

/// Deals, employees and monitor memberships go with it.
#[tracing::instrument(skip(db))]
pub async fn delete_company<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), StoreError> {
    let result = Company::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(StoreError::NotFound { entity: "company", id });
    }
    tracing::info!(company_id = id, "Deleted company");
    Ok(())
}

/// All companies by id, optionally only those with at least `min_employees` staff.
pub async fn list_companies<C: ConnectionTrait>(
    db: &C,
    min_employees: Option<u64>,
) -> Result<Vec<company::Model>, StoreError> {
    let mut query = Company::find().order_by_asc(company::Column::Id);
    if let Some(min) = min_employees.filter(|n| *n > 0) {
        query = query
            .inner_join(Employee)
            .group_by(company::Column::Id)
            .having(Expr::expr(employee::Column::Id.count()).gte(min as i64));
    }
    Ok(query.all(db).await?)
}

/// First `limit` companies by id with their country code and creator name.
pub async fn list_company_summaries<C: ConnectionTrait>(
    db: &C,
    limit: u64,
) -> Result<Vec<CompanySummary>, StoreError> {
    let rows = Company::find()
        .find_also_related(Country)
        .order_by_asc(company::Column::Id)
        .limit(limit)
        .all(db)
        .await?;

    let creator_ids: Vec<i32> = rows.iter().filter_map(|(c, _)| c.creator_id).collect();
    let usernames: HashMap<i32, String> = if creator_ids.is_empty() {
        HashMap::new()
    } else {
        User::find()
            .filter(user::Column::Id.is_in(creator_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect()
    };

    Ok(rows
        .into_iter()
        .map(|(company, country)| CompanySummary {
            country_iso_code: country.map(|c| c.iso_code).unwrap_or_default(),
            creator_username: company.creator_id.and_then(|id| usernames.get(&id).cloned()),
            company,
        })
        .collect())
}

// --- monitors ---

/// Adds the user to the company's monitors. Calling it again is a no-op.
#[tracing::instrument(skip(db))]
pub async fn start_monitoring<C: ConnectionTrait>(
    db: &C,
    company_id: i32,
    user_id: i32,
) -> Result<(), StoreError> {
    get_company(db, company_id).await?;
    if CompanyMonitor::find_by_id((company_id, user_id))
        .one(db)
        .await?
        .is_some()
    {
        return Ok(());
    }

    let membership = company_monitor::ActiveModel {
        company_id: Set(company_id),
        user_id: Set(user_id),
    };
    match CompanyMonitor::insert(membership).exec_without_returning(db).await {
        Ok(_) => {
            tracing::info!(company_id, user_id, "User started monitoring company");
            Ok(())
        }
        // lost a race with an identical insert; the membership exists either way
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

pub async fn monitored_by<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Vec<company::Model>, StoreError> {
    Ok(Company::find()
        .inner_join(CompanyMonitor)
        .filter(company_monitor::Column::UserId.eq(user_id))
        .order_by_asc(company::Column::Id)
        .all(db)
        .await?)
}

pub async fn monitor_count<C: ConnectionTrait>(db: &C, company_id: i32) -> Result<u64, StoreError> {
    Ok(CompanyMonitor::find()
        .filter(company_monitor::Column::CompanyId.eq(company_id))
        .count(db)
        .await?)
}

// --- employees ---

#[tracing::instrument(skip(db, new), fields(email = %new.email))]
pub async fn add_employee<C: ConnectionTrait>(
    db: &C,
    company_id: i32,
    new: NewEmployee,
) -> Result<employee::Model, StoreError> {
    validate_required("name", &new.name, 200)?;
    validate_required("job_title", &new.job_title, 200)?;
    validate_required("email", &new.email, 254)?;
    validate_max_len("phone_number", &new.phone_number, 20)?;
    get_company(db, company_id).await?;

    let duplicate = Employee::find()
        .filter(employee::Column::CompanyId.eq(company_id))
        .filter(employee::Column::Email.eq(new.email.as_str()))
        .one(db)
        .await?;
    if duplicate.is_some() {
        return Err(employee_conflict(company_id, &new.email));
    }

    let email = new.email.clone();
    let inserted = employee::ActiveModel {
        company_id: Set(company_id),
        name: Set(new.name),
        job_title: Set(new.job_title),
        gender: Set(new.gender),
        email: Set(new.email),
        phone_number: Set(new.phone_number),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await;

    match inserted {
        Ok(employee) => Ok(employee),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(employee_conflict(company_id, &email))
        }
        Err(e) => Err(e.into()),
    }
}

fn employee_conflict(company_id: i32, email: &str) -> StoreError {
    StoreError::Conflict(format!(
        "company {} already has an employee with email {}",
        company_id, email
    ))
}

pub async fn list_employees<C: ConnectionTrait>(
    db: &C,
    company_id: i32,
) -> Result<Vec<employee::Model>, StoreError> {
    get_company(db, company_id).await?;
    Ok(Employee::find()
        .filter(employee::Column::CompanyId.eq(company_id))
        .order_by_asc(employee::Column::Id)
        .all(db)
        .await?)
}

// --- deals ---

#[tracing::instrument(skip(db))]
pub async fn record_deal<C: ConnectionTrait>(
    db: &C,
    company_id: i32,
    new: NewDeal,
) -> Result<deal::Model, StoreError> {
    get_company(db, company_id).await?;
    let deal = deal::ActiveModel {
        company_id: Set(company_id),
        date_of_deal: Set(new.date_of_deal),
        amount_raised: Set(new.amount_raised),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(deal)
}

pub async fn list_deals<C: ConnectionTrait>(
    db: &C,
    company_id: i32,
) -> Result<Vec<deal::Model>, StoreError> {
    get_company(db, company_id).await?;
    Ok(Deal::find()
        .filter(deal::Column::CompanyId.eq(company_id))
        .order_by_asc(deal::Column::DateOfDeal)
        .order_by_asc(deal::Column::Id)
        .all(db)
        .await?)
}
