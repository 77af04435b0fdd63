use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::AuthUser;
use crate::entities::{company, country, deal, employee, Gender};
use crate::error::AppError;
use crate::store::{self, CompanyChanges, NewCompany, NewDeal, NewEmployee};
use crate::AppState;

/// Company as exposed over the API
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct CompanyOut {
    pub name: String,
    pub companies_house_id: String,
    pub id: i32,
    pub date_founded: Option<NaiveDate>,
}

impl From<company::Model> for CompanyOut {
    fn from(company: company::Model) -> Self {
        CompanyOut {
            name: company.name,
            companies_house_id: company.companies_house_id,
            id: company.id,
            date_founded: company.date_founded,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CompanyListQuery {
    /// Optional: only companies with at least this many employees
    #[param(required = false)]
    min_employees: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCompanyRequest {
    /// Company name (max 200 characters)
    name: String,
    #[serde(default)]
    description: String,
    /// Companies House registry id (max 8 characters)
    #[serde(default)]
    companies_house_id: String,
    /// Founding date; may not be in the future
    date_founded: Option<NaiveDate>,
    /// ISO code of an existing country
    country: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCompanyRequest {
    name: Option<String>,
    description: Option<String>,
    companies_house_id: Option<String>,
    /// Send `null` to clear the date, leave it out to keep it
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, format = Date)]
    date_founded: Option<Option<NaiveDate>>,
    /// ISO code of an existing country
    country: Option<String>,
}

// tells a missing field (None) apart from an explicit null (Some(None))
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EmployeeOut {
    pub id: i32,
    pub company: i32,
    pub name: String,
    pub job_title: String,
    pub gender: Gender,
    /// Human readable gender
    pub gender_display: String,
    pub email: String,
    pub phone_number: String,
}

/// Display label for a stored gender code.
pub fn gender_label(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "Male",
        Gender::Female => "Female",
        Gender::Other => "Other",
    }
}

impl From<employee::Model> for EmployeeOut {
    fn from(employee: employee::Model) -> Self {
        EmployeeOut {
            id: employee.id,
            company: employee.company_id,
            name: employee.name,
            job_title: employee.job_title,
            gender_display: gender_label(employee.gender).to_string(),
            gender: employee.gender,
            email: employee.email,
            phone_number: employee.phone_number,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewEmployeeRequest {
    name: String,
    job_title: String,
    /// One of `M`, `F`, `O`
    gender: Gender,
    /// Unique within the company
    email: String,
    #[serde(default)]
    phone_number: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DealOut {
    pub id: i32,
    pub company: i32,
    pub date_of_deal: NaiveDate,
    pub amount_raised: f64,
}

impl From<deal::Model> for DealOut {
    fn from(deal: deal::Model) -> Self {
        DealOut {
            id: deal.id,
            company: deal.company_id,
            date_of_deal: deal.date_of_deal,
            amount_raised: deal.amount_raised,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewDealRequest {
    date_of_deal: NaiveDate,
    amount_raised: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CountryOut {
    pub id: i32,
    pub iso_code: String,
    pub name: String,
}

impl From<country::Model> for CountryOut {
    fn from(country: country::Model) -> Self {
        CountryOut {
            id: country.id,
            iso_code: country.iso_code,
            name: country.name,
        }
    }
}

async fn country_id_for(state: &AppState, iso_code: &str) -> Result<i32, AppError> {
    store::find_country_by_iso(&state.db, iso_code)
        .await?
        .map(|c| c.id)
        .ok_or_else(|| AppError::InvalidRequest(format!("unknown country: {}", iso_code)))
}

/// List companies
#[utoipa::path(
    get,
    path = "/api/companies",
    params(CompanyListQuery),
    responses(
        (status = 200, description = "Companies ordered by id", body = [CompanyOut])
    )
)]
#[tracing::instrument(skip_all, fields(min_employees = ?query.min_employees))]
pub async fn list_companies(
    State(state): State<AppState>,
    Query(query): Query<CompanyListQuery>,
) -> Result<Json<Vec<CompanyOut>>, AppError> {
    let companies = store::list_companies(&state.db, query.min_employees).await?;
    Ok(Json(companies.into_iter().map(CompanyOut::from).collect()))
}

/// Create a company; the caller becomes its creator
#[utoipa::path(
    post,
    path = "/api/companies",
    request_body = CreateCompanyRequest,
    responses(
        (status = 201, description = "Company created", body = CompanyOut),
        (status = 400, description = "Invalid input, e.g. a founding date in the future"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("token" = []))
)]
#[tracing::instrument(skip_all, fields(user = %user.username))]
pub async fn create_company(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateCompanyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let country_id = country_id_for(&state, &request.country).await?;
    let company = store::create_company(
        &state.db,
        NewCompany {
            name: request.name,
            description: request.description,
            companies_house_id: request.companies_house_id,
            date_founded: request.date_founded,
            country_id,
        },
        Some(user.id),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(CompanyOut::from(company))))
}

/// Fetch a single company
#[utoipa::path(
    get,
    path = "/api/companies/{id}",
    params(("id" = i32, Path, description = "Company id")),
    responses(
        (status = 200, description = "The company", body = CompanyOut),
        (status = 404, description = "No such company")
    )
)]
pub async fn get_company(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CompanyOut>, AppError> {
    Ok(Json(store::get_company(&state.db, id).await?.into()))
}

/// Partially update a company
#[utoipa::path(
    patch,
    path = "/api/companies/{id}",
    params(("id" = i32, Path, description = "Company id")),
    request_body = UpdateCompanyRequest,
    responses(
        (status = 200, description = "Updated company", body = CompanyOut),
        (status = 400, description = "Invalid input, e.g. a founding date in the future"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No such company")
    ),
    security(("token" = []))
)]
#[tracing::instrument(skip_all, fields(company_id = id))]
pub async fn update_company(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    payload: Result<Json<UpdateCompanyRequest>, JsonRejection>,
) -> Result<Json<CompanyOut>, AppError> {
    let Json(request) = payload?;
    let country_id = match request.country.as_deref() {
        Some(iso_code) => Some(country_id_for(&state, iso_code).await?),
        None => None,
    };
    let changes = CompanyChanges {
        name: request.name,
        description: request.description,
        companies_house_id: request.companies_house_id,
        date_founded: request.date_founded,
        country_id,
    };
    Ok(Json(store::update_company(&state.db, id, changes).await?.into()))
}

/// Delete a company along with its deals and employees
#[utoipa::path(
    delete,
    path = "/api/companies/{id}",
    params(("id" = i32, Path, description = "Company id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No such company")
    ),
    security(("token" = []))
)]
#[tracing::instrument(skip_all, fields(company_id = id))]
pub async fn delete_company(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    store::delete_company(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start monitoring a company as the calling user
#[utoipa::path(
    patch,
    path = "/api/companies/monitor/{id}",
    params(("id" = i32, Path, description = "Company id")),
    responses(
        (status = 200, description = "Caller now monitors the company", body = CompanyOut),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No such company")
    ),
    security(("token" = []))
)]
#[tracing::instrument(skip_all, fields(company_id = id, user = %user.username))]
pub async fn monitor_company(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<CompanyOut>, AppError> {
    store::start_monitoring(&state.db, id, user.id).await?;
    Ok(Json(store::get_company(&state.db, id).await?.into()))
}

/// Companies the calling user monitors
#[utoipa::path(
    get,
    path = "/api/companies/monitors",
    responses(
        (status = 200, description = "Monitored companies ordered by id", body = [CompanyOut]),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("token" = []))
)]
pub async fn monitored_companies(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<CompanyOut>>, AppError> {
    let companies = store::monitored_by(&state.db, user.id).await?;
    Ok(Json(companies.into_iter().map(CompanyOut::from).collect()))
}

/// Employees of a company
#[utoipa::path(
    get,
    path = "/api/companies/{id}/employees",
    params(("id" = i32, Path, description = "Company id")),
    responses(
        (status = 200, description = "Employees ordered by id", body = [EmployeeOut]),
        (status = 404, description = "No such company")
    )
)]
pub async fn list_employees(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<EmployeeOut>>, AppError> {
    let employees = store::list_employees(&state.db, id).await?;
    Ok(Json(employees.into_iter().map(EmployeeOut::from).collect()))
}

/// Add an employee to a company
#[utoipa::path(
    post,
    path = "/api/companies/{id}/employees",
    params(("id" = i32, Path, description = "Company id")),
    request_body = NewEmployeeRequest,
    responses(
        (status = 201, description = "Employee added", body = EmployeeOut),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No such company"),
        (status = 409, description = "Email already used within this company")
    ),
    security(("token" = []))
)]
#[tracing::instrument(skip_all, fields(company_id = id))]
pub async fn add_employee(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    payload: Result<Json<NewEmployeeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let employee = store::add_employee(
        &state.db,
        id,
        NewEmployee {
            name: request.name,
            job_title: request.job_title,
            gender: request.gender,
            email: request.email,
            phone_number: request.phone_number,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(EmployeeOut::from(employee))))
}

/// Funding deals of a company
#[utoipa::path(
    get,
    path = "/api/companies/{id}/deals",
    params(("id" = i32, Path, description = "Company id")),
    responses(
        (status = 200, description = "Deals ordered by date", body = [DealOut]),
        (status = 404, description = "No such company")
    )
)]
pub async fn list_deals(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<DealOut>>, AppError> {
    let deals = store::list_deals(&state.db, id).await?;
    Ok(Json(deals.into_iter().map(DealOut::from).collect()))
}

/// Record a funding deal
#[utoipa::path(
    post,
    path = "/api/companies/{id}/deals",
    params(("id" = i32, Path, description = "Company id")),
    request_body = NewDealRequest,
    responses(
        (status = 201, description = "Deal recorded", body = DealOut),
        (status = 400, description = "Amount is not a finite number"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No such company")
    ),
    security(("token" = []))
)]
#[tracing::instrument(skip_all, fields(company_id = id))]
pub async fn record_deal(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
    payload: Result<Json<NewDealRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    if !request.amount_raised.is_finite() {
        return Err(AppError::InvalidRequest("amount_raised must be a finite number".to_string()));
    }
    let deal = store::record_deal(
        &state.db,
        id,
        NewDeal {
            date_of_deal: request.date_of_deal,
            amount_raised: request.amount_raised,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(DealOut::from(deal))))
}

/// Reference list of countries
#[utoipa::path(
    get,
    path = "/api/countries",
    responses(
        (status = 200, description = "Countries ordered by name", body = [CountryOut])
    )
)]
pub async fn list_countries(State(state): State<AppState>) -> Result<Json<Vec<CountryOut>>, AppError> {
    let countries = store::list_countries(&state.db).await?;
    Ok(Json(countries.into_iter().map(CountryOut::from).collect()))
}
