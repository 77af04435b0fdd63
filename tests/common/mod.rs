#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use http_body_util::BodyExt; // For Response body handling
use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::sync::Once;
use tower::ServiceExt; // For oneshot

use companytrack::config::Settings;
use companytrack::entities::{company, country, user, Gender};
use companytrack::store::{self, NewCompany, NewDeal, NewEmployee};
use companytrack::{create_app, db, AppState};

// For initializing tracing once
static INIT: Once = Once::new();

pub fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });
}

/// Fresh, migrated in-memory database.
pub async fn test_db() -> DatabaseConnection {
    setup();
    db::connect("sqlite::memory:").await.unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub struct Fixture {
    pub creator: user::Model,
    pub country: country::Model,
    pub company: company::Model,
    pub newest: company::Model,
    pub middle: company::Model,
}

/// One creator-owned company in France founded 2019-01-01 with three employees
/// and one 1000 deal, plus two creator-less companies elsewhere founded in
/// 2018 and 2017.
pub async fn seed_fixture(db: &DatabaseConnection) -> Fixture {
    let creator = store::create_user(db, "Me", "me@example.com").await.unwrap();
    let country = store::get_or_create_country(db, "fr", "France").await.unwrap();
    let elsewhere = store::get_or_create_country(db, "de", "Germany").await.unwrap();

    let company = store::create_company(
        db,
        new_company("A Company LTD", "LATEST", Some(date(2019, 1, 1)), country.id),
        Some(creator.id),
    )
    .await
    .unwrap();
    let newest = store::create_company(
        db,
        new_company("Second Company", "NEWEST", Some(date(2018, 1, 1)), elsewhere.id),
        None,
    )
    .await
    .unwrap();
    let middle = store::create_company(
        db,
        new_company("Third Company", "MIDDLE", Some(date(2017, 1, 1)), elsewhere.id),
        None,
    )
    .await
    .unwrap();

    for name in ["Ada Lovelace", "Alan Turing", "Grace Hopper"] {
        store::add_employee(db, company.id, new_employee(name)).await.unwrap();
    }
    store::record_deal(
        db,
        company.id,
        NewDeal {
            date_of_deal: date(2020, 5, 1),
            amount_raised: 1000.0,
        },
    )
    .await
    .unwrap();

    Fixture {
        creator,
        country,
        company,
        newest,
        middle,
    }
}

pub fn new_company(name: &str, companies_house_id: &str, date_founded: Option<NaiveDate>, country_id: i32) -> NewCompany {
    NewCompany {
        name: name.to_string(),
        description: String::new(),
        companies_house_id: companies_house_id.to_string(),
        date_founded,
        country_id,
    }
}

pub fn new_employee(name: &str) -> NewEmployee {
    NewEmployee {
        name: name.to_string(),
        job_title: "Engineer".to_string(),
        gender: Gender::Other,
        email: format!("{}@site.com", name.to_lowercase().replace(' ', "-")),
        phone_number: String::new(),
    }
}

/// App over `db` with default settings and rate limiting off.
pub fn test_app(db: DatabaseConnection) -> Router {
    let mut settings = Settings::for_database("sqlite::memory:");
    settings.quarter_wise_years = 20;
    create_app(AppState::new(db, settings))
}

/// Sends one request through the full middleware stack; returns the status and
/// the JSON body (`Value::Null` when the body is empty or not JSON).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Token {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);
    (status, json)
}
