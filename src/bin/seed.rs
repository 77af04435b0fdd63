//! Populates the configured database with dummy (but realistic) data.
//!
//! Usage:
//!   companytrack-seed                 # 20 companies
//!   companytrack-seed --companies 50
//!
//! Reads `DATABASE_URL` like the server does and runs migrations first.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use std::env;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use companytrack::config::Settings;
use companytrack::entities::{user, Gender, User};
use companytrack::store::{self, NewCompany, NewDeal, NewEmployee, StoreError};
use companytrack::db;

const USERS: usize = 10;
const COUNTRIES: usize = 5;
const DEFAULT_COMPANIES: usize = 20;
const FIRST_DEAL_YEAR: i32 = 2010;

const COUNTRY_POOL: &[(&str, &str)] = &[
    ("gb", "United Kingdom"),
    ("fr", "France"),
    ("de", "Germany"),
    ("us", "United States"),
    ("es", "Spain"),
    ("it", "Italy"),
    ("nl", "Netherlands"),
    ("se", "Sweden"),
    ("ie", "Ireland"),
    ("pt", "Portugal"),
];

const COMPANY_PREFIXES: &[&str] = &[
    "Acme", "Blue Harbour", "Copperleaf", "Driftwood", "Evergreen", "Foxglove", "Granite",
    "Hartwell", "Ironbridge", "Juniper", "Kestrel", "Lanternfish", "Meridian", "Northwind",
];
const COMPANY_SUFFIXES: &[&str] = &["Labs", "Systems", "Holdings", "Analytics", "Robotics", "Health", "Capital"];

const FIRST_NAMES: &[&str] = &[
    "Alice", "Ben", "Chloe", "Dev", "Elena", "Farid", "Grace", "Hugo", "Isla", "Jonas", "Keira", "Luca",
];
const LAST_NAMES: &[&str] = &["Adams", "Brown", "Chen", "Dubois", "Evans", "Fischer", "Garcia", "Hughes", "Ito"];
const JOB_TITLES: &[&str] = &[
    "Software Engineer", "Product Manager", "Designer", "Data Scientist", "Account Executive",
    "Head of Operations", "Chief Technology Officer",
];
const GENDERS: &[Gender] = &[Gender::Male, Gender::Female, Gender::Other];

fn slugify(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}

fn pick<'a, T>(rng: &mut impl Rng, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

fn past_date(rng: &mut impl Rng, today: NaiveDate) -> NaiveDate {
    today - Duration::days(rng.gen_range(1..=365 * 20))
}

/// Creates `count` users named `user<n>`, counting on from the current row
/// count and stepping over names left behind by earlier runs.
async fn create_seed_users(db: &DatabaseConnection, count: usize) -> anyhow::Result<Vec<user::Model>> {
    let mut n = User::find().count(db).await? as usize;
    let mut users = Vec::with_capacity(count);
    while users.len() < count {
        let username = format!("user{}", n);
        n += 1;
        match store::create_user(db, &username, &format!("{}@example.com", username)).await {
            Ok(user) => users.push(user),
            Err(StoreError::Conflict(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(users)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing (INFO level)
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Command-line flags
    let args: Vec<String> = env::args().collect();
    let companies_wanted = match args.iter().position(|a| a == "--companies") {
        Some(i) => args
            .get(i + 1)
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| anyhow::anyhow!("--companies needs a number"))?,
        None => DEFAULT_COMPANIES,
    };

    let settings = Settings::from_env()?;
    let db_conn = db::connect(&settings.database_url).await?;
    let mut rng = rand::thread_rng();
    let today = Utc::now().date_naive();

    let users = create_seed_users(&db_conn, USERS).await?;

    let mut countries = Vec::with_capacity(COUNTRIES);
    for (iso_code, name) in COUNTRY_POOL.choose_multiple(&mut rng, COUNTRIES) {
        countries.push(store::get_or_create_country(&db_conn, iso_code, name).await?);
    }

    let mut companies = Vec::with_capacity(companies_wanted);
    for _ in 0..companies_wanted {
        let name = format!("{} {}", pick(&mut rng, COMPANY_PREFIXES), pick(&mut rng, COMPANY_SUFFIXES));
        let creator = pick(&mut rng, &users).id;
        let company = store::create_company(
            &db_conn,
            NewCompany {
                description: format!("{} is a made-up company.", name),
                name,
                companies_house_id: format!("{:08}", rng.gen_range(0..100_000_000u32)),
                date_founded: Some(past_date(&mut rng, today)),
                country_id: pick(&mut rng, &countries).id,
            },
            Some(creator),
        )
        .await?;

        let headcount = rng.gen_range(0..=5);
        for i in 0..headcount {
            let full_name = format!("{} {}", pick(&mut rng, FIRST_NAMES), pick(&mut rng, LAST_NAMES));
            let employee = NewEmployee {
                email: format!("{}.{}@site.com", slugify(&full_name), i),
                name: full_name,
                job_title: pick(&mut rng, JOB_TITLES).to_string(),
                gender: *pick(&mut rng, GENDERS),
                phone_number: String::new(),
            };
            store::add_employee(&db_conn, company.id, employee).await?;
        }

        let monitors: Vec<i32> = users.choose_multiple(&mut rng, headcount).map(|u| u.id).collect();
        for user_id in monitors {
            store::start_monitoring(&db_conn, company.id, user_id).await?;
        }
        companies.push(company);
    }

    let mut deals = 0;
    if !companies.is_empty() {
        for year in FIRST_DEAL_YEAR..today.year() {
            for month in 1..=12 {
                for _ in 0..rng.gen_range(0..=5) {
                    let date_of_deal = NaiveDate::from_ymd_opt(year, month, rng.gen_range(1..=28))
                        .ok_or_else(|| anyhow::anyhow!("bad deal date {}-{}", year, month))?;
                    let company_id = pick(&mut rng, &companies).id;
                    let amount_raised = rng.gen_range(0..=10_000_000u32) as f64;
                    store::record_deal(&db_conn, company_id, NewDeal { date_of_deal, amount_raised }).await?;
                    deals += 1;
                }
            }
        }
    }

    info!(
        users = users.len(),
        countries = countries.len(),
        companies = companies.len(),
        deals,
        "Database populated"
    );
    Ok(())
}
