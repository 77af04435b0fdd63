mod common;

use chrono::{Datelike, Utc};

use common::{date, new_company, new_employee, seed_fixture, test_db};
use companytrack::stats::{self, QuarterCount, StatsError};
use companytrack::store::{self, NewDeal};

#[tokio::test]
async fn test_recently_founded() {
    let db = test_db().await;
    let fixture = seed_fixture(&db).await;

    let companies = stats::recently_founded(&db, 10).await.unwrap();
    let ids: Vec<&str> = companies.iter().map(|c| c.companies_house_id.as_str()).collect();
    assert_eq!(ids, vec!["LATEST", "NEWEST", "MIDDLE"]);

    let top = stats::recently_founded(&db, 1).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].id, fixture.company.id);
}

#[tokio::test]
async fn test_recently_founded_skips_undated_and_breaks_ties_by_id() {
    let db = test_db().await;
    let fixture = seed_fixture(&db).await;
    let undated = store::create_company(&db, new_company("No Date Ltd", "UNDATED", None, fixture.country.id), None)
        .await
        .unwrap();
    let twin = store::create_company(
        &db,
        new_company("Twin Ltd", "TWIN", Some(date(2019, 1, 1)), fixture.country.id),
        None,
    )
    .await
    .unwrap();

    let ids: Vec<i32> = stats::recently_founded(&db, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec![fixture.company.id, twin.id, fixture.newest.id, fixture.middle.id]);
    assert!(!ids.contains(&undated.id));
}

#[tokio::test]
async fn test_quarter_wise() {
    let db = test_db().await;
    seed_fixture(&db).await;
    let current_year = Utc::now().date_naive().year();

    let quarters = stats::quarter_wise(&db, (current_year - 2000) as u32).await.unwrap();
    assert_eq!(
        quarters,
        vec![
            QuarterCount { founded_quarter: date(2017, 1, 1), companies: 1 },
            QuarterCount { founded_quarter: date(2018, 1, 1), companies: 1 },
            QuarterCount { founded_quarter: date(2019, 1, 1), companies: 1 },
        ]
    );
}

#[tokio::test]
async fn test_quarter_wise_since_window_and_buckets() {
    let db = test_db().await;
    let fixture = seed_fixture(&db).await;
    for (chid, founded) in [("Q1B", date(2019, 3, 31)), ("Q2", date(2019, 4, 1))] {
        store::create_company(&db, new_company(chid, chid, Some(founded), fixture.country.id), None)
            .await
            .unwrap();
    }

    let quarters = stats::quarter_wise_since(&db, date(2018, 1, 1)).await.unwrap();
    assert_eq!(
        quarters,
        vec![
            QuarterCount { founded_quarter: date(2018, 1, 1), companies: 1 },
            QuarterCount { founded_quarter: date(2019, 1, 1), companies: 2 },
            QuarterCount { founded_quarter: date(2019, 4, 1), companies: 1 },
        ]
    );
}

#[tokio::test]
async fn test_avg_employees() {
    let db = test_db().await;
    seed_fixture(&db).await;

    // 3 employees over 3 companies
    assert_eq!(stats::avg_employees(&db).await.unwrap(), 1.0);
}

#[tokio::test]
async fn test_avg_employees_rounds_to_two_places() {
    let db = test_db().await;
    let fixture = seed_fixture(&db).await;
    store::add_employee(&db, fixture.newest.id, new_employee("Barbara Liskov"))
        .await
        .unwrap();

    assert_eq!(stats::avg_employees(&db).await.unwrap(), 1.33);
}

#[tokio::test]
async fn test_avg_employees_without_companies() {
    let db = test_db().await;

    assert!(matches!(stats::avg_employees(&db).await, Err(StatsError::NoCompanies)));
}

#[tokio::test]
async fn test_most_companies_created_by_user() {
    let db = test_db().await;
    let fixture = seed_fixture(&db).await;

    assert_eq!(
        stats::most_companies_created_by_user(&db).await.unwrap(),
        Some("Me".to_string())
    );

    let prolific = store::create_user(&db, "Prolific", "p@example.com").await.unwrap();
    for chid in ["P1", "P2"] {
        store::create_company(&db, new_company(chid, chid, None, fixture.country.id), Some(prolific.id))
            .await
            .unwrap();
    }
    assert_eq!(
        stats::most_companies_created_by_user(&db).await.unwrap(),
        Some("Prolific".to_string())
    );
}

#[tokio::test]
async fn test_most_companies_created_by_user_without_creators() {
    let db = test_db().await;
    let fixture = seed_fixture(&db).await;
    store::delete_user(&db, fixture.creator.id).await.unwrap();

    assert_eq!(stats::most_companies_created_by_user(&db).await.unwrap(), None);
}

#[tokio::test]
async fn test_user_company_with_max_emp() {
    let db = test_db().await;
    let fixture = seed_fixture(&db).await;

    let rows = stats::user_company_with_max_emp(&db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, fixture.company.id);
    assert_eq!(rows[0].creator_id, fixture.creator.id);
    assert_eq!(rows[0].username, "Me");
    assert_eq!(rows[0].emp_count, 3);
}

#[tokio::test]
async fn test_user_company_with_max_emp_one_row_per_creator() {
    let db = test_db().await;
    let fixture = seed_fixture(&db).await;
    let bigger = store::create_company(
        &db,
        new_company("Bigger Ltd", "BIGGER", None, fixture.country.id),
        Some(fixture.creator.id),
    )
    .await
    .unwrap();
    for name in ["A One", "B Two", "C Three", "D Four"] {
        store::add_employee(&db, bigger.id, new_employee(name)).await.unwrap();
    }
    // a creator whose only company has no staff is left out
    let idle = store::create_user(&db, "Idle", "idle@example.com").await.unwrap();
    store::create_company(&db, new_company("Empty Ltd", "EMPTY", None, fixture.country.id), Some(idle.id))
        .await
        .unwrap();

    let rows = stats::user_company_with_max_emp(&db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, bigger.id);
    assert_eq!(rows[0].emp_count, 4);
}

#[tokio::test]
async fn test_country_avg_deal_amt() {
    let db = test_db().await;
    let fixture = seed_fixture(&db).await;

    let rows = stats::country_avg_deal_amt(&db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].country, fixture.country.id);
    assert_eq!(rows[0].iso_code, "fr");
    assert_eq!(rows[0].country_name, "France");
    assert_eq!(rows[0].avg_amt, 1000.0);
}

#[tokio::test]
async fn test_country_avg_deal_amt_averages_and_drops_non_positive() {
    let db = test_db().await;
    let fixture = seed_fixture(&db).await;
    store::record_deal(
        &db,
        fixture.company.id,
        NewDeal { date_of_deal: date(2021, 1, 1), amount_raised: 333.34 },
    )
    .await
    .unwrap();
    // Germany only has a zero deal
    store::record_deal(
        &db,
        fixture.newest.id,
        NewDeal { date_of_deal: date(2021, 1, 1), amount_raised: 0.0 },
    )
    .await
    .unwrap();

    let rows = stats::country_avg_deal_amt(&db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].iso_code, "fr");
    assert_eq!(rows[0].avg_amt, 666.67);
}

#[tokio::test]
async fn test_country_avg_deal_amt_keeps_tiny_positive_average() {
    let db = test_db().await;
    let fixture = seed_fixture(&db).await;
    store::record_deal(
        &db,
        fixture.newest.id,
        NewDeal { date_of_deal: date(2021, 1, 1), amount_raised: 0.004 },
    )
    .await
    .unwrap();

    let rows = stats::country_avg_deal_amt(&db).await.unwrap();
    let codes: Vec<(&str, f64)> = rows.iter().map(|r| (r.iso_code.as_str(), r.avg_amt)).collect();
    // positive before rounding, so Germany stays in with a displayed 0.0
    assert_eq!(codes, vec![("fr", 1000.0), ("de", 0.0)]);
}

#[tokio::test]
async fn test_most_companies_created_by_user_tie_goes_to_lowest_user_id() {
    let db = test_db().await;
    let fixture = seed_fixture(&db).await;
    // "Me" has one company; a later user with one company ties
    let later = store::create_user(&db, "Later", "later@example.com").await.unwrap();
    assert!(later.id > fixture.creator.id);
    store::create_company(&db, new_company("Later Ltd", "LATER", None, fixture.country.id), Some(later.id))
        .await
        .unwrap();

    assert_eq!(
        stats::most_companies_created_by_user(&db).await.unwrap(),
        Some("Me".to_string())
    );
}

#[tokio::test]
async fn test_user_company_with_max_emp_tie_goes_to_lowest_company_id() {
    let db = test_db().await;
    let fixture = seed_fixture(&db).await;
    // same headcount as the fixture company, created later
    let rival = store::create_company(
        &db,
        new_company("Rival Ltd", "RIVAL", None, fixture.country.id),
        Some(fixture.creator.id),
    )
    .await
    .unwrap();
    for name in ["X One", "Y Two", "Z Three"] {
        store::add_employee(&db, rival.id, new_employee(name)).await.unwrap();
    }
    // a second creator whose companies tie as well
    let other = store::create_user(&db, "Other", "other@example.com").await.unwrap();
    let mut other_ids = Vec::new();
    for chid in ["O1", "O2"] {
        let company = store::create_company(&db, new_company(chid, chid, None, fixture.country.id), Some(other.id))
            .await
            .unwrap();
        store::add_employee(&db, company.id, new_employee("Solo Worker")).await.unwrap();
        other_ids.push(company.id);
    }

    let rows = stats::user_company_with_max_emp(&db).await.unwrap();
    let picked: Vec<(i32, i32, i64)> = rows.iter().map(|r| (r.creator_id, r.id, r.emp_count)).collect();
    assert_eq!(
        picked,
        vec![(fixture.creator.id, fixture.company.id, 3), (other.id, other_ids[0], 1)]
    );
}

#[tokio::test]
async fn test_avg_employees_if_any() {
    let db = test_db().await;
    assert_eq!(stats::avg_employees_if_any(&db).await.unwrap(), None);

    seed_fixture(&db).await;
    assert_eq!(stats::avg_employees_if_any(&db).await.unwrap(), Some(1.0));
}

#[tokio::test]
async fn test_stats_on_empty_store() {
    let db = test_db().await;

    assert!(stats::recently_founded(&db, 10).await.unwrap().is_empty());
    assert!(stats::quarter_wise(&db, 5).await.unwrap().is_empty());
    assert_eq!(stats::most_companies_created_by_user(&db).await.unwrap(), None);
    assert!(stats::user_company_with_max_emp(&db).await.unwrap().is_empty());
    assert!(stats::country_avg_deal_amt(&db).await.unwrap().is_empty());
}
