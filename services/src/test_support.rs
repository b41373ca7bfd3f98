//! Shared fixtures for service tests.

use crate::auth::{Principal, Role};
use crate::period_service::{CreatePeriod, PeriodService};
use chrono::{NaiveDate, NaiveTime};
use db::models::route::{NewRoute, RateType, RouteType};
use db::models::{employee, route, selection_period};
use db::test_utils::setup_test_db;
use sea_orm::DatabaseConnection;

pub struct Fixture {
    pub db: DatabaseConnection,
    pub period: selection_period::Model,
    pub routes: Vec<route::Model>,
    pub employees: Vec<employee::Model>,
}

pub fn admin() -> Principal {
    Principal::new(1, Role::Admin, None)
}

pub fn manager() -> Principal {
    Principal::new(2, Role::Manager, None)
}

pub fn driver(employee: &employee::Model) -> Principal {
    Principal::new(100 + employee.id, Role::Driver, Some(employee.id))
}

pub fn new_route(run_number: &str) -> NewRoute {
    NewRoute {
        run_number: run_number.to_string(),
        origin: "Portland".to_string(),
        destination: "Seattle".to_string(),
        route_type: RouteType::Singles,
        days: "Mon-Fri".to_string(),
        start_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
        distance: 174.0,
        work_time: 8.5,
        rate_type: RateType::Mileage,
        requires_doubles_endorsement: false,
        requires_chain_experience: false,
        terminal_id: None,
    }
}

pub async fn make_employee(
    db: &DatabaseConnection,
    number: &str,
    last_name: &str,
    hire_year: i32,
    doubles: bool,
    chains: bool,
) -> employee::Model {
    employee::Model::create(
        db,
        number,
        "Test",
        last_name,
        &format!("{}@example.com", number.to_lowercase()),
        NaiveDate::from_ymd_opt(hire_year, 1, 1).unwrap(),
        doubles,
        chains,
        None,
    )
    .await
    .expect("failed to create employee")
}

/// Two unqualified drivers (senior Abbott, junior Young), three unrestricted
/// runs, and an UPCOMING period whose catalog holds all three.
pub async fn fixture_with_period(required_selections: i32) -> Fixture {
    let db = setup_test_db().await;

    let mut routes = Vec::new();
    for run_number in ["101", "102", "103"] {
        routes.push(
            route::Model::create(&db, new_route(run_number))
                .await
                .expect("failed to create route"),
        );
    }

    let employees = vec![
        make_employee(&db, "E100", "Abbott", 2010, false, false).await,
        make_employee(&db, "E200", "Young", 2015, false, false).await,
    ];

    let period = PeriodService::create(
        &db,
        &admin(),
        CreatePeriod {
            name: "Spring Bid".to_string(),
            description: None,
            terminal_id: None,
            start_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 4, 14).unwrap(),
            required_selections,
            route_ids: routes.iter().map(|r| r.id).collect(),
        },
    )
    .await
    .expect("failed to create period");

    Fixture {
        db,
        period,
        routes,
        employees,
    }
}

pub async fn open_period(fx: &Fixture) {
    PeriodService::open(&fx.db, &admin(), fx.period.id)
        .await
        .expect("failed to open period");
}

pub async fn close_period(fx: &Fixture) {
    PeriodService::close(&fx.db, &admin(), fx.period.id)
        .await
        .expect("failed to close period");
}
