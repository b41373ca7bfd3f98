//! The seniority-greedy assignment engine.
//!
//! Given a CLOSED period, walks the eligible drivers in strict seniority
//! order and awards each their highest-ranked run that is still unclaimed
//! and within their qualifications; everyone else lands in the float pool.
//! A senior driver can never lose a run to a junior one.
//!
//! `preview` computes the outcome without touching storage; `commit`
//! persists it and completes the period in a single transaction.

use crate::audit_service::AuditService;
use crate::auth::Principal;
use crate::error::{retry_once, SelectionError, SelectionResult};
use crate::qualification::qualifies;
use chrono::Utc;
use db::models::audit_event::AuditAction;
use db::models::selection_period::{self, PeriodAction, Status};
use db::models::{assignment, employee, period_route, preference, route};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One row of engine output, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposedAssignment {
    pub employee_id: i64,
    pub route_id: Option<i64>,
    pub choice_received: Option<i32>,
}

/// Outcome counts shown to administrators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentSummary {
    pub first_choice: usize,
    pub second_choice: usize,
    pub third_choice: usize,
    pub manual: usize,
    pub float_pool: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnginePreview {
    pub proposed: Vec<ProposedAssignment>,
    pub summary: AssignmentSummary,
}

pub struct AssignmentEngine;

impl AssignmentEngine {
    /// Total seniority order: hire date, then last name, then employee
    /// number. Hire-date ties are common in real rosters; without the
    /// tiebreak the outcome would depend on storage order.
    fn seniority_order(employees: &mut [employee::Model]) {
        employees.sort_by(|a, b| {
            a.hire_date
                .cmp(&b.hire_date)
                .then_with(|| a.last_name.cmp(&b.last_name))
                .then_with(|| a.employee_number.cmp(&b.employee_number))
        });
    }

    /// The greedy dispatch over pre-sorted employees. Pure; O(|E| * 3).
    pub fn allocate(
        employees: &[employee::Model],
        routes: &[route::Model],
        preferences: &HashMap<i64, preference::Model>,
    ) -> Vec<ProposedAssignment> {
        let route_index: HashMap<i64, &route::Model> =
            routes.iter().map(|r| (r.id, r)).collect();
        let mut remaining: HashSet<i64> = routes.iter().map(|r| r.id).collect();

        let mut proposed = Vec::with_capacity(employees.len());
        for employee in employees {
            let mut award = None;

            if let Some(preference) = preferences.get(&employee.id) {
                for (rank, choice) in preference.choices().into_iter().enumerate() {
                    if !remaining.contains(&choice) {
                        continue;
                    }
                    // A stale qualification is a skip, not an error: flags may
                    // have changed between submission and processing.
                    match route_index.get(&choice) {
                        Some(route) if qualifies(employee, route) => {
                            award = Some((choice, (rank + 1) as i32));
                            break;
                        }
                        _ => {}
                    }
                }
            }

            match award {
                Some((route_id, rank)) => {
                    remaining.remove(&route_id);
                    proposed.push(ProposedAssignment {
                        employee_id: employee.id,
                        route_id: Some(route_id),
                        choice_received: Some(rank),
                    });
                }
                None => proposed.push(ProposedAssignment {
                    employee_id: employee.id,
                    route_id: None,
                    choice_received: None,
                }),
            }
        }

        proposed
    }

    pub fn summarize(proposed: &[ProposedAssignment]) -> AssignmentSummary {
        let mut summary = AssignmentSummary::default();
        for row in proposed {
            match (row.route_id, row.choice_received) {
                (Some(_), Some(1)) => summary.first_choice += 1,
                (Some(_), Some(2)) => summary.second_choice += 1,
                (Some(_), Some(3)) => summary.third_choice += 1,
                (Some(_), _) => summary.manual += 1,
                (None, _) => summary.float_pool += 1,
            }
        }
        summary
    }

    async fn load_inputs<C: ConnectionTrait>(
        conn: &C,
        period: &selection_period::Model,
    ) -> Result<
        (
            Vec<employee::Model>,
            Vec<route::Model>,
            HashMap<i64, preference::Model>,
        ),
        sea_orm::DbErr,
    > {
        let mut employees =
            employee::Model::eligible_for_terminal(conn, period.terminal_id).await?;
        Self::seniority_order(&mut employees);

        let routes = period_route::Model::catalog_routes(conn, period.id).await?;

        let preferences = preference::Model::list_for_period(conn, period.id)
            .await?
            .into_iter()
            .map(|p| (p.employee_id, p))
            .collect();

        Ok((employees, routes, preferences))
    }

    /// Read-only run of the engine. Nothing is persisted and the period
    /// stays CLOSED.
    pub async fn preview(
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
    ) -> SelectionResult<EnginePreview> {
        principal.require_manager()?;

        let period = selection_period::Entity::find_by_id(period_id)
            .one(db)
            .await?
            .ok_or(SelectionError::NotFound("selection period"))?;

        if period.status != Status::Closed {
            return Err(SelectionError::InvalidTransition {
                from: period.status,
                action: PeriodAction::Process,
            });
        }

        let (employees, routes, preferences) = Self::load_inputs(db, &period).await?;
        let proposed = Self::allocate(&employees, &routes, &preferences);
        let summary = Self::summarize(&proposed);

        Ok(EnginePreview { proposed, summary })
    }

    /// Runs the engine and persists the result: CLOSED -> PROCESSING ->
    /// COMPLETED inside one transaction, with full rollback to CLOSED when
    /// validation rejects the proposed set.
    pub async fn commit(
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
    ) -> SelectionResult<AssignmentSummary> {
        let result = retry_once(|| Self::commit_txn(db, principal, period_id)).await;

        match &result {
            Err(err @ SelectionError::ValidationFailed(reason)) => {
                tracing::error!(period_id, %reason, "assignment commit aborted");
                AuditService::record_rejection(
                    db,
                    principal.user_id,
                    AuditAction::PeriodAborted,
                    &format!("period:{}", period_id),
                    err,
                )
                .await;
            }
            Err(err) => {
                AuditService::record_rejection(
                    db,
                    principal.user_id,
                    AuditAction::PeriodRejected,
                    &format!("period:{}", period_id),
                    err,
                )
                .await;
            }
            Ok(_) => {}
        }

        result
    }

    async fn commit_txn(
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
    ) -> SelectionResult<AssignmentSummary> {
        principal.require_admin()?;

        let txn = db.begin().await?;

        let period = selection_period::Entity::find_by_id(period_id)
            .one(&txn)
            .await?
            .ok_or(SelectionError::NotFound("selection period"))?;

        let processing = period
            .status
            .next(PeriodAction::Process)
            .ok_or(SelectionError::InvalidTransition {
                from: period.status,
                action: PeriodAction::Process,
            })?;
        let period = period.set_status(&txn, processing).await?;
        AuditService::record(
            &txn,
            principal.user_id,
            AuditAction::PeriodProcessed,
            &format!("period:{}", period_id),
            "{}",
        )
        .await?;

        let (employees, routes, preferences) = Self::load_inputs(&txn, &period).await?;
        let proposed = Self::allocate(&employees, &routes, &preferences);

        // Dropping the transaction on failure reverts the period to CLOSED.
        Self::validate(&proposed, &employees, &routes)
            .map_err(SelectionError::ValidationFailed)?;

        // Manual assignments made while the period was closed are
        // provisional; the engine output replaces them wholesale.
        assignment::Entity::delete_many()
            .filter(assignment::Column::PeriodId.eq(period_id))
            .exec(&txn)
            .await?;

        for row in &proposed {
            let active = assignment::ActiveModel {
                employee_id: Set(row.employee_id),
                period_id: Set(period_id),
                route_id: Set(row.route_id),
                choice_received: Set(row.choice_received),
                effective_date: Set(period.start_date),
                created_at: Set(Utc::now()),
                ..Default::default()
            };
            active.insert(&txn).await?;
        }

        let summary = Self::summarize(&proposed);

        let completed = period
            .status
            .next(PeriodAction::Complete)
            .ok_or(SelectionError::InvalidTransition {
                from: period.status,
                action: PeriodAction::Complete,
            })?;
        period.set_status(&txn, completed).await?;

        AuditService::record(
            &txn,
            principal.user_id,
            AuditAction::PeriodCompleted,
            &format!("period:{}", period_id),
            &serde_json::to_string(&summary).unwrap_or_default(),
        )
        .await?;

        txn.commit().await?;

        tracing::info!(
            period_id,
            assigned = summary.first_choice + summary.second_choice + summary.third_choice,
            float_pool = summary.float_pool,
            "assignments committed"
        );

        Ok(summary)
    }

    /// Re-verifies the proposed set before anything is written: one row per
    /// eligible driver, no run handed out twice, no award outside the
    /// holder's qualifications.
    fn validate(
        proposed: &[ProposedAssignment],
        employees: &[employee::Model],
        routes: &[route::Model],
    ) -> Result<(), String> {
        if proposed.len() != employees.len() {
            return Err(format!(
                "expected {} assignment rows, produced {}",
                employees.len(),
                proposed.len()
            ));
        }

        let mut seen_employees = HashSet::new();
        for row in proposed {
            if !seen_employees.insert(row.employee_id) {
                return Err(format!("employee {} assigned twice", row.employee_id));
            }
        }

        let mut seen_routes = HashSet::new();
        for row in proposed {
            if let Some(route_id) = row.route_id {
                if !seen_routes.insert(route_id) {
                    return Err(format!("run {} awarded twice", route_id));
                }
            }
        }

        let employee_index: HashMap<i64, &employee::Model> =
            employees.iter().map(|e| (e.id, e)).collect();
        let route_index: HashMap<i64, &route::Model> = routes.iter().map(|r| (r.id, r)).collect();

        for row in proposed {
            let Some(route_id) = row.route_id else {
                continue;
            };
            let employee = employee_index
                .get(&row.employee_id)
                .ok_or_else(|| format!("unknown employee {}", row.employee_id))?;
            let route = route_index
                .get(&route_id)
                .ok_or_else(|| format!("run {} outside the catalog", route_id))?;
            if !qualifies(employee, route) {
                return Err(format!(
                    "employee {} does not qualify for run {}",
                    row.employee_id, route_id
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::period_service::{CreatePeriod, PeriodService};
    use crate::preference_service::PreferenceService;
    use crate::test_support::{
        admin, close_period, driver, fixture_with_period, make_employee, manager, new_route,
        open_period, Fixture,
    };
    use chrono::NaiveDate;
    use db::models::route::Model as Route;
    use db::test_utils::setup_test_db;

    async fn submit(fx: &Fixture, employee: &employee::Model, choices: &[i64]) {
        PreferenceService::upsert(&fx.db, &driver(employee), employee.id, fx.period.id, choices)
            .await
            .expect("failed to submit preference");
    }

    fn find_row(proposed: &[ProposedAssignment], employee_id: i64) -> &ProposedAssignment {
        proposed
            .iter()
            .find(|p| p.employee_id == employee_id)
            .expect("missing assignment row")
    }

    async fn committed_rows(fx: &Fixture) -> Vec<assignment::Model> {
        assignment::Model::list_for_period(&fx.db, fx.period.id)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_strict_seniority_dispatch() {
        let fx = fixture_with_period(1).await;
        open_period(&fx).await;

        let senior = &fx.employees[0];
        let junior = &fx.employees[1];
        let wanted = [fx.routes[0].id, fx.routes[1].id];
        submit(&fx, senior, &wanted).await;
        submit(&fx, junior, &wanted).await;

        close_period(&fx).await;
        let summary = AssignmentEngine::commit(&fx.db, &admin(), fx.period.id)
            .await
            .unwrap();
        assert_eq!(summary.first_choice, 1);
        assert_eq!(summary.second_choice, 1);
        assert_eq!(summary.float_pool, 0);

        let rows = committed_rows(&fx).await;
        let senior_row = rows.iter().find(|r| r.employee_id == senior.id).unwrap();
        assert_eq!(senior_row.route_id, Some(fx.routes[0].id));
        assert_eq!(senior_row.choice_received, Some(1));

        let junior_row = rows.iter().find(|r| r.employee_id == junior.id).unwrap();
        assert_eq!(junior_row.route_id, Some(fx.routes[1].id));
        assert_eq!(junior_row.choice_received, Some(2));
    }

    #[tokio::test]
    async fn test_unqualified_choice_skipped_not_errored() {
        let db = setup_test_db().await;

        let mut doubles = new_route("501");
        doubles.route_type = db::models::route::RouteType::Doubles;
        doubles.requires_doubles_endorsement = true;
        let doubles = Route::create(&db, doubles).await.unwrap();
        let singles = Route::create(&db, new_route("502")).await.unwrap();

        // Senior lacks the endorsement; junior holds it.
        let senior = make_employee(&db, "E1", "Abbott", 2008, false, false).await;
        let junior = make_employee(&db, "E2", "Young", 2018, true, false).await;

        let period = PeriodService::create(
            &db,
            &admin(),
            CreatePeriod {
                name: "Winter Bid".to_string(),
                description: None,
                terminal_id: None,
                start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2026, 1, 14).unwrap(),
                required_selections: 1,
                route_ids: vec![doubles.id, singles.id],
            },
        )
        .await
        .unwrap();
        PeriodService::open(&db, &admin(), period.id).await.unwrap();

        PreferenceService::upsert(
            &db,
            &driver(&senior),
            senior.id,
            period.id,
            &[doubles.id, singles.id],
        )
        .await
        .unwrap();
        PreferenceService::upsert(&db, &driver(&junior), junior.id, period.id, &[doubles.id])
            .await
            .unwrap();

        PeriodService::close(&db, &admin(), period.id).await.unwrap();
        AssignmentEngine::commit(&db, &admin(), period.id)
            .await
            .unwrap();

        let senior_row = assignment::Model::find_by_employee_and_period(&db, senior.id, period.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(senior_row.route_id, Some(singles.id));
        assert_eq!(senior_row.choice_received, Some(2));

        let junior_row = assignment::Model::find_by_employee_and_period(&db, junior.id, period.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(junior_row.route_id, Some(doubles.id));
        assert_eq!(junior_row.choice_received, Some(1));
    }

    #[tokio::test]
    async fn test_junior_falls_to_float_pool() {
        let fx = fixture_with_period(1).await;
        open_period(&fx).await;

        let only_route = [fx.routes[0].id];
        submit(&fx, &fx.employees[0], &only_route).await;
        submit(&fx, &fx.employees[1], &only_route).await;

        close_period(&fx).await;
        let summary = AssignmentEngine::commit(&fx.db, &admin(), fx.period.id)
            .await
            .unwrap();
        assert_eq!(summary.first_choice, 1);
        assert_eq!(summary.float_pool, 1);

        let junior_row =
            assignment::Model::find_by_employee_and_period(&fx.db, fx.employees[1].id, fx.period.id)
                .await
                .unwrap()
                .unwrap();
        assert!(junior_row.is_float_pool());
        assert_eq!(junior_row.choice_received, None);
    }

    #[tokio::test]
    async fn test_no_preference_means_float_pool() {
        let fx = fixture_with_period(1).await;
        open_period(&fx).await;
        close_period(&fx).await;

        let summary = AssignmentEngine::commit(&fx.db, &admin(), fx.period.id)
            .await
            .unwrap();
        assert_eq!(summary.float_pool, 2);

        let rows = committed_rows(&fx).await;
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.is_float_pool()));
    }

    #[tokio::test]
    async fn test_hire_date_tie_broken_by_last_name() {
        let db = setup_test_db().await;

        let route = Route::create(&db, new_route("601")).await.unwrap();
        // Same hire date; Alvarez beats Zimmer alphabetically.
        let zimmer = make_employee(&db, "E9", "Zimmer", 2014, false, false).await;
        let alvarez = make_employee(&db, "E8", "Alvarez", 2014, false, false).await;

        let period = PeriodService::create(
            &db,
            &admin(),
            CreatePeriod {
                name: "Tie Bid".to_string(),
                description: None,
                terminal_id: None,
                start_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
                required_selections: 1,
                route_ids: vec![route.id],
            },
        )
        .await
        .unwrap();
        PeriodService::open(&db, &admin(), period.id).await.unwrap();

        for employee in [&zimmer, &alvarez] {
            PreferenceService::upsert(&db, &driver(employee), employee.id, period.id, &[route.id])
                .await
                .unwrap();
        }

        PeriodService::close(&db, &admin(), period.id).await.unwrap();
        AssignmentEngine::commit(&db, &admin(), period.id)
            .await
            .unwrap();

        let winner = assignment::Model::find_by_employee_and_period(&db, alvarez.id, period.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(winner.route_id, Some(route.id));

        let loser = assignment::Model::find_by_employee_and_period(&db, zimmer.id, period.id)
            .await
            .unwrap()
            .unwrap();
        assert!(loser.is_float_pool());
    }

    #[tokio::test]
    async fn test_preview_matches_commit_without_mutating() {
        let fx = fixture_with_period(1).await;
        open_period(&fx).await;

        submit(&fx, &fx.employees[0], &[fx.routes[0].id]).await;
        submit(&fx, &fx.employees[1], &[fx.routes[0].id, fx.routes[2].id]).await;

        close_period(&fx).await;

        let preview = AssignmentEngine::preview(&fx.db, &manager(), fx.period.id)
            .await
            .unwrap();

        // Nothing persisted; the period is still closed.
        assert!(committed_rows(&fx).await.is_empty());
        let period = db::models::selection_period::Entity::find_by_id(fx.period.id)
            .one(&fx.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(period.status, Status::Closed);
        let preferences = PreferenceService::list(&fx.db, &admin(), fx.period.id)
            .await
            .unwrap();
        assert_eq!(preferences.len(), 2);

        let summary = AssignmentEngine::commit(&fx.db, &admin(), fx.period.id)
            .await
            .unwrap();
        assert_eq!(preview.summary, summary);

        // The committed rows agree with the previewed ones.
        let rows = committed_rows(&fx).await;
        for row in &rows {
            let previewed = find_row(&preview.proposed, row.employee_id);
            assert_eq!(previewed.route_id, row.route_id);
            assert_eq!(previewed.choice_received, row.choice_received);
        }
    }

    #[tokio::test]
    async fn test_commit_requires_closed_period() {
        let fx = fixture_with_period(1).await;
        open_period(&fx).await;

        let err = AssignmentEngine::commit(&fx.db, &admin(), fx.period.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SelectionError::InvalidTransition {
                from: Status::Open,
                action: PeriodAction::Process,
            }
        ));
    }

    #[tokio::test]
    async fn test_commit_requires_admin() {
        let fx = fixture_with_period(1).await;
        open_period(&fx).await;
        close_period(&fx).await;

        let err = AssignmentEngine::commit(&fx.db, &manager(), fx.period.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::Forbidden));

        let err = AssignmentEngine::preview(
            &fx.db,
            &crate::auth::Principal::new(7, Role::Driver, Some(fx.employees[0].id)),
            fx.period.id,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SelectionError::Forbidden));
    }

    #[tokio::test]
    async fn test_committed_routes_are_pairwise_distinct() {
        let fx = fixture_with_period(1).await;
        open_period(&fx).await;

        // Everyone wants everything, in the same order.
        let all: Vec<i64> = fx.routes.iter().map(|r| r.id).collect();
        submit(&fx, &fx.employees[0], &all).await;
        submit(&fx, &fx.employees[1], &all).await;

        close_period(&fx).await;
        AssignmentEngine::commit(&fx.db, &admin(), fx.period.id)
            .await
            .unwrap();

        let rows = committed_rows(&fx).await;
        let mut awarded: Vec<i64> = rows.iter().filter_map(|r| r.route_id).collect();
        awarded.sort_unstable();
        let before = awarded.len();
        awarded.dedup();
        assert_eq!(before, awarded.len());
    }

    #[test]
    fn test_validate_rejects_duplicate_route() {
        let proposed = vec![
            ProposedAssignment {
                employee_id: 1,
                route_id: Some(9),
                choice_received: Some(1),
            },
            ProposedAssignment {
                employee_id: 2,
                route_id: Some(9),
                choice_received: Some(1),
            },
        ];

        let err = AssignmentEngine::validate(&proposed, &[], &[]).unwrap_err();
        assert!(err.contains("assignment rows"));
    }
}
