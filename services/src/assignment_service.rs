//! Manual assignment and assignment read paths.
//!
//! Manual awards exist for the odd correction an administrator makes while
//! a period sits CLOSED. They are provisional: engine commit replaces every
//! assignment row for the period, manual ones included.

use crate::audit_service::AuditService;
use crate::auth::Principal;
use crate::error::{SelectionError, SelectionResult};
use crate::qualification::qualifies;
use chrono::Utc;
use db::models::audit_event::AuditAction;
use db::models::selection_period::{self, Status};
use db::models::{assignment, employee, period_route, route};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};

pub struct AssignmentService;

impl AssignmentService {
    /// Awards a specific run to a specific driver, outside the engine.
    /// Admin only; the period must be CLOSED.
    pub async fn manual_assign(
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
        employee_id: i64,
        route_id: i64,
    ) -> SelectionResult<assignment::Model> {
        let result =
            Self::manual_assign_txn(db, principal, period_id, employee_id, route_id).await;

        if let Err(err) = &result {
            AuditService::record_rejection(
                db,
                principal.user_id,
                AuditAction::AssignmentRejected,
                &format!("assignment:{}:{}", employee_id, period_id),
                err,
            )
            .await;
        }

        result
    }

    async fn manual_assign_txn(
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
        employee_id: i64,
        route_id: i64,
    ) -> SelectionResult<assignment::Model> {
        principal.require_admin()?;

        let txn = db.begin().await?;

        let period = selection_period::Entity::find_by_id(period_id)
            .one(&txn)
            .await?
            .ok_or(SelectionError::NotFound("selection period"))?;

        if period.status != Status::Closed {
            return Err(SelectionError::ValidationFailed(
                "manual assignments are only possible while the period is closed".to_string(),
            ));
        }

        let employee = employee::Entity::find_by_id(employee_id)
            .one(&txn)
            .await?
            .ok_or(SelectionError::NotFound("employee"))?;

        let route = route::Entity::find_by_id(route_id)
            .one(&txn)
            .await?
            .ok_or(SelectionError::NotFound("route"))?;

        let catalog = period_route::Model::catalog_ids(&txn, period_id).await?;
        if !catalog.contains(&route_id) {
            return Err(SelectionError::RouteNotInCatalog);
        }

        if !qualifies(&employee, &route) {
            return Err(SelectionError::QualificationViolation);
        }

        if let Some(taken) =
            assignment::Model::find_by_route_and_period(&txn, route_id, period_id).await?
        {
            if taken.employee_id != employee_id {
                return Err(SelectionError::RouteAlreadyAssigned);
            }
        }

        let existing =
            assignment::Model::find_by_employee_and_period(&txn, employee_id, period_id).await?;
        let saved = match existing {
            Some(model) => {
                let mut active: assignment::ActiveModel = model.into();
                active.route_id = Set(Some(route_id));
                active.choice_received = Set(None);
                active.update(&txn).await?
            }
            None => {
                let active = assignment::ActiveModel {
                    employee_id: Set(employee_id),
                    period_id: Set(period_id),
                    route_id: Set(Some(route_id)),
                    choice_received: Set(None),
                    effective_date: Set(period.start_date),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                };
                active.insert(&txn).await?
            }
        };

        AuditService::record(
            &txn,
            principal.user_id,
            AuditAction::AssignmentManual,
            &format!("assignment:{}:{}", employee_id, period_id),
            &serde_json::json!({ "route_id": route_id }).to_string(),
        )
        .await?;

        txn.commit().await?;

        tracing::info!(period_id, employee_id, route_id, "manual assignment recorded");
        Ok(saved)
    }

    /// A driver's own result. Absence is the normal answer between close
    /// and processing, so it is `Ok(None)`, never an error.
    pub async fn get_for_employee(
        db: &DatabaseConnection,
        principal: &Principal,
        employee_id: i64,
        period_id: i64,
    ) -> SelectionResult<Option<assignment::Model>> {
        principal.require_employee_read(employee_id)?;
        Ok(assignment::Model::find_by_employee_and_period(db, employee_id, period_id).await?)
    }

    pub async fn list(
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
    ) -> SelectionResult<Vec<assignment::Model>> {
        principal.require_manager()?;
        Ok(assignment::Model::list_for_period(db, period_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment_engine::AssignmentEngine;
    use crate::test_support::{
        admin, close_period, driver, fixture_with_period, make_employee, open_period,
    };

    #[tokio::test]
    async fn test_manual_assign_and_engine_replacement() {
        let fx = fixture_with_period(1).await;
        open_period(&fx).await;
        close_period(&fx).await;

        let manual = AssignmentService::manual_assign(
            &fx.db,
            &admin(),
            fx.period.id,
            fx.employees[1].id,
            fx.routes[2].id,
        )
        .await
        .unwrap();
        assert_eq!(manual.route_id, Some(fx.routes[2].id));
        assert_eq!(manual.choice_received, None);

        // Engine commit wipes the provisional award and re-dispatches.
        AssignmentEngine::commit(&fx.db, &admin(), fx.period.id)
            .await
            .unwrap();

        let row = assignment::Model::find_by_employee_and_period(
            &fx.db,
            fx.employees[1].id,
            fx.period.id,
        )
        .await
        .unwrap()
        .unwrap();
        // No preference was submitted, so the engine floats the driver.
        assert!(row.is_float_pool());
    }

    #[tokio::test]
    async fn test_manual_assign_checks_qualifications() {
        let db = db::test_utils::setup_test_db().await;

        let mut params = crate::test_support::new_route("701");
        params.requires_chain_experience = true;
        let route = route::Model::create(&db, params).await.unwrap();

        let rookie = make_employee(&db, "E5", "Stone", 2020, false, false).await;

        let period = crate::period_service::PeriodService::create(
            &db,
            &admin(),
            crate::period_service::CreatePeriod {
                name: "Mountain Bid".to_string(),
                description: None,
                terminal_id: None,
                start_date: chrono::NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
                end_date: chrono::NaiveDate::from_ymd_opt(2026, 11, 14).unwrap(),
                required_selections: 1,
                route_ids: vec![route.id],
            },
        )
        .await
        .unwrap();
        crate::period_service::PeriodService::open(&db, &admin(), period.id)
            .await
            .unwrap();
        crate::period_service::PeriodService::close(&db, &admin(), period.id)
            .await
            .unwrap();

        let err =
            AssignmentService::manual_assign(&db, &admin(), period.id, rookie.id, route.id)
                .await
                .unwrap_err();
        assert!(matches!(err, SelectionError::QualificationViolation));
    }

    #[tokio::test]
    async fn test_manual_assign_rejects_taken_route() {
        let fx = fixture_with_period(1).await;
        open_period(&fx).await;
        close_period(&fx).await;

        AssignmentService::manual_assign(
            &fx.db,
            &admin(),
            fx.period.id,
            fx.employees[0].id,
            fx.routes[0].id,
        )
        .await
        .unwrap();

        let err = AssignmentService::manual_assign(
            &fx.db,
            &admin(),
            fx.period.id,
            fx.employees[1].id,
            fx.routes[0].id,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SelectionError::RouteAlreadyAssigned));
    }

    #[tokio::test]
    async fn test_manual_assign_requires_closed_period() {
        let fx = fixture_with_period(1).await;
        open_period(&fx).await;

        let err = AssignmentService::manual_assign(
            &fx.db,
            &admin(),
            fx.period.id,
            fx.employees[0].id,
            fx.routes[0].id,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SelectionError::ValidationFailed(_)));

        // The rejection itself is audited.
        let events = db::models::audit_event::Model::recent(&fx.db, 10, None)
            .await
            .unwrap();
        assert!(events
            .iter()
            .any(|e| e.action == AuditAction::AssignmentRejected));
    }

    #[tokio::test]
    async fn test_driver_reads_own_assignment_absence_as_none() {
        let fx = fixture_with_period(1).await;
        open_period(&fx).await;
        close_period(&fx).await;

        let who = driver(&fx.employees[0]);
        let nothing = AssignmentService::get_for_employee(
            &fx.db,
            &who,
            fx.employees[0].id,
            fx.period.id,
        )
        .await
        .unwrap();
        assert!(nothing.is_none());

        // Reading someone else's result stays forbidden.
        let err = AssignmentService::get_for_employee(
            &fx.db,
            &who,
            fx.employees[1].id,
            fx.period.id,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SelectionError::Forbidden));
    }
}
