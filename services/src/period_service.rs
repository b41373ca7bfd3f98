//! Selection-period lifecycle.
//!
//! All status changes flow through the transition table on
//! `selection_period::Status`; the service only adds authorization, the
//! precondition checks the table cannot express, and the audit record that
//! shares each transition's transaction. Rejected attempts are audited as
//! well, on a standalone insert once the business transaction is gone.

use crate::audit_service::AuditService;
use crate::auth::Principal;
use crate::error::{SelectionError, SelectionResult};
use chrono::{NaiveDate, Utc};
use db::models::audit_event::AuditAction;
use db::models::selection_period::{self, PeriodAction, Status};
use db::models::{assignment, period_route, preference, route};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};

/// Parameters for creating a selection period.
#[derive(Debug, Clone)]
pub struct CreatePeriod {
    pub name: String,
    pub description: Option<String>,
    pub terminal_id: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub required_selections: i32,
    pub route_ids: Vec<i64>,
}

/// Editable fields; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdatePeriod {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub route_ids: Option<Vec<i64>>,
}

pub struct PeriodService;

impl PeriodService {
    pub async fn create(
        db: &DatabaseConnection,
        principal: &Principal,
        params: CreatePeriod,
    ) -> SelectionResult<selection_period::Model> {
        let result = Self::create_txn(db, principal, params).await;
        if let Err(err) = &result {
            AuditService::record_rejection(
                db,
                principal.user_id,
                AuditAction::PeriodRejected,
                "period:new",
                err,
            )
            .await;
        }
        result
    }

    async fn create_txn(
        db: &DatabaseConnection,
        principal: &Principal,
        params: CreatePeriod,
    ) -> SelectionResult<selection_period::Model> {
        principal.require_manager()?;

        if params.end_date < params.start_date {
            return Err(SelectionError::ValidationFailed(
                "end date precedes start date".to_string(),
            ));
        }
        if params.route_ids.is_empty() {
            return Err(SelectionError::ValidationFailed(
                "run catalog must not be empty".to_string(),
            ));
        }
        if !(1..=3).contains(&params.required_selections) {
            return Err(SelectionError::ValidationFailed(
                "required selections must be between 1 and 3".to_string(),
            ));
        }

        let txn = db.begin().await?;

        let known = route::Entity::find()
            .filter(route::Column::Id.is_in(params.route_ids.clone()))
            .count(&txn)
            .await?;
        if known != params.route_ids.len() as u64 {
            return Err(SelectionError::NotFound("route"));
        }

        let active = selection_period::ActiveModel {
            name: Set(params.name),
            description: Set(params.description),
            terminal_id: Set(params.terminal_id),
            start_date: Set(params.start_date),
            end_date: Set(params.end_date),
            status: Set(Status::Upcoming),
            required_selections: Set(params.required_selections),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        let period = active.insert(&txn).await?;

        for route_id in &params.route_ids {
            period_route::Model::add(&txn, period.id, *route_id).await?;
        }

        AuditService::record(
            &txn,
            principal.user_id,
            AuditAction::PeriodCreated,
            &format!("period:{}", period.id),
            &serde_json::json!({ "name": period.name, "routes": params.route_ids }).to_string(),
        )
        .await?;

        txn.commit().await?;

        tracing::info!(period_id = period.id, "selection period created");
        Ok(period)
    }

    pub async fn open(
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
    ) -> SelectionResult<selection_period::Model> {
        Self::transition(db, principal, period_id, PeriodAction::Open, AuditAction::PeriodOpened)
            .await
    }

    pub async fn close(
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
    ) -> SelectionResult<selection_period::Model> {
        Self::transition(db, principal, period_id, PeriodAction::Close, AuditAction::PeriodClosed)
            .await
    }

    async fn transition(
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
        action: PeriodAction,
        audit_action: AuditAction,
    ) -> SelectionResult<selection_period::Model> {
        let result = Self::transition_txn(db, principal, period_id, action, audit_action).await;
        if let Err(err) = &result {
            AuditService::record_rejection(
                db,
                principal.user_id,
                AuditAction::PeriodRejected,
                &format!("period:{}", period_id),
                err,
            )
            .await;
        }
        result
    }

    async fn transition_txn(
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
        action: PeriodAction,
        audit_action: AuditAction,
    ) -> SelectionResult<selection_period::Model> {
        principal.require_manager()?;

        let txn = db.begin().await?;

        let period = selection_period::Entity::find_by_id(period_id)
            .one(&txn)
            .await?
            .ok_or(SelectionError::NotFound("selection period"))?;

        let next = period
            .status
            .next(action)
            .ok_or(SelectionError::InvalidTransition {
                from: period.status,
                action,
            })?;

        let updated = period.set_status(&txn, next).await?;

        AuditService::record(
            &txn,
            principal.user_id,
            audit_action,
            &format!("period:{}", period_id),
            &serde_json::json!({ "status": next.to_string() }).to_string(),
        )
        .await?;

        txn.commit().await?;

        tracing::info!(period_id, status = %next, "selection period transitioned");
        Ok(updated)
    }

    pub async fn edit(
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
        params: UpdatePeriod,
    ) -> SelectionResult<selection_period::Model> {
        let result = Self::edit_txn(db, principal, period_id, params).await;
        if let Err(err) = &result {
            AuditService::record_rejection(
                db,
                principal.user_id,
                AuditAction::PeriodRejected,
                &format!("period:{}", period_id),
                err,
            )
            .await;
        }
        result
    }

    async fn edit_txn(
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
        params: UpdatePeriod,
    ) -> SelectionResult<selection_period::Model> {
        principal.require_manager()?;

        let txn = db.begin().await?;

        let period = selection_period::Entity::find_by_id(period_id)
            .one(&txn)
            .await?
            .ok_or(SelectionError::NotFound("selection period"))?;

        period
            .status
            .next(PeriodAction::Edit)
            .ok_or(SelectionError::InvalidTransition {
                from: period.status,
                action: PeriodAction::Edit,
            })?;

        if let Some(route_ids) = &params.route_ids {
            // The catalog is only adjustable before drivers can see it.
            if period.status != Status::Upcoming {
                return Err(SelectionError::ValidationFailed(
                    "run catalog can only change while the period is upcoming".to_string(),
                ));
            }
            if route_ids.is_empty() {
                return Err(SelectionError::ValidationFailed(
                    "run catalog must not be empty".to_string(),
                ));
            }
            let known = route::Entity::find()
                .filter(route::Column::Id.is_in(route_ids.clone()))
                .count(&txn)
                .await?;
            if known != route_ids.len() as u64 {
                return Err(SelectionError::NotFound("route"));
            }
            period_route::Model::replace_catalog(&txn, period_id, route_ids).await?;
        }

        let mut active: selection_period::ActiveModel = period.into();
        if let Some(name) = params.name {
            active.name = Set(name);
        }
        if let Some(description) = params.description {
            active.description = Set(description);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        AuditService::record(
            &txn,
            principal.user_id,
            AuditAction::PeriodUpdated,
            &format!("period:{}", period_id),
            &serde_json::json!({ "name": updated.name }).to_string(),
        )
        .await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Deletes a period that has produced nothing a record depends on:
    /// UPCOMING, or CLOSED with no assignments.
    pub async fn delete(
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
    ) -> SelectionResult<()> {
        let result = Self::delete_txn(db, principal, period_id).await;
        if let Err(err) = &result {
            AuditService::record_rejection(
                db,
                principal.user_id,
                AuditAction::PeriodRejected,
                &format!("period:{}", period_id),
                err,
            )
            .await;
        }
        result
    }

    async fn delete_txn(
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
    ) -> SelectionResult<()> {
        principal.require_admin()?;

        let txn = db.begin().await?;

        let period = selection_period::Entity::find_by_id(period_id)
            .one(&txn)
            .await?
            .ok_or(SelectionError::NotFound("selection period"))?;

        period
            .status
            .next(PeriodAction::Delete)
            .ok_or(SelectionError::InvalidTransition {
                from: period.status,
                action: PeriodAction::Delete,
            })?;

        let assignments = assignment::Model::count_for_period(&txn, period_id).await?;
        if assignments > 0 {
            return Err(SelectionError::InvalidTransition {
                from: period.status,
                action: PeriodAction::Delete,
            });
        }

        preference::Entity::delete_many()
            .filter(preference::Column::PeriodId.eq(period_id))
            .exec(&txn)
            .await?;
        period_route::Entity::delete_many()
            .filter(period_route::Column::PeriodId.eq(period_id))
            .exec(&txn)
            .await?;

        let name = period.name.clone();
        period.delete(&txn).await?;

        AuditService::record(
            &txn,
            principal.user_id,
            AuditAction::PeriodDeleted,
            &format!("period:{}", period_id),
            &serde_json::json!({ "name": name }).to_string(),
        )
        .await?;

        txn.commit().await?;

        tracing::info!(period_id, "selection period deleted");
        Ok(())
    }

    /// The period's active run catalog.
    pub async fn catalog(
        db: &DatabaseConnection,
        period_id: i64,
    ) -> SelectionResult<Vec<route::Model>> {
        Ok(period_route::Model::catalog_routes(db, period_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        admin, close_period, driver, fixture_with_period, manager, new_route, open_period,
    };
    use db::models::audit_event::Model as AuditEvent;

    #[tokio::test]
    async fn test_create_validations() {
        let fx = fixture_with_period(1).await;

        let base = CreatePeriod {
            name: "Fall Bid".to_string(),
            description: None,
            terminal_id: None,
            start_date: chrono::NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            end_date: chrono::NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
            required_selections: 1,
            route_ids: fx.routes.iter().map(|r| r.id).collect(),
        };

        let mut inverted = base.clone();
        inverted.end_date = chrono::NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        assert!(matches!(
            PeriodService::create(&fx.db, &admin(), inverted).await,
            Err(SelectionError::ValidationFailed(_))
        ));

        let mut empty = base.clone();
        empty.route_ids.clear();
        assert!(matches!(
            PeriodService::create(&fx.db, &admin(), empty).await,
            Err(SelectionError::ValidationFailed(_))
        ));

        let mut phantom = base.clone();
        phantom.route_ids.push(999_999);
        assert!(matches!(
            PeriodService::create(&fx.db, &admin(), phantom).await,
            Err(SelectionError::NotFound("route"))
        ));

        // Each rejected attempt left its mark on the audit trail.
        let events = AuditEvent::recent(&fx.db, 20, None).await.unwrap();
        assert_eq!(
            events
                .iter()
                .filter(|e| e.action == AuditAction::PeriodRejected)
                .count(),
            3
        );

        let created = PeriodService::create(&fx.db, &manager(), base).await.unwrap();
        assert_eq!(created.status, Status::Upcoming);
    }

    #[tokio::test]
    async fn test_open_close_lifecycle_with_audit() {
        let fx = fixture_with_period(1).await;

        let opened = PeriodService::open(&fx.db, &manager(), fx.period.id)
            .await
            .unwrap();
        assert_eq!(opened.status, Status::Open);

        let closed = PeriodService::close(&fx.db, &manager(), fx.period.id)
            .await
            .unwrap();
        assert_eq!(closed.status, Status::Closed);

        let events = AuditEvent::recent(&fx.db, 10, None).await.unwrap();
        let actions: Vec<_> = events.iter().map(|e| e.action).collect();
        assert!(actions.contains(&AuditAction::PeriodOpened));
        assert!(actions.contains(&AuditAction::PeriodClosed));
    }

    #[tokio::test]
    async fn test_illegal_transition_surfaced() {
        let fx = fixture_with_period(1).await;

        // Closing an upcoming period skips a state.
        let err = PeriodService::close(&fx.db, &admin(), fx.period.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SelectionError::InvalidTransition {
                from: Status::Upcoming,
                action: PeriodAction::Close,
            }
        ));

        // Reopening an open period is just as illegal.
        open_period(&fx).await;
        let err = PeriodService::open(&fx.db, &admin(), fx.period.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::InvalidTransition { .. }));

        // Both rejections are on the audit trail.
        let events = AuditEvent::recent(&fx.db, 20, None).await.unwrap();
        assert_eq!(
            events
                .iter()
                .filter(|e| e.action == AuditAction::PeriodRejected)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_drivers_cannot_run_the_lifecycle() {
        let fx = fixture_with_period(1).await;
        let who = driver(&fx.employees[0]);

        assert!(matches!(
            PeriodService::open(&fx.db, &who, fx.period.id).await,
            Err(SelectionError::Forbidden)
        ));
        assert!(matches!(
            PeriodService::delete(&fx.db, &manager(), fx.period.id).await,
            Err(SelectionError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_edit_name_any_state_catalog_only_upcoming() {
        let fx = fixture_with_period(1).await;

        let renamed = PeriodService::edit(
            &fx.db,
            &admin(),
            fx.period.id,
            UpdatePeriod {
                name: Some("Renamed Bid".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "Renamed Bid");

        open_period(&fx).await;
        let err = PeriodService::edit(
            &fx.db,
            &admin(),
            fx.period.id,
            UpdatePeriod {
                route_ids: Some(vec![fx.routes[0].id]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SelectionError::ValidationFailed(_)));

        // Name edits stay legal while open.
        PeriodService::edit(
            &fx.db,
            &admin(),
            fx.period.id,
            UpdatePeriod {
                description: Some(Some("bi-annual".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_catalog_replacement_while_upcoming() {
        let fx = fixture_with_period(1).await;

        let extra = db::models::route::Model::create(&fx.db, new_route("201"))
            .await
            .unwrap();

        PeriodService::edit(
            &fx.db,
            &admin(),
            fx.period.id,
            UpdatePeriod {
                route_ids: Some(vec![extra.id]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let catalog = PeriodService::catalog(&fx.db, fx.period.id).await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].id, extra.id);
    }

    #[tokio::test]
    async fn test_delete_upcoming_period() {
        let fx = fixture_with_period(1).await;

        PeriodService::delete(&fx.db, &admin(), fx.period.id)
            .await
            .unwrap();

        let gone = db::models::selection_period::Entity::find_by_id(fx.period.id)
            .one(&fx.db)
            .await
            .unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_delete_rejected_while_open() {
        let fx = fixture_with_period(1).await;
        open_period(&fx).await;

        let err = PeriodService::delete(&fx.db, &admin(), fx.period.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_delete_rejected_once_assignments_exist() {
        let fx = fixture_with_period(1).await;
        open_period(&fx).await;
        close_period(&fx).await;

        crate::assignment_engine::AssignmentEngine::commit(&fx.db, &admin(), fx.period.id)
            .await
            .unwrap();

        let err = PeriodService::delete(&fx.db, &admin(), fx.period.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::InvalidTransition { .. }));
    }
}
