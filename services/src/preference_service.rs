//! Preference submission and lookup.
//!
//! Writes are serialized per (employee, period) by the row-level upsert and
//! validated against the period status re-read inside the same transaction:
//! a submission that commits implies the period was OPEN at the commit
//! instant, which is the whole defense against the submit-while-closing race.

use crate::audit_service::AuditService;
use crate::auth::Principal;
use crate::error::{retry_once, SelectionError, SelectionResult};
use chrono::Utc;
use db::models::audit_event::AuditAction;
use db::models::preference::{self, Model as Preference, MAX_CHOICES};
use db::models::selection_period::{self, Status};
use db::models::{employee, period_route};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use std::collections::HashSet;

pub struct PreferenceService;

impl PreferenceService {
    /// Records (or replaces) a driver's ranked choices for a period and
    /// returns the confirmation number. Replacement reissues the number and
    /// writes a fresh audit event.
    pub async fn upsert(
        db: &DatabaseConnection,
        principal: &Principal,
        employee_id: i64,
        period_id: i64,
        choices: &[i64],
    ) -> SelectionResult<String> {
        let result =
            retry_once(|| Self::upsert_txn(db, principal, employee_id, period_id, choices)).await;

        if let Err(err) = &result {
            // The business transaction rolled back; the rejection record is
            // written on its own.
            AuditService::record_rejection(
                db,
                principal.user_id,
                AuditAction::PreferenceRejected,
                &format!("preference:{}:{}", employee_id, period_id),
                err,
            )
            .await;
        }

        result
    }

    async fn upsert_txn(
        db: &DatabaseConnection,
        principal: &Principal,
        employee_id: i64,
        period_id: i64,
        choices: &[i64],
    ) -> SelectionResult<String> {
        principal.require_employee_self(employee_id)?;

        let txn = db.begin().await?;

        let period = selection_period::Entity::find_by_id(period_id)
            .one(&txn)
            .await?
            .ok_or(SelectionError::NotFound("selection period"))?;

        if period.status != Status::Open {
            return Err(SelectionError::PeriodNotOpen);
        }

        employee::Entity::find_by_id(employee_id)
            .one(&txn)
            .await?
            .ok_or(SelectionError::NotFound("employee"))?;

        Self::validate_choices(&txn, &period, choices).await?;

        let confirmation_number = Preference::generate_confirmation_number();
        let (first, second, third) = Preference::slots(choices);

        let existing = Preference::find_by_employee_and_period(&txn, employee_id, period_id).await?;
        match existing {
            Some(model) => {
                let mut active: preference::ActiveModel = model.into();
                active.first_choice_id = Set(first);
                active.second_choice_id = Set(second);
                active.third_choice_id = Set(third);
                active.confirmation_number = Set(confirmation_number.clone());
                active.submitted_at = Set(Utc::now());
                active.update(&txn).await?;
            }
            None => {
                let active = preference::ActiveModel {
                    employee_id: Set(employee_id),
                    period_id: Set(period_id),
                    first_choice_id: Set(first),
                    second_choice_id: Set(second),
                    third_choice_id: Set(third),
                    confirmation_number: Set(confirmation_number.clone()),
                    submitted_at: Set(Utc::now()),
                    ..Default::default()
                };
                active.insert(&txn).await?;
            }
        }

        let details = serde_json::json!({
            "confirmation_number": confirmation_number,
            "choices": choices,
        });
        AuditService::record(
            &txn,
            principal.user_id,
            AuditAction::PreferenceSubmitted,
            &format!("preference:{}:{}", employee_id, period_id),
            &details.to_string(),
        )
        .await?;

        txn.commit().await?;

        tracing::info!(
            employee_id,
            period_id,
            %confirmation_number,
            "preference recorded"
        );

        Ok(confirmation_number)
    }

    async fn validate_choices<C: sea_orm::ConnectionTrait>(
        conn: &C,
        period: &selection_period::Model,
        choices: &[i64],
    ) -> SelectionResult<()> {
        if choices.len() > MAX_CHOICES {
            return Err(SelectionError::ValidationFailed(format!(
                "at most {} ranked choices accepted, got {}",
                MAX_CHOICES,
                choices.len()
            )));
        }

        // An empty submission always falls short: required_selections >= 1.
        if (choices.len() as i32) < period.required_selections {
            return Err(SelectionError::UnmetRequiredCount {
                required: period.required_selections,
            });
        }

        let mut seen = HashSet::new();
        for choice in choices {
            if !seen.insert(*choice) {
                return Err(SelectionError::DuplicateChoice);
            }
        }

        let catalog: HashSet<i64> = period_route::Model::catalog_ids(conn, period.id)
            .await?
            .into_iter()
            .collect();
        for choice in choices {
            if !catalog.contains(choice) {
                return Err(SelectionError::RouteNotInCatalog);
            }
        }

        Ok(())
    }

    pub async fn get(
        db: &DatabaseConnection,
        principal: &Principal,
        employee_id: i64,
        period_id: i64,
    ) -> SelectionResult<Option<Preference>> {
        principal.require_employee_read(employee_id)?;
        Ok(Preference::find_by_employee_and_period(db, employee_id, period_id).await?)
    }

    pub async fn list(
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
    ) -> SelectionResult<Vec<Preference>> {
        principal.require_manager()?;
        Ok(Preference::list_for_period(db, period_id).await?)
    }
}
