//! Notification fan-out.
//!
//! Two flows: "the selection window is open" and "here is your result".
//! Sends run concurrently under a bounded number of permits; one
//! recipient's failure never touches another's send, and every attempt
//! lands on the audit trail. Cancellation lets in-flight sends finish and
//! stops everything still queued.

use crate::audit_service::AuditService;
use crate::auth::Principal;
use crate::email::Mailer;
use crate::error::{SelectionError, SelectionResult};
use common::config::Config;
use db::models::audit_event::AuditAction;
use db::models::selection_period::{self, PeriodAction};
use db::models::{assignment, employee, route};
use futures::stream::{FuturesUnordered, StreamExt};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// What happened to a batch. `failed > 0` is a partial result, not an
/// error; sends skipped by cancellation appear in neither count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DispatchOutcome {
    pub sent: usize,
    pub failed: usize,
}

struct OutboundEmail {
    employee_id: i64,
    recipient: String,
    subject: String,
    body: String,
}

pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    concurrency: usize,
    frontend_url: String,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, concurrency: usize, frontend_url: String) -> Self {
        Self {
            mailer,
            concurrency: concurrency.max(1),
            frontend_url,
        }
    }

    pub fn from_config(mailer: Arc<dyn Mailer>) -> Self {
        let config = Config::get();
        Self::new(
            mailer,
            config.notification_concurrency,
            config.frontend_url.clone(),
        )
    }

    /// Invites every eligible driver to submit choices. Legal while the
    /// period is UPCOMING or OPEN, including resends.
    pub async fn notify_period_open(
        &self,
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
        cancel: CancellationToken,
    ) -> SelectionResult<DispatchOutcome> {
        let result = self
            .notify_period_open_flow(db, principal, period_id, cancel)
            .await;
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

    async fn notify_period_open_flow(
        &self,
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
        cancel: CancellationToken,
    ) -> SelectionResult<DispatchOutcome> {
        principal.require_manager()?;

        let period = selection_period::Entity::find_by_id(period_id)
            .one(db)
            .await?
            .ok_or(SelectionError::NotFound("selection period"))?;

        period
            .status
            .next(PeriodAction::Notify)
            .ok_or(SelectionError::InvalidTransition {
                from: period.status,
                action: PeriodAction::Notify,
            })?;

        let employees = employee::Model::eligible_for_terminal(db, period.terminal_id).await?;

        let batch = employees
            .into_iter()
            .map(|employee| OutboundEmail {
                employee_id: employee.id,
                recipient: employee.email.clone(),
                subject: format!("Route selection open: {}", period.name),
                body: format!(
                    "Hello {},\n\n\
                     The {} route selection is open for submissions from {} through {}.\n\
                     Submit at least {} ranked run choice(s) before the window closes:\n\n\
                     {}/selections/{}\n\n\
                     Runs are awarded strictly by seniority once the window closes.\n",
                    employee.display_name(),
                    period.name,
                    period.start_date,
                    period.end_date,
                    period.required_selections,
                    self.frontend_url,
                    period.id,
                ),
            })
            .collect();

        Ok(self.dispatch(db, principal.user_id, batch, cancel).await)
    }

    /// Tells every driver with an assignment row what they received.
    /// Legal only once the period is COMPLETED; safe to repeat.
    pub async fn notify_assignments(
        &self,
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
        cancel: CancellationToken,
    ) -> SelectionResult<DispatchOutcome> {
        let result = self
            .notify_assignments_flow(db, principal, period_id, cancel)
            .await;
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

    async fn notify_assignments_flow(
        &self,
        db: &DatabaseConnection,
        principal: &Principal,
        period_id: i64,
        cancel: CancellationToken,
    ) -> SelectionResult<DispatchOutcome> {
        principal.require_manager()?;

        let period = selection_period::Entity::find_by_id(period_id)
            .one(db)
            .await?
            .ok_or(SelectionError::NotFound("selection period"))?;

        period
            .status
            .next(PeriodAction::NotifyAssign)
            .ok_or(SelectionError::InvalidTransition {
                from: period.status,
                action: PeriodAction::NotifyAssign,
            })?;

        let assignments = assignment::Model::list_for_period(db, period_id).await?;

        let employee_ids: Vec<i64> = assignments.iter().map(|a| a.employee_id).collect();
        let employees: HashMap<i64, employee::Model> = employee::Entity::find()
            .filter(employee::Column::Id.is_in(employee_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();

        let route_ids: Vec<i64> = assignments.iter().filter_map(|a| a.route_id).collect();
        let routes: HashMap<i64, route::Model> = route::Entity::find()
            .filter(route::Column::Id.is_in(route_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        let mut batch = Vec::with_capacity(assignments.len());
        for row in &assignments {
            let Some(employee) = employees.get(&row.employee_id) else {
                tracing::warn!(
                    employee_id = row.employee_id,
                    "assignment row without employee record, skipping notification"
                );
                continue;
            };

            let body = match row.route_id.and_then(|id| routes.get(&id)) {
                Some(run) => format!(
                    "Hello {},\n\n\
                     Your {} assignment is run {} ({} to {}), {} from {} to {},\n\
                     effective {}.{}\n",
                    employee.display_name(),
                    period.name,
                    run.run_number,
                    run.origin,
                    run.destination,
                    run.days,
                    run.start_time.format("%H:%M"),
                    run.end_time.format("%H:%M"),
                    row.effective_date,
                    match row.choice_received {
                        Some(rank) => format!(" This was your choice #{}.", rank),
                        None => String::new(),
                    },
                ),
                None => format!(
                    "Hello {},\n\n\
                     You were not awarded a run for {} and are placed in the float\n\
                     pool effective {}. Daily dispatch will assign your work.\n",
                    employee.display_name(),
                    period.name,
                    row.effective_date,
                ),
            };

            batch.push(OutboundEmail {
                employee_id: employee.id,
                recipient: employee.email.clone(),
                subject: format!("Your {} assignment", period.name),
                body,
            });
        }

        Ok(self.dispatch(db, principal.user_id, batch, cancel).await)
    }

    async fn dispatch(
        &self,
        db: &DatabaseConnection,
        user_id: i64,
        batch: Vec<OutboundEmail>,
        cancel: CancellationToken,
    ) -> DispatchOutcome {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = FuturesUnordered::new();

        for message in batch {
            if cancel.is_cancelled() {
                break;
            }

            let mailer = Arc::clone(&self.mailer);
            let semaphore = Arc::clone(&semaphore);
            let db = db.clone();
            let cancel = cancel.clone();

            tasks.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return None;
                };
                if cancel.is_cancelled() {
                    return None;
                }

                let result = mailer
                    .send(&message.recipient, &message.subject, &message.body)
                    .await;

                let (action, details) = match &result {
                    Ok(_) => (
                        AuditAction::NotificationSent,
                        serde_json::json!({ "recipient": message.recipient }).to_string(),
                    ),
                    Err(err) => (
                        AuditAction::NotificationFailed,
                        serde_json::json!({
                            "recipient": message.recipient,
                            "error": err.to_string(),
                        })
                        .to_string(),
                    ),
                };

                if let Err(audit_err) = AuditService::record(
                    &db,
                    user_id,
                    action,
                    &format!("employee:{}", message.employee_id),
                    &details,
                )
                .await
                {
                    tracing::error!("failed to record notification attempt: {audit_err}");
                }

                Some(result.is_ok())
            }));
        }

        let mut outcome = DispatchOutcome::default();
        while let Some(joined) = tasks.next().await {
            match joined {
                Ok(Some(true)) => outcome.sent += 1,
                Ok(Some(false)) => outcome.failed += 1,
                Ok(None) => {}
                Err(join_err) => {
                    tracing::error!("notification task panicked: {join_err}");
                    outcome.failed += 1;
                }
            }
        }

        tracing::info!(
            sent = outcome.sent,
            failed = outcome.failed,
            "notification batch finished"
        );
        outcome
    }
}
