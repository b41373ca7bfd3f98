use db::models::selection_period::{PeriodAction, Status};
use sea_orm::DbErr;
use std::future::Future;

pub type SelectionResult<T> = Result<T, SelectionError>;

/// Errors surfaced by the selection core.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("selection period is not open for submissions")]
    PeriodNotOpen,

    #[error("action {action} is not allowed while the period is {from}")]
    InvalidTransition { from: Status, action: PeriodAction },

    #[error("driver does not meet the qualifications for this run")]
    QualificationViolation,

    #[error("run is already assigned for this period")]
    RouteAlreadyAssigned,

    #[error("assignment validation failed: {0}")]
    ValidationFailed(String),

    #[error("ranked choices must be distinct")]
    DuplicateChoice,

    #[error("choice is not part of this period's run catalog")]
    RouteNotInCatalog,

    #[error("at least {required} ranked choices are required")]
    UnmetRequiredCount { required: i32 },

    #[error("not permitted for this user")]
    Forbidden,

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// SQLite reports writer contention as a locked database; a second attempt
/// usually lands once the competing transaction commits.
pub(crate) fn is_transient(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) => true,
        other => {
            let message = other.to_string();
            message.contains("database is locked") || message.contains("deadlock")
        }
    }
}

pub(crate) async fn retry_once<T, F, Fut>(op: F) -> SelectionResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = SelectionResult<T>>,
{
    match op().await {
        Err(SelectionError::Database(err)) if is_transient(&err) => {
            tracing::warn!("transient storage error, retrying once: {err}");
            op().await
        }
        other => other,
    }
}
