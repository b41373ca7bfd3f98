//! Authorization boundary.
//!
//! The HTTP layer authenticates and hands the core a `Principal`; the core
//! owns the authorization rules. Drivers act only on their own records,
//! managers additionally read everything and run the period lifecycle,
//! admins do everything including processing and deletion.

use crate::error::{SelectionError, SelectionResult};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Role {
    Admin,
    Manager,
    Driver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
    /// Set when the account is linked to a driver record.
    pub employee_id: Option<i64>,
}

impl Principal {
    pub fn new(user_id: i64, role: Role, employee_id: Option<i64>) -> Self {
        Self {
            user_id,
            role,
            employee_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can_manage_periods(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Manager)
    }

    pub fn owns_employee(&self, employee_id: i64) -> bool {
        self.employee_id == Some(employee_id)
    }

    pub(crate) fn require_admin(&self) -> SelectionResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(SelectionError::Forbidden)
        }
    }

    pub(crate) fn require_manager(&self) -> SelectionResult<()> {
        if self.can_manage_periods() {
            Ok(())
        } else {
            Err(SelectionError::Forbidden)
        }
    }

    /// Write access to an employee's own records (preference submission).
    pub(crate) fn require_employee_self(&self, employee_id: i64) -> SelectionResult<()> {
        if self.is_admin() || self.owns_employee(employee_id) {
            Ok(())
        } else {
            Err(SelectionError::Forbidden)
        }
    }

    /// Read access to an employee's records: the employee themselves, or
    /// anyone who can read everything.
    pub(crate) fn require_employee_read(&self, employee_id: i64) -> SelectionResult<()> {
        if self.can_manage_periods() || self.owns_employee(employee_id) {
            Ok(())
        } else {
            Err(SelectionError::Forbidden)
        }
    }
}
