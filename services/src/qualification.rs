//! The qualification predicate.
//!
//! Shared verbatim by the submission path and the assignment engine so the
//! two can never disagree about who may hold a run.

use db::models::{employee, route};

/// Whether `employee` may hold `route`.
pub fn qualifies(employee: &employee::Model, route: &route::Model) -> bool {
    if route.requires_doubles_endorsement && !employee.doubles_endorsement {
        return false;
    }
    if route.requires_chain_experience && !employee.chain_experience {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::qualifies;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use db::models::{
        employee,
        route::{self, RateType, RouteType},
    };

    fn employee(doubles: bool, chains: bool) -> employee::Model {
        employee::Model {
            id: 1,
            employee_number: "E1".to_string(),
            first_name: "Pat".to_string(),
            last_name: "Quinn".to_string(),
            email: "pat@example.com".to_string(),
            hire_date: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            doubles_endorsement: doubles,
            chain_experience: chains,
            eligible: true,
            terminal_id: None,
            account_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn route(requires_doubles: bool, requires_chains: bool) -> route::Model {
        route::Model {
            id: 1,
            run_number: "101".to_string(),
            origin: "Portland".to_string(),
            destination: "Boise".to_string(),
            route_type: if requires_doubles {
                RouteType::Doubles
            } else {
                RouteType::Singles
            },
            days: "Mon-Fri".to_string(),
            start_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            distance: 430.0,
            work_time: 10.0,
            rate_type: RateType::Mileage,
            requires_doubles_endorsement: requires_doubles,
            requires_chain_experience: requires_chains,
            active: true,
            terminal_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_unrestricted_route_accepts_anyone() {
        assert!(qualifies(&employee(false, false), &route(false, false)));
    }

    #[test]
    fn test_doubles_endorsement_required() {
        assert!(!qualifies(&employee(false, false), &route(true, false)));
        assert!(qualifies(&employee(true, false), &route(true, false)));
    }

    #[test]
    fn test_chain_experience_required() {
        assert!(!qualifies(&employee(false, false), &route(false, true)));
        assert!(qualifies(&employee(false, true), &route(false, true)));
    }

    #[test]
    fn test_both_requirements_conjoined() {
        assert!(!qualifies(&employee(true, false), &route(true, true)));
        assert!(!qualifies(&employee(false, true), &route(true, true)));
        assert!(qualifies(&employee(true, true), &route(true, true)));
    }
}
