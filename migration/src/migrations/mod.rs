pub mod m202603150001_create_terminals;
pub mod m202603150002_create_employees;
pub mod m202603150003_create_routes;
pub mod m202603150004_create_selection_periods;
pub mod m202603150005_create_period_routes;
pub mod m202603150006_create_preferences;
pub mod m202603150007_create_assignments;
pub mod m202603150008_create_audit_events;
