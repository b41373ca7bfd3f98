pub mod assignment;
pub mod audit_event;
pub mod employee;
pub mod period_route;
pub mod preference;
pub mod route;
pub mod selection_period;
pub mod terminal;

pub use assignment::Entity as Assignment;
pub use audit_event::Entity as AuditEvent;
pub use employee::Entity as Employee;
pub use period_route::Entity as PeriodRoute;
pub use preference::Entity as Preference;
pub use route::Entity as Route;
pub use selection_period::Entity as SelectionPeriod;
pub use terminal::Entity as Terminal;
