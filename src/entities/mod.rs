pub mod company;
pub mod company_monitor;
pub mod country;
pub mod deal;
pub mod employee;
pub mod user;

pub use company::Entity as Company;
pub use company_monitor::Entity as CompanyMonitor;
pub use country::Entity as Country;
pub use deal::Entity as Deal;
pub use employee::{Entity as Employee, Gender};
pub use user::Entity as User;
