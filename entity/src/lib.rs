pub mod employee;

pub use employee::Entity as Employee;
