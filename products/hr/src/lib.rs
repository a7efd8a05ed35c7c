//! HR vertical slice: employee records.
//!
//! The [`EmployeeService`] owns request validation, not-found handling and the
//! salary aggregates. Persistence is reached through the [`EmployeeStore`] trait so
//! the service runs the same against Postgres, SQLite or [`InMemoryEmployeeStore`].

mod error;
mod model;
mod service;
mod store;

pub use error::{HrError, HrResult, StoreError, StoreResult};
pub use model::{Confirmation, Employee, EmployeeId, EmployeeRequest, EmployeeResponse};
pub use service::EmployeeService;
pub use store::{EmployeeStore, InMemoryEmployeeStore};
