use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Store-assigned identifier; positive once persisted.
pub type EmployeeId = i64;

/// A stored employee record. `id` is `None` until the store assigns one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Option<EmployeeId>,
    pub name: String,
    pub salary: f64,
    pub department: String,
}

impl Employee {
    pub fn new(name: impl Into<String>, salary: f64, department: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            salary,
            department: department.into(),
        }
    }

    pub fn with_id(
        id: EmployeeId,
        name: impl Into<String>,
        salary: f64,
        department: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id),
            ..Self::new(name, salary, department)
        }
    }
}

/// Inbound payload for add and update. Text fields may be absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRequest {
    pub name: Option<String>,
    #[serde(default, alias = "sal", deserialize_with = "null_as_zero")]
    pub salary: f64,
    #[serde(alias = "dept")]
    pub department: Option<String>,
}

impl EmployeeRequest {
    pub fn new(name: impl Into<String>, salary: f64, department: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            salary,
            department: Some(department.into()),
        }
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// Outbound view of a stored record. Always written with the long field names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmployeeResponse {
    pub id: EmployeeId,
    pub name: String,
    pub salary: f64,
    pub department: String,
}

impl From<Employee> for EmployeeResponse {
    fn from(employee: Employee) -> Self {
        Self {
            // Records coming back from a store always carry an id.
            id: employee.id.unwrap_or_default(),
            name: employee.name,
            salary: employee.salary,
            department: employee.department,
        }
    }
}

/// Result of a mutating operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Added(EmployeeId),
    Updated(EmployeeId),
    Deleted(EmployeeId),
    AllDeleted,
}

impl Confirmation {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Added(_) => "Employee added",
            Self::Updated(_) => "Employee updated",
            Self::Deleted(_) => "Employee Deleted",
            Self::AllDeleted => "All Employees Deleted",
        }
    }

    pub fn employee_id(&self) -> Option<EmployeeId> {
        match self {
            Self::Added(id) | Self::Updated(id) | Self::Deleted(id) => Some(*id),
            Self::AllDeleted => None,
        }
    }
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
