use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::error::{HrError, HrResult};
use crate::model::{Confirmation, Employee, EmployeeId, EmployeeRequest, EmployeeResponse};
use crate::store::EmployeeStore;

/// Validation, lookup and aggregation over the employee table.
#[derive(Clone)]
pub struct EmployeeService {
    store: Arc<dyn EmployeeStore>,
}

/// Request fields after validation.
struct ValidFields {
    name: String,
    salary: f64,
    department: String,
}

impl EmployeeService {
    pub fn new(store: Arc<dyn EmployeeStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn EmployeeStore> {
        &self.store
    }

    #[instrument(name = "hr.add", skip_all)]
    pub async fn add(&self, request: EmployeeRequest) -> HrResult<Confirmation> {
        let fields = validate_request(request)?;
        let saved = self
            .store
            .save(Employee::new(fields.name, fields.salary, fields.department))
            .await?;
        let id = saved.id.unwrap_or_default();
        info!(employee_id = id, "employee added");
        Ok(Confirmation::Added(id))
    }

    #[instrument(name = "hr.get", skip(self))]
    pub async fn get_by_id(&self, id: EmployeeId) -> HrResult<EmployeeResponse> {
        validate_id(id)?;
        self.find_existing(id).await.map(EmployeeResponse::from)
    }

    #[instrument(name = "hr.list", skip_all)]
    pub async fn get_all(&self) -> HrResult<Vec<EmployeeResponse>> {
        let employees = self.store.find_all().await?;
        Ok(employees.into_iter().map(EmployeeResponse::from).collect())
    }

    #[instrument(name = "hr.total_salary", skip_all)]
    pub async fn total_salary(&self) -> HrResult<f64> {
        let employees = self.store.find_all().await?;
        Ok(employees.iter().map(|employee| employee.salary).sum())
    }

    #[instrument(name = "hr.update", skip(self, request))]
    pub async fn update(
        &self,
        id: EmployeeId,
        request: EmployeeRequest,
    ) -> HrResult<Confirmation> {
        validate_id(id)?;
        let fields = validate_request(request)?;
        let mut employee = self.find_existing(id).await?;
        employee.name = fields.name;
        employee.salary = fields.salary;
        employee.department = fields.department;
        self.store.save(employee).await?;
        info!(employee_id = id, "employee updated");
        Ok(Confirmation::Updated(id))
    }

    /// Bounds are inclusive; `min > max` matches nothing.
    #[instrument(name = "hr.salary_between", skip(self))]
    pub async fn salary_between(&self, min: f64, max: f64) -> HrResult<Vec<EmployeeResponse>> {
        let employees = self.store.find_all().await?;
        let matched: Vec<EmployeeResponse> = employees
            .into_iter()
            .filter(|employee| employee.salary >= min && employee.salary <= max)
            .map(EmployeeResponse::from)
            .collect();
        debug!(matched = matched.len(), "salary range filtered");
        Ok(matched)
    }

    #[instrument(name = "hr.delete", skip(self))]
    pub async fn delete(&self, id: EmployeeId) -> HrResult<Confirmation> {
        validate_id(id)?;
        if !self.store.delete_by_id(id).await? {
            return Err(HrError::NotFound(id));
        }
        info!(employee_id = id, "employee deleted");
        Ok(Confirmation::Deleted(id))
    }

    #[instrument(name = "hr.delete_all", skip_all)]
    pub async fn delete_all(&self) -> HrResult<Confirmation> {
        self.store.delete_all().await?;
        info!("all employees deleted");
        Ok(Confirmation::AllDeleted)
    }

    async fn find_existing(&self, id: EmployeeId) -> HrResult<Employee> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(HrError::NotFound(id))
    }
}

fn validate_id(id: EmployeeId) -> HrResult<()> {
    if id <= 0 {
        return Err(HrError::validation("id", "must be a positive integer"));
    }
    Ok(())
}

fn validate_request(request: EmployeeRequest) -> HrResult<ValidFields> {
    let name = non_empty(request.name, "name")?;
    if !request.salary.is_finite() || request.salary < 0.0 {
        return Err(HrError::validation(
            "salary",
            "must be a finite, non-negative amount",
        ));
    }
    let department = non_empty(request.department, "department")?;
    Ok(ValidFields {
        name,
        salary: request.salary,
        department,
    })
}

fn non_empty(value: Option<String>, field: &'static str) -> HrResult<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(HrError::validation(field, "cannot be null or empty")),
    }
}
