use async_trait::async_trait;
use entity::employee;
use products_hr::{Employee, EmployeeId, EmployeeStore, StoreError, StoreResult};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ConnectionTrait, EntityTrait,
    QueryOrder, Statement,
};
use tracing::debug;

use crate::DbPool;

/// [`EmployeeStore`] over the `employee` table.
#[derive(Clone, Debug)]
pub struct SeaOrmEmployeeStore {
    db: DbPool,
}

impl SeaOrmEmployeeStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EmployeeStore for SeaOrmEmployeeStore {
    async fn save(&self, employee: Employee) -> StoreResult<Employee> {
        let Some(id) = employee.id else {
            let model = employee::ActiveModel {
                id: NotSet,
                name: Set(employee.name),
                salary: Set(employee.salary),
                department: Set(employee.department),
            }
            .insert(&self.db)
            .await
            .map_err(StoreError::backend)?;
            debug!(employee_id = model.id, "employee row inserted");
            return Ok(to_record(model));
        };

        let row = employee::ActiveModel {
            id: Set(id),
            name: Set(employee.name.clone()),
            salary: Set(employee.salary),
            department: Set(employee.department.clone()),
        };
        employee::Entity::insert(row)
            .on_conflict(
                OnConflict::column(employee::Column::Id)
                    .update_columns([
                        employee::Column::Name,
                        employee::Column::Salary,
                        employee::Column::Department,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(StoreError::backend)?;
        debug!(employee_id = id, "employee row written");
        Ok(employee)
    }

    async fn find_by_id(&self, id: EmployeeId) -> StoreResult<Option<Employee>> {
        let model = employee::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(StoreError::backend)?;
        Ok(model.map(to_record))
    }

    async fn find_all(&self) -> StoreResult<Vec<Employee>> {
        let models = employee::Entity::find()
            .order_by_asc(employee::Column::Id)
            .all(&self.db)
            .await
            .map_err(StoreError::backend)?;
        Ok(models.into_iter().map(to_record).collect())
    }

    async fn delete_by_id(&self, id: EmployeeId) -> StoreResult<bool> {
        let result = employee::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(StoreError::backend)?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_all(&self) -> StoreResult<()> {
        let result = employee::Entity::delete_many()
            .exec(&self.db)
            .await
            .map_err(StoreError::backend)?;
        debug!(rows = result.rows_affected, "employee table cleared");
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        let backend = self.db.get_database_backend();
        self.db
            .execute(Statement::from_string(backend, "SELECT 1"))
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }
}

fn to_record(model: employee::Model) -> Employee {
    Employee::with_id(model.id, model.name, model.salary, model.department)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use migration::{Migrator, MigratorTrait};
    use products_hr::{EmployeeRequest, EmployeeService, HrError};
    use sea_orm::Database;

    use super::*;

    async fn store() -> SeaOrmEmployeeStore {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SeaOrmEmployeeStore::new(db)
    }

    #[tokio::test]
    async fn insert_assigns_ids() {
        let store = store().await;
        let first = store.save(Employee::new("John Doe", 45000.0, "IT")).await.unwrap();
        let second = store.save(Employee::new("Jane Doe", 50000.0, "HR")).await.unwrap();
        assert!(first.id.unwrap() > 0);
        assert!(second.id.unwrap() > first.id.unwrap());
    }

    #[tokio::test]
    async fn save_with_id_overwrites_in_place() {
        let store = store().await;
        let saved = store.save(Employee::new("John Doe", 45000.0, "IT")).await.unwrap();
        let id = saved.id.unwrap();
        store
            .save(Employee::with_id(id, "John Smith", 50000.0, "HR"))
            .await
            .unwrap();

        let all = store.find_all().await.unwrap();
        assert_eq!(all, vec![Employee::with_id(id, "John Smith", 50000.0, "HR")]);
    }

    #[tokio::test]
    async fn delete_reports_affected_rows() {
        let store = store().await;
        let saved = store.save(Employee::new("John Doe", 45000.0, "IT")).await.unwrap();
        let id = saved.id.unwrap();
        assert!(store.delete_by_id(id).await.unwrap());
        assert!(!store.delete_by_id(id).await.unwrap());
        assert_eq!(store.find_by_id(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn ping_succeeds_on_live_pool() {
        store().await.ping().await.unwrap();
    }

    #[tokio::test]
    async fn service_runs_against_sqlite() {
        let service = EmployeeService::new(Arc::new(store().await));
        service
            .add(EmployeeRequest::new("John Doe", 45000.0, "IT"))
            .await
            .unwrap();
        service
            .add(EmployeeRequest::new("Jane Doe", 50000.0, "HR"))
            .await
            .unwrap();
        assert_eq!(service.total_salary().await.unwrap(), 95000.0);

        service.delete_all().await.unwrap();
        assert!(service.get_all().await.unwrap().is_empty());
        assert!(matches!(service.get_by_id(1).await, Err(HrError::NotFound(1))));
    }
}
