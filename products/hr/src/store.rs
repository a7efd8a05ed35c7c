use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::model::{Employee, EmployeeId};

/// Keyed persistence for employee records.
///
/// Implementations provide per-call atomicity only; the service never spans a
/// transaction across calls.
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Inserts when `employee.id` is `None` (assigning an id), otherwise overwrites.
    async fn save(&self, employee: Employee) -> StoreResult<Employee>;
    async fn find_by_id(&self, id: EmployeeId) -> StoreResult<Option<Employee>>;
    async fn find_all(&self) -> StoreResult<Vec<Employee>>;
    /// Returns `false` when no record had that id.
    async fn delete_by_id(&self, id: EmployeeId) -> StoreResult<bool>;
    async fn delete_all(&self) -> StoreResult<()>;

    /// Cheap reachability probe for health checks.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Process-local store ordered by id. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct InMemoryEmployeeStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    last_id: EmployeeId,
    rows: BTreeMap<EmployeeId, Employee>,
}

impl InMemoryEmployeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EmployeeStore for InMemoryEmployeeStore {
    async fn save(&self, mut employee: Employee) -> StoreResult<Employee> {
        let mut inner = self.inner.write().await;
        let id = match employee.id {
            Some(id) if id > 0 => id,
            Some(id) => return Err(StoreError::msg(format!("cannot store id {id}"))),
            None => inner.last_id + 1,
        };
        inner.last_id = inner.last_id.max(id);
        employee.id = Some(id);
        inner.rows.insert(id, employee.clone());
        Ok(employee)
    }

    async fn find_by_id(&self, id: EmployeeId) -> StoreResult<Option<Employee>> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<Employee>> {
        Ok(self.inner.read().await.rows.values().cloned().collect())
    }

    async fn delete_by_id(&self, id: EmployeeId) -> StoreResult<bool> {
        Ok(self.inner.write().await.rows.remove(&id).is_some())
    }

    async fn delete_all(&self) -> StoreResult<()> {
        self.inner.write().await.rows.clear();
        Ok(())
    }
}
