//! In-memory catalog reader.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::domain::credits::{CreditCost, CreditPackage};
use crate::domain::foundation::DomainError;
use crate::ports::CatalogReader;

/// Catalog tables held in memory; replaceable at runtime to exercise refreshes.
#[derive(Default)]
pub struct InMemoryCatalog {
    packages: RwLock<Vec<CreditPackage>>,
    costs: RwLock<Vec<CreditCost>>,
    failing: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new(packages: Vec<CreditPackage>, costs: Vec<CreditCost>) -> Self {
        Self {
            packages: RwLock::new(packages),
            costs: RwLock::new(costs),
            failing: AtomicBool::new(false),
        }
    }

    pub async fn set_packages(&self, packages: Vec<CreditPackage>) {
        *self.packages.write().await = packages;
    }

    pub async fn set_costs(&self, costs: Vec<CreditCost>) {
        *self.costs.write().await = costs;
    }

    /// Make every read fail with a database error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated catalog failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogReader for InMemoryCatalog {
    async fn list_packages(&self) -> Result<Vec<CreditPackage>, DomainError> {
        self.check()?;
        Ok(self.packages.read().await.clone())
    }

    async fn list_costs(&self) -> Result<Vec<CreditCost>, DomainError> {
        self.check()?;
        Ok(self.costs.read().await.clone())
    }
}
