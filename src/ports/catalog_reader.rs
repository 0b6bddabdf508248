//! CatalogReader port - admin-managed packages and action costs.

use async_trait::async_trait;

use crate::domain::credits::{CreditCost, CreditPackage};
use crate::domain::foundation::DomainError;

/// Read access to the credit catalog tables.
///
/// Called by the snapshot refresher, never on the request path.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// All packages, including inactive ones.
    async fn list_packages(&self) -> Result<Vec<CreditPackage>, DomainError>;

    /// All action costs.
    async fn list_costs(&self) -> Result<Vec<CreditCost>, DomainError>;
}
