//! PostgreSQL implementation of CatalogReader.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::credits::{CreditCost, CreditPackage};
use crate::domain::foundation::{DomainError, ErrorCode, PackageId};
use crate::ports::CatalogReader;

pub struct PostgresCatalogReader {
    pool: PgPool,
}

impl PostgresCatalogReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PackageRow {
    id: String,
    name: String,
    credits: i64,
    price: f64,
    active: bool,
}

impl TryFrom<PackageRow> for CreditPackage {
    type Error = DomainError;

    fn try_from(row: PackageRow) -> Result<Self, Self::Error> {
        Ok(CreditPackage {
            id: PackageId::new(row.id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid package id: {}", e))
            })?,
            name: row.name,
            credits: row.credits,
            price: row.price,
            active: row.active,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CostRow {
    id: Uuid,
    action_type: String,
    cost: i64,
    description: Option<String>,
}

impl From<CostRow> for CreditCost {
    fn from(row: CostRow) -> Self {
        CreditCost {
            id: row.id,
            action_type: row.action_type,
            cost: row.cost,
            description: row.description,
        }
    }
}

#[async_trait]
impl CatalogReader for PostgresCatalogReader {
    async fn list_packages(&self) -> Result<Vec<CreditPackage>, DomainError> {
        let rows: Vec<PackageRow> = sqlx::query_as(
            r#"
            SELECT id, name, credits, price, active
            FROM credit_packages
            ORDER BY price ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to load packages: {}", e))
        })?;

        rows.into_iter().map(CreditPackage::try_from).collect()
    }

    async fn list_costs(&self) -> Result<Vec<CreditCost>, DomainError> {
        let rows: Vec<CostRow> = sqlx::query_as(
            r#"
            SELECT id, action_type, cost, description
            FROM credit_costs
            ORDER BY action_type ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to load costs: {}", e))
        })?;

        Ok(rows.into_iter().map(CreditCost::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_row_converts() {
        let package = CreditPackage::try_from(PackageRow {
            id: "pkg_50".to_string(),
            name: "Value pack".to_string(),
            credits: 50,
            price: 39.5,
            active: true,
        })
        .unwrap();

        assert_eq!(package.price_minor_units(), 3950);
    }

    #[test]
    fn blank_package_id_is_rejected() {
        let result = CreditPackage::try_from(PackageRow {
            id: "  ".to_string(),
            name: "Broken".to_string(),
            credits: 1,
            price: 1.0,
            active: false,
        });

        assert!(result.is_err());
    }
}
