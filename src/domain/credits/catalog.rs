//! Credit catalog - packages for sale and per-action costs.
//!
//! [`CatalogSnapshot`] is an immutable view loaded from the datastore. All
//! lookups are pure; callers receive the snapshot explicitly.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::foundation::PackageId;

/// A purchasable bundle of credits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPackage {
    pub id: PackageId,
    pub name: String,
    pub credits: i64,
    /// Price in major currency units.
    pub price: f64,
    pub active: bool,
}

impl CreditPackage {
    /// Price in minor currency units, as the provider expects it.
    pub fn price_minor_units(&self) -> i64 {
        (self.price * 100.0).round() as i64
    }
}

/// Credit price of a marketplace action (e.g. `create_ad`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCost {
    pub id: Uuid,
    pub action_type: String,
    pub cost: i64,
    pub description: Option<String>,
}

/// Read-only view of packages and action costs.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    packages: Vec<CreditPackage>,
    costs: HashMap<String, CreditCost>,
    loaded_at: Option<DateTime<Utc>>,
}

impl CatalogSnapshot {
    /// Builds a snapshot; later costs for the same action replace earlier ones.
    pub fn new(
        packages: Vec<CreditPackage>,
        costs: Vec<CreditCost>,
        loaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            packages,
            costs: costs
                .into_iter()
                .map(|c| (c.action_type.clone(), c))
                .collect(),
            loaded_at: Some(loaded_at),
        }
    }

    /// Empty snapshot used before the first load.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Credits required for an action. Unknown actions are free.
    pub fn cost_of(&self, action_type: &str) -> i64 {
        self.costs.get(action_type).map(|c| c.cost).unwrap_or(0)
    }

    /// Whether `balance` covers the cost of `action_type`.
    pub fn can_afford(&self, balance: i64, action_type: &str) -> bool {
        balance >= self.cost_of(action_type)
    }

    /// Active package by id.
    pub fn active_package(&self, id: &PackageId) -> Option<&CreditPackage> {
        self.packages.iter().find(|p| p.active && &p.id == id)
    }

    /// Active packages, cheapest first.
    pub fn active_packages(&self) -> Vec<&CreditPackage> {
        let mut packages: Vec<&CreditPackage> = self.packages.iter().filter(|p| p.active).collect();
        packages.sort_by(|a, b| a.price.total_cmp(&b.price));
        packages
    }

    /// All action costs ordered by action name.
    pub fn costs(&self) -> Vec<&CreditCost> {
        let mut costs: Vec<&CreditCost> = self.costs.values().collect();
        costs.sort_by(|a, b| a.action_type.cmp(&b.action_type));
        costs
    }

    /// When this snapshot was loaded, `None` for the initial empty one.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}
