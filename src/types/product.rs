//! Products, categories, and data bundles.

use serde::{Deserialize, Serialize};

/// `AIRTIME` or `DATA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductCategoryKind {
    /// Airtime top-up.
    Airtime,
    /// Data bundle.
    Data,
}

/// A listing category, e.g. "MTN Airtime", "Glo Data".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCategory {
    /// Internal identifier.
    pub id: i64,
    /// Unique category code.
    pub category_code: String,
    /// Display name.
    pub name: String,
    /// `AIRTIME` or `DATA`.
    pub kind: ProductCategoryKind,
    /// Whether this category appears in listings (backs the
    /// `product_categories_active` cache entry).
    pub is_active: bool,
}

/// A vendible product, e.g. `MTNVTU`, `GLODATA`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Internal identifier.
    pub id: i64,
    /// Unique product code, e.g. `MTNVTU`.
    pub product_code: String,
    /// Owning category.
    pub category_id: i64,
    /// `AIRTIME` or `DATA`.
    pub category: ProductCategoryKind,
    /// Primary provider account to route this product's orders through.
    pub preferred_provider_account_id: i64,
    /// Fallback provider account, if the preferred one is unavailable.
    /// Selection between preferred/backup is outside this gateway's
    /// scope (administrative routing policy); the coordinator always
    /// uses `preferred_provider_account_id`.
    pub backup_provider_account_id: Option<i64>,
}

/// A data bundle belonging to a `DATA` product, e.g. "1GB Daily".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPackage {
    /// Internal identifier.
    pub id: i64,
    /// Unique bundle code, e.g. `MTN-1GB-DAILY`.
    pub data_code: String,
    /// Owning product.
    pub product_id: i64,
    /// Display name.
    pub name: String,
    /// List price for this bundle (before discount).
    pub price: crate::money::Money,
}

/// The provider-specific plan code used when dispatching a [`DataPackage`]
/// to a given provider account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPackageProvider {
    /// Owning data package.
    pub data_package_id: i64,
    /// Owning provider account.
    pub provider_account_id: i64,
    /// The plan/product code the provider's own API expects.
    pub provider_plan_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_kind_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&ProductCategoryKind::Data).unwrap(),
            "\"DATA\""
        );
    }
}
