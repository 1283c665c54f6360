//! Read-through catalog lookups backing C7's product/category/data-bundle
//! resolution steps and C5's provider-account resolution.
//!
//! Grounded on the same manual-row-mapping idiom as [`crate::store`]
//! (`*Row` structs + `TryFrom`, since the domain types hold validated
//! newtypes that don't implement `sqlx::Type`), with the cache layered in
//! front per the TTL table in [`crate::cache::ttl`]. Every lookup here
//! runs against the pool directly — catalog data is read before the
//! coordinator opens its ledger transaction.

use crate::cache::{self, Cache};
use crate::error::{GatewayError, Result};
use crate::money::Money;
use crate::types::{
    DataPackage, MerchantDiscount, Product, ProductCategory, ProductCategoryKind, ProviderAccount,
    ProviderCode,
};
use sqlx::PgPool;
use std::collections::HashMap;

/// Resolve a product by its unique code, read-through the `product:{code}`
/// cache entry.
pub async fn find_product(pool: &PgPool, cache: &dyn Cache, product_code: &str) -> Result<Option<Product>> {
    let key = cache::key::product(product_code);
    let raw = cache::read_through(cache, &key, cache::ttl::PRODUCT, || async {
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, product_code, category_id, category, preferred_provider_account_id, \
                    backup_provider_account_id \
             FROM products WHERE product_code = $1",
        )
        .bind(product_code)
        .fetch_optional(pool)
        .await?;
        match row {
            Some(r) => Ok(Some(serde_json::to_string(&Product::try_from(r)?)?)),
            None => Ok(None),
        }
    })
    .await?;

    raw.map(|s| serde_json::from_str(&s).map_err(GatewayError::Json)).transpose()
}

/// All active product categories, read-through `product_categories_active`.
pub async fn list_active_categories(pool: &PgPool, cache: &dyn Cache) -> Result<Vec<ProductCategory>> {
    let key = cache::key::product_categories_active().to_string();
    let raw = cache::read_through(cache, &key, cache::ttl::PRODUCT_CATEGORIES_ACTIVE, || async {
        let rows: Vec<ProductCategory> = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, category_code, name, kind, is_active \
             FROM product_categories WHERE is_active = true ORDER BY category_code",
        )
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(TryInto::try_into)
        .collect::<Result<_>>()?;
        Ok(Some(serde_json::to_string(&rows)?))
    })
    .await?;

    match raw {
        Some(s) => Ok(serde_json::from_str(&s)?),
        None => Ok(Vec::new()),
    }
}

/// Products within a listing category, read-through `products:category:{code}`.
pub async fn list_products_by_category(
    pool: &PgPool,
    cache: &dyn Cache,
    category_code: &str,
) -> Result<Vec<Product>> {
    let key = cache::key::products_by_category(category_code);
    let raw = cache::read_through(cache, &key, cache::ttl::PRODUCTS_BY_CATEGORY, || async {
        let rows: Vec<Product> = sqlx::query_as::<_, ProductRow>(
            "SELECT p.id, p.product_code, p.category_id, p.category, \
                    p.preferred_provider_account_id, p.backup_provider_account_id \
             FROM products p \
             JOIN product_categories c ON c.id = p.category_id \
             WHERE c.category_code = $1 ORDER BY p.product_code",
        )
        .bind(category_code)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(TryInto::try_into)
        .collect::<Result<_>>()?;
        Ok(Some(serde_json::to_string(&rows)?))
    })
    .await?;

    match raw {
        Some(s) => Ok(serde_json::from_str(&s)?),
        None => Ok(Vec::new()),
    }
}

/// A single data bundle by its unique code, scoped to the provider account
/// it will actually be dispatched through (the `(product, data, provider)`
/// triple the data_package_providers join table keys on).
pub async fn find_data_package(
    pool: &PgPool,
    cache: &dyn Cache,
    product_code: &str,
    data_code: &str,
    provider_code: ProviderCode,
) -> Result<Option<DataPackage>> {
    let key = cache::key::data_package(product_code, data_code, provider_code.as_str());
    let raw = cache::read_through(cache, &key, cache::ttl::DATA_PACKAGE, || async {
        let row: Option<DataPackageRow> = sqlx::query_as(
            "SELECT dp.id, dp.data_code, dp.product_id, dp.name, dp.price \
             FROM data_packages dp \
             JOIN products p ON p.id = dp.product_id \
             JOIN data_package_providers dpp ON dpp.data_package_id = dp.id \
             JOIN provider_accounts pa ON pa.id = dpp.provider_account_id \
             WHERE p.product_code = $1 AND dp.data_code = $2 AND pa.provider_code = $3",
        )
        .bind(product_code)
        .bind(data_code)
        .bind(provider_code.as_str())
        .fetch_optional(pool)
        .await?;
        match row {
            Some(r) => Ok(Some(serde_json::to_string(&DataPackage::from(r))?)),
            None => Ok(None),
        }
    })
    .await?;

    raw.map(|s| serde_json::from_str(&s).map_err(GatewayError::Json)).transpose()
}

/// All data bundles for a product, read-through `data_bundles:{product}:{provider}`.
pub async fn list_data_bundles(
    pool: &PgPool,
    cache: &dyn Cache,
    product_code: &str,
    provider_code: ProviderCode,
) -> Result<Vec<DataPackage>> {
    let key = cache::key::data_bundles(product_code, provider_code.as_str());
    let raw = cache::read_through(cache, &key, cache::ttl::DATA_BUNDLES, || async {
        let rows: Vec<DataPackage> = sqlx::query_as::<_, DataPackageRow>(
            "SELECT dp.id, dp.data_code, dp.product_id, dp.name, dp.price \
             FROM data_packages dp \
             JOIN products p ON p.id = dp.product_id \
             JOIN data_package_providers dpp ON dpp.data_package_id = dp.id \
             JOIN provider_accounts pa ON pa.id = dpp.provider_account_id \
             WHERE p.product_code = $1 AND pa.provider_code = $2 \
             ORDER BY dp.data_code",
        )
        .bind(product_code)
        .bind(provider_code.as_str())
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(DataPackage::from)
        .collect();
        Ok(Some(serde_json::to_string(&rows)?))
    })
    .await?;

    match raw {
        Some(s) => Ok(serde_json::from_str(&s)?),
        None => Ok(Vec::new()),
    }
}

/// The provider-specific plan code for a `(data_package, provider_account)`
/// pair — what the adapter actually sends upstream in place of the
/// merchant-facing `data_code`.
pub async fn provider_plan_code(
    pool: &PgPool,
    data_package_id: i64,
    provider_account_id: i64,
) -> Result<Option<String>> {
    let plan: Option<(String,)> = sqlx::query_as(
        "SELECT provider_plan_code FROM data_package_providers \
         WHERE data_package_id = $1 AND provider_account_id = $2",
    )
    .bind(data_package_id)
    .bind(provider_account_id)
    .fetch_optional(pool)
    .await?;
    Ok(plan.map(|(code,)| code))
}

/// A provider account by id (not cached; resolved once per dispatch and
/// carries live credentials rather than listing data).
pub async fn find_provider_account(pool: &PgPool, provider_account_id: i64) -> Result<ProviderAccount> {
    let row: ProviderAccountRow = sqlx::query_as(
        "SELECT id, provider_id, provider_code, vending_sim, config \
         FROM provider_accounts WHERE id = $1",
    )
    .bind(provider_account_id)
    .fetch_one(pool)
    .await?;
    row.try_into()
}

/// Active discount rows for a `(merchant, product)` pair, for the
/// coordinator's `MAX(discount_value)` aggregate per spec step 4.7.3.
pub async fn discounts_for(pool: &PgPool, merchant_id: i64, product_id: i64) -> Result<Vec<MerchantDiscount>> {
    let rows: Vec<DiscountRow> = sqlx::query_as(
        "SELECT id, merchant_id, product_id, discount_type, discount_value, is_active \
         FROM merchant_discounts WHERE merchant_id = $1 AND product_id = $2 AND is_active = true",
    )
    .bind(merchant_id)
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(TryInto::try_into).collect()
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    product_code: String,
    category_id: i64,
    category: String,
    preferred_provider_account_id: i64,
    backup_provider_account_id: Option<i64>,
}

impl TryFrom<ProductRow> for Product {
    type Error = GatewayError;

    fn try_from(row: ProductRow) -> Result<Self> {
        Ok(Product {
            id: row.id,
            product_code: row.product_code,
            category_id: row.category_id,
            category: parse_category_kind(&row.category)?,
            preferred_provider_account_id: row.preferred_provider_account_id,
            backup_provider_account_id: row.backup_provider_account_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    category_code: String,
    name: String,
    kind: String,
    is_active: bool,
}

impl TryFrom<CategoryRow> for ProductCategory {
    type Error = GatewayError;

    fn try_from(row: CategoryRow) -> Result<Self> {
        Ok(ProductCategory {
            id: row.id,
            category_code: row.category_code,
            name: row.name,
            kind: parse_category_kind(&row.kind)?,
            is_active: row.is_active,
        })
    }
}

fn parse_category_kind(raw: &str) -> Result<ProductCategoryKind> {
    match raw {
        "AIRTIME" => Ok(ProductCategoryKind::Airtime),
        "DATA" => Ok(ProductCategoryKind::Data),
        other => Err(GatewayError::Domain(format!("unknown category kind {other:?}"))),
    }
}

#[derive(sqlx::FromRow)]
struct DataPackageRow {
    id: i64,
    data_code: String,
    product_id: i64,
    name: String,
    price: rust_decimal::Decimal,
}

impl From<DataPackageRow> for DataPackage {
    fn from(row: DataPackageRow) -> Self {
        DataPackage {
            id: row.id,
            data_code: row.data_code,
            product_id: row.product_id,
            name: row.name,
            price: Money::new(row.price),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProviderAccountRow {
    id: i64,
    provider_id: i64,
    provider_code: String,
    vending_sim: String,
    config: String,
}

impl TryFrom<ProviderAccountRow> for ProviderAccount {
    type Error = GatewayError;

    fn try_from(row: ProviderAccountRow) -> Result<Self> {
        let provider_code = match row.provider_code.as_str() {
            "MTN" => ProviderCode::Mtn,
            "GLO" => ProviderCode::Glo,
            "AIRTEL" => ProviderCode::Airtel,
            "9MOBILE" => ProviderCode::NineMobile,
            "PAYVANTAGE" => ProviderCode::Payvantage,
            "CREDITSWITCH" => ProviderCode::Creditswitch,
            other => return Err(GatewayError::Domain(format!("unknown provider code {other:?}"))),
        };
        let config: HashMap<String, String> =
            serde_json::from_str(&row.config).map_err(GatewayError::Json)?;

        Ok(ProviderAccount {
            id: row.id,
            provider_id: row.provider_id,
            provider_code,
            vending_sim: row.vending_sim,
            config,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DiscountRow {
    id: i64,
    merchant_id: i64,
    product_id: i64,
    discount_type: String,
    discount_value: rust_decimal::Decimal,
    is_active: bool,
}

impl TryFrom<DiscountRow> for MerchantDiscount {
    type Error = GatewayError;

    fn try_from(row: DiscountRow) -> Result<Self> {
        let discount_type = match row.discount_type.as_str() {
            "fixed" => crate::types::DiscountType::Fixed,
            "percentage" => crate::types::DiscountType::Percentage,
            other => return Err(GatewayError::Domain(format!("unknown discount type {other:?}"))),
        };
        Ok(MerchantDiscount {
            id: row.id,
            merchant_id: row.merchant_id,
            product_id: row.product_id,
            discount_type,
            discount_value: row.discount_value,
            is_active: row.is_active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_category_kinds() {
        assert_eq!(parse_category_kind("AIRTIME").unwrap(), ProductCategoryKind::Airtime);
        assert_eq!(parse_category_kind("DATA").unwrap(), ProductCategoryKind::Data);
    }

    #[test]
    fn rejects_unknown_category_kind() {
        assert!(parse_category_kind("GARBAGE").is_err());
    }
}
