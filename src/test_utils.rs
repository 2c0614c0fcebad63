//! Shared helpers for unit tests: in-memory database setup and minimal row
//! factories that bypass the coordinator on purpose, so each module's tests
//! can seed exactly the state they need.
#![allow(clippy::unwrap_used)]

use crate::{
    config::database::create_tables,
    entities::{category, flavor, order_item, product, product_variant, weight},
    errors::Result,
};
use sea_orm::{Database, DatabaseConnection, Set, prelude::*};

/// Creates a fresh in-memory database with the full schema.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    create_tables(&db).await?;
    Ok(db)
}

/// Creates a database together with one bare product row.
pub async fn setup_with_product() -> Result<(DatabaseConnection, product::Model)> {
    let db = setup_test_db().await?;
    let now = chrono::Utc::now();
    let model = product::ActiveModel {
        name: Set("Test Product".to_string()),
        slug: Set("test-product".to_string()),
        description: Set(None),
        is_supplement: Set(false),
        nutrition: Set(None),
        is_featured: Set(false),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let product = model.insert(&db).await?;
    Ok((db, product))
}

/// Inserts a category row with a slug derived from the name.
pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
) -> Result<category::Model> {
    let model = category::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(crate::core::slugify(name)),
        parent_id: Set(None),
        image_path: Set(None),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Inserts a flavor row.
pub async fn create_test_flavor(db: &DatabaseConnection, name: &str) -> Result<flavor::Model> {
    let model = flavor::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Inserts a weight row.
pub async fn create_test_weight(
    db: &DatabaseConnection,
    value: f64,
    unit: &str,
) -> Result<weight::Model> {
    let model = weight::ActiveModel {
        value: Set(value),
        unit: Set(unit.to_string()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Inserts an active variant with zero quantity and a fixed price.
pub async fn create_test_variant(
    db: &DatabaseConnection,
    product_id: i64,
    sku: &str,
) -> Result<product_variant::Model> {
    let model = product_variant::ActiveModel {
        product_id: Set(product_id),
        flavor_id: Set(None),
        weight_id: Set(None),
        sku: Set(sku.to_string()),
        price: Set(9.99),
        sale_price: Set(None),
        quantity: Set(0),
        is_active: Set(true),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Records a completed order line against a variant, giving it the order
/// history that switches deletions to the soft path.
pub async fn record_test_order(
    db: &DatabaseConnection,
    variant_id: i64,
    quantity: i32,
) -> Result<order_item::Model> {
    let model = order_item::ActiveModel {
        variant_id: Set(variant_id),
        quantity: Set(quantity),
        unit_price: Set(9.99),
        order_ref: Set(format!("TEST-ORDER-{variant_id}")),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}
