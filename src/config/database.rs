//! Database configuration module for the catalog core.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! It provides functions for establishing database connections and creating all necessary tables
//! based on the entity definitions. The module uses `SeaORM`'s `Schema::create_table_from_entity`
//! method to automatically generate SQL statements from the entity models, ensuring that the
//! database schema matches the Rust struct definitions without requiring manual SQL.

use crate::entities::{
    BlobCleanupTask, Category, Flavor, InventoryLog, OrderItem, Product, ProductCategory,
    ProductImage, ProductVariant, Weight, product_variant,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/catalog.sqlite".to_string())
}

/// Establishes a connection to the `SQLite` database using the `DATABASE_URL` environment variable.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(get_database_url())
        .await
        .map_err(Into::into)
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity definitions.
///
/// Column-level unique constraints (slugs, SKU, flavor name) come straight from
/// the entity definitions. The composite uniqueness of a variant's
/// (product, flavor, weight) tuple gets its own index here; note that `SQLite`
/// treats NULLs as distinct in unique indexes, so the both-null "simple
/// product" case is enforced by the reconciliation engine on top of this.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let category_table = schema.create_table_from_entity(Category);
    let product_table = schema.create_table_from_entity(Product);
    let product_category_table = schema.create_table_from_entity(ProductCategory);
    let flavor_table = schema.create_table_from_entity(Flavor);
    let weight_table = schema.create_table_from_entity(Weight);
    let variant_table = schema.create_table_from_entity(ProductVariant);
    let image_table = schema.create_table_from_entity(ProductImage);
    let inventory_log_table = schema.create_table_from_entity(InventoryLog);
    let order_item_table = schema.create_table_from_entity(OrderItem);
    let cleanup_table = schema.create_table_from_entity(BlobCleanupTask);

    db.execute(builder.build(&category_table)).await?;
    db.execute(builder.build(&product_table)).await?;
    db.execute(builder.build(&product_category_table)).await?;
    db.execute(builder.build(&flavor_table)).await?;
    db.execute(builder.build(&weight_table)).await?;
    db.execute(builder.build(&variant_table)).await?;
    db.execute(builder.build(&image_table)).await?;
    db.execute(builder.build(&inventory_log_table)).await?;
    db.execute(builder.build(&order_item_table)).await?;
    db.execute(builder.build(&cleanup_table)).await?;

    let variant_combo_index = Index::create()
        .name("ux_product_variants_combo")
        .table(ProductVariant)
        .col(product_variant::Column::ProductId)
        .col(product_variant::Column::FlavorId)
        .col(product_variant::Column::WeightId)
        .unique()
        .to_owned();
    db.execute(builder.build(&variant_combo_index)).await?;

    Ok(())
}
