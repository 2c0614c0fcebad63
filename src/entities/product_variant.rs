//! Product variant entity - A purchasable unit of a product.
//!
//! A variant is distinguished by an optional flavor and/or weight and carries
//! its own SKU, price, and quantity. The (`product_id`, `flavor_id`,
//! `weight_id`) tuple is unique per product, including the both-null "simple
//! product" row which is limited to exactly one variant.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product variant database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_variants")]
pub struct Model {
    /// Unique identifier for the variant
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The owning product
    pub product_id: i64,
    /// Optional flavor reference
    pub flavor_id: Option<i64>,
    /// Optional weight reference
    pub weight_id: Option<i64>,
    /// Stock-keeping identifier, unique across all variants
    #[sea_orm(unique)]
    pub sku: String,
    /// Regular price
    pub price: f64,
    /// Optional discounted price
    pub sale_price: Option<f64>,
    /// Current stock quantity, never negative
    pub quantity: i32,
    /// Active flag; variants with order history are soft-deleted via this
    pub is_active: bool,
}

/// Defines relationships between Variant and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each variant belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    /// Optional flavor reference
    #[sea_orm(
        belongs_to = "super::flavor::Entity",
        from = "Column::FlavorId",
        to = "super::flavor::Column::Id"
    )]
    Flavor,
    /// Optional weight reference
    #[sea_orm(
        belongs_to = "super::weight::Entity",
        from = "Column::WeightId",
        to = "super::weight::Column::Id"
    )]
    Weight,
    /// A variant accumulates inventory log entries
    #[sea_orm(has_many = "super::inventory_log::Entity")]
    InventoryLog,
    /// A variant may appear in completed order items
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::flavor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Flavor.def()
    }
}

impl Related<super::weight::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Weight.def()
    }
}

impl Related<super::inventory_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryLog.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
