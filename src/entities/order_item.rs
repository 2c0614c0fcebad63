//! Order item entity - A completed-order line referencing a variant.
//!
//! Read-only inside this core. Its existence is what converts product and
//! variant deletion into a soft delete: rows referenced by order history must
//! remain resolvable.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    /// Unique identifier for the order item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The purchased variant
    pub variant_id: i64,
    /// Units purchased
    pub quantity: i32,
    /// Unit price at time of purchase
    pub unit_price: f64,
    /// External reference to the completed order
    pub order_ref: String,
    /// When the order item was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between the order item and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order item references one variant
    #[sea_orm(
        belongs_to = "super::product_variant::Entity",
        from = "Column::VariantId",
        to = "super::product_variant::Column::Id"
    )]
    ProductVariant,
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductVariant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
