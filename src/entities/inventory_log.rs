//! Inventory log entity - One immutable quantity adjustment record.
//!
//! Entries are append-only: they are written exclusively as a side effect of
//! quantity-changing operations and are never updated or deleted. For any
//! variant, the chronologically ordered sum of `delta` values plus the
//! variant's initial quantity equals its current persisted quantity.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inventory log database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_logs")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The variant this adjustment applies to
    pub variant_id: i64,
    /// Signed quantity delta (positive restock, negative consumption)
    pub delta: i32,
    /// Reason code: `"restock"`, `"sale"`, `"return"`, or `"adjustment"`
    pub reason: String,
    /// Variant quantity before this adjustment
    pub previous_quantity: i32,
    /// Variant quantity after this adjustment
    pub new_quantity: i32,
    /// Identifier of the admin who performed the adjustment
    pub acting_admin: String,
    /// Optional free-text note
    pub note: Option<String>,
    /// When the adjustment was made
    pub created_at: DateTimeUtc,
}

/// Defines relationships between the log entry and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one variant
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
