//! Weight entity - A value + unit reference pair (e.g. 500 g, 1 kg).
//!
//! Unique by the (value, unit) natural key; referenced, never owned, by
//! variants.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Weight database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "weights")]
pub struct Model {
    /// Unique identifier for the weight
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Numeric value (e.g. 500.0)
    pub value: f64,
    /// Unit string (e.g. `"g"`, `"kg"`)
    pub unit: String,
}

/// Defines relationships between Weight and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A weight is referenced by many variants
    #[sea_orm(has_many = "super::product_variant::Entity")]
    ProductVariant,
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductVariant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
