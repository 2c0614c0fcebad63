//! Flavor entity - A small reference value referenced, never owned, by variants.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Flavor database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "flavors")]
pub struct Model {
    /// Unique identifier for the flavor
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Flavor name, unique by natural key
    #[sea_orm(unique)]
    pub name: String,
}

/// Defines relationships between Flavor and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A flavor is referenced by many variants
    #[sea_orm(has_many = "super::product_variant::Entity")]
    ProductVariant,
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductVariant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
