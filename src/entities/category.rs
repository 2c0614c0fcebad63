//! Category entity - A node in the category tree.
//!
//! Categories form a hierarchy via the optional `parent_id` self-reference.
//! The parent relation must stay acyclic and a category with children cannot
//! be deleted.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    /// Unique identifier for the category
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name, unique across all categories
    #[sea_orm(unique)]
    pub name: String,
    /// URL-safe identifier derived from the name, unique
    #[sea_orm(unique)]
    pub slug: String,
    /// Optional parent category (None for root categories)
    pub parent_id: Option<i64>,
    /// Optional blob-store locator for the category image
    pub image_path: Option<String>,
}

/// Defines relationships between Category and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A category appears in many product associations
    #[sea_orm(has_many = "super::product_category::Entity")]
    ProductCategory,
}

impl Related<super::product_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductCategory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
