//! Product entity - The catalog aggregate root.
//!
//! A product owns its category associations, variants, and images. A product
//! with zero variants is a temporarily-invalid state only permitted inside
//! the coordinator's transaction; the coordinator guarantees at least one
//! variant exists on commit.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// URL-safe identifier derived from the name, unique
    #[sea_orm(unique)]
    pub slug: String,
    /// Optional long-form description
    pub description: Option<String>,
    /// Whether the product is a dietary supplement
    pub is_supplement: bool,
    /// Free-form structured nutrition attributes
    pub nutrition: Option<Json>,
    /// Featured on the storefront landing surfaces
    pub is_featured: bool,
    /// Active flag; soft-deleted products keep their row with this false
    pub is_active: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A product has many category associations
    #[sea_orm(has_many = "super::product_category::Entity")]
    ProductCategory,
    /// A product has one or more variants
    #[sea_orm(has_many = "super::product_variant::Entity")]
    ProductVariant,
    /// A product has zero or more images
    #[sea_orm(has_many = "super::product_image::Entity")]
    ProductImage,
}

impl Related<super::product_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductCategory.def()
    }
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductVariant.def()
    }
}

impl Related<super::product_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductImage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
