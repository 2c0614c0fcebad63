//! Product image entity - A blob-store locator owned by a product.
//!
//! Exactly one image per product is primary when any images exist; deleting
//! the last image of a product is rejected.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product image database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_images")]
pub struct Model {
    /// Unique identifier for the image
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The owning product
    pub product_id: i64,
    /// Blob-store locator for the stored bytes
    pub storage_path: String,
    /// Whether this is the product's primary (main display) image
    pub is_primary: bool,
}

/// Defines relationships between Image and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each image belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
