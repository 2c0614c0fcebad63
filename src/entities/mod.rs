//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod blob_cleanup_task;
pub mod category;
pub mod flavor;
pub mod inventory_log;
pub mod order_item;
pub mod product;
pub mod product_category;
pub mod product_image;
pub mod product_variant;
pub mod weight;

// Re-export specific types to avoid conflicts
pub use blob_cleanup_task::{Entity as BlobCleanupTask, Model as BlobCleanupTaskModel};
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use flavor::{Column as FlavorColumn, Entity as Flavor, Model as FlavorModel};
pub use inventory_log::{
    Column as InventoryLogColumn, Entity as InventoryLog, Model as InventoryLogModel,
};
pub use order_item::{Column as OrderItemColumn, Entity as OrderItem, Model as OrderItemModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use product_category::{
    Column as ProductCategoryColumn, Entity as ProductCategory, Model as ProductCategoryModel,
};
pub use product_image::{
    Column as ProductImageColumn, Entity as ProductImage, Model as ProductImageModel,
};
pub use product_variant::{
    Column as ProductVariantColumn, Entity as ProductVariant, Model as ProductVariantModel,
};
pub use weight::{Column as WeightColumn, Entity as Weight, Model as WeightModel};
