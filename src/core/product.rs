//! Catalog mutation coordinator.
//!
//! Orchestrates multi-entity product mutations inside a single database
//! transaction: product fields, category associations, variant
//! reconciliation, and image bookkeeping either all commit or none do. Blob
//! bytes live outside the transaction boundary; deletions against the store
//! are best-effort with a compensating cleanup record on failure.

use crate::{
    core::{
        blob::{BlobStore, best_effort_delete},
        category, variant,
        variant::{MatrixDefaults, VariantFields, VariantInput},
    },
    entities::{
        InventoryLog, Product, ProductCategory, ProductImage, ProductVariant, inventory_log,
        product, product_category, product_image, product_variant,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, warn};

/// Flavor/weight selections for matrix-based variant generation.
#[derive(Debug, Clone, Default)]
pub struct VariantMatrix {
    /// Selected flavor ids (may be empty when weights are selected)
    pub flavor_ids: Vec<i64>,
    /// Selected weight ids (may be empty when flavors are selected)
    pub weight_ids: Vec<i64>,
    /// Field defaults applied to every generated variant
    pub defaults: MatrixDefaults,
}

/// One image upload accompanying a product mutation.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Raw bytes as received
    pub bytes: Vec<u8>,
    /// MIME type as declared by the client
    pub content_type: String,
}

/// Full input for a product create or update.
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    /// Display name (sanitized; see [`sanitize_name`])
    pub name: String,
    /// Optional long-form description
    pub description: Option<String>,
    /// Supplement flag
    pub is_supplement: bool,
    /// Structured nutrition attributes
    pub nutrition: Option<serde_json::Value>,
    /// Featured flag
    pub is_featured: bool,
    /// Active flag
    pub is_active: bool,
    /// Categories to associate; at least one required
    pub category_ids: Vec<i64>,
    /// Explicit primary category; must be in `category_ids` when present
    pub primary_category_id: Option<i64>,
    /// Explicit variant set, already parsed into the tagged union
    pub variants: Vec<VariantInput>,
    /// Explicit survivor list for persisted variants; when present it alone
    /// governs deletions during reconciliation
    pub keep_variant_ids: Option<Vec<i64>>,
    /// Matrix generation request, applied after the explicit set
    pub matrix: Option<VariantMatrix>,
    /// Image uploads to store and attach
    pub images: Vec<ImageUpload>,
    /// Index into `images` of the primary one; first by default
    pub primary_image_index: Option<usize>,
    /// Price for the implicit simple variant when no variants are supplied
    pub default_price: Option<f64>,
}

/// How a delete request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The rows were removed
    Deleted,
    /// Order history exists; the record was deactivated instead
    Deactivated,
}

/// Product detail aggregate for the admin edit surface.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    /// The product row
    pub product: product::Model,
    /// Associated categories, primary association first
    pub categories: Vec<CategoryAssociation>,
    /// All variants, stable id order
    pub variants: Vec<product_variant::Model>,
    /// All images, primary first
    pub images: Vec<product_image::Model>,
}

/// A category together with its primary flag for one product.
#[derive(Debug, Clone)]
pub struct CategoryAssociation {
    /// The category row
    pub category: crate::entities::category::Model,
    /// Whether this association is the product's primary one
    pub is_primary: bool,
}

/// Normalizes a client-supplied product name.
///
/// Buggy clients have been observed submitting serialized error payloads and
/// `[object Object]` strings as the name field. Rather than persisting the
/// garbage or failing the whole mutation, such names are replaced with a
/// recognizable placeholder and the incident is logged.
#[must_use]
pub fn sanitize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let looks_like_payload = trimmed.eq_ignore_ascii_case("[object Object]")
        || (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if trimmed.is_empty() || looks_like_payload {
        warn!("Unusable product name {:?}; substituting placeholder", raw);
        return "Untitled product".to_string();
    }
    trimmed.to_string()
}

async fn slug_taken<C: ConnectionTrait>(
    conn: &C,
    slug: &str,
    exclude_id: Option<i64>,
) -> Result<bool> {
    let mut query = Product::find().filter(product::Column::Slug.eq(slug));
    if let Some(id) = exclude_id {
        query = query.filter(product::Column::Id.ne(id));
    }
    Ok(query.one(conn).await?.is_some())
}

async fn store_images<B, C>(
    blobs: &B,
    conn: &C,
    product_id: i64,
    product_name: &str,
    images: &[ImageUpload],
    primary_index: Option<usize>,
) -> Result<Vec<product_image::Model>>
where
    B: BlobStore,
    C: ConnectionTrait,
{
    if let Some(index) = primary_index {
        if index >= images.len() {
            return Err(Error::Validation {
                message: format!(
                    "primary image index {index} is out of range for {} uploads",
                    images.len()
                ),
            });
        }
    }

    let has_existing_primary = ProductImage::find()
        .filter(product_image::Column::ProductId.eq(product_id))
        .filter(product_image::Column::IsPrimary.eq(true))
        .one(conn)
        .await?
        .is_some();

    // An explicit primary displaces whatever held the flag before; without
    // one, the first upload takes the flag only when nothing holds it yet.
    if primary_index.is_some() && has_existing_primary {
        ProductImage::update_many()
            .col_expr(
                product_image::Column::IsPrimary,
                sea_orm::sea_query::Expr::value(false),
            )
            .filter(product_image::Column::ProductId.eq(product_id))
            .exec(conn)
            .await?;
    }

    let primary = primary_index.unwrap_or(0);
    let mut stored = Vec::with_capacity(images.len());
    for (i, upload) in images.iter().enumerate() {
        let path = blobs
            .store(&upload.bytes, &upload.content_type, product_name)
            .await?;
        let is_primary = if primary_index.is_some() {
            i == primary
        } else {
            !has_existing_primary && i == 0
        };
        let model = product_image::ActiveModel {
            product_id: Set(product_id),
            storage_path: Set(path),
            is_primary: Set(is_primary),
            ..Default::default()
        };
        stored.push(model.insert(conn).await?);
    }
    Ok(stored)
}

/// Creates a product with its categories, variants, and images in one
/// transaction.
///
/// When neither an explicit variant set nor a matrix is supplied, a single
/// simple variant (no flavor, no weight) is created from `default_price` so
/// the at-least-one-variant invariant holds on commit.
///
/// # Errors
/// Returns `Conflict` when the derived slug is taken (no silent suffixing),
/// `Validation` when no categories are given or no variant source exists.
pub async fn create_product<B: BlobStore>(
    db: &DatabaseConnection,
    blobs: &B,
    input: ProductInput,
    sku_attempts: u32,
) -> Result<ProductDetail> {
    let name = sanitize_name(&input.name);
    let slug = super::slugify(&name);

    let txn = db.begin().await?;

    if slug_taken(&txn, &slug, None).await? {
        return Err(Error::Conflict {
            message: format!("product slug '{slug}' already exists"),
        });
    }

    let now = chrono::Utc::now();
    let model = product::ActiveModel {
        name: Set(name.clone()),
        slug: Set(slug),
        description: Set(input.description.clone()),
        is_supplement: Set(input.is_supplement),
        nutrition: Set(input.nutrition.clone()),
        is_featured: Set(input.is_featured),
        is_active: Set(input.is_active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = model.insert(&txn).await?;

    category::attach_categories(
        &txn,
        created.id,
        &input.category_ids,
        input.primary_category_id,
    )
    .await?;

    for v in &input.variants {
        let VariantInput::New { fields } = v else {
            return Err(Error::Validation {
                message: "a new product cannot reference persisted variant ids".to_string(),
            });
        };
        variant::create_variant_row(&txn, created.id, fields, sku_attempts).await?;
    }
    if let Some(matrix) = &input.matrix {
        variant::generate_matrix(
            &txn,
            created.id,
            &matrix.flavor_ids,
            &matrix.weight_ids,
            &matrix.defaults,
            sku_attempts,
        )
        .await?;
    }

    let variant_count = ProductVariant::find()
        .filter(product_variant::Column::ProductId.eq(created.id))
        .count(&txn)
        .await?;
    if variant_count == 0 {
        let price = input.default_price.ok_or(Error::Validation {
            message: "a product without variants needs a default price".to_string(),
        })?;
        let fields = VariantFields {
            price,
            ..Default::default()
        };
        variant::create_variant_row(&txn, created.id, &fields, sku_attempts).await?;
    }

    if !input.images.is_empty() {
        store_images(
            blobs,
            &txn,
            created.id,
            &name,
            &input.images,
            input.primary_image_index,
        )
        .await?;
    }

    let detail = load_detail_on(&txn, created.id).await?;
    txn.commit().await?;

    info!("Created product '{}' (ID: {})", detail.product.name, detail.product.id);
    Ok(detail)
}

/// Updates a product and reconciles its associations, variants, and images
/// in one transaction.
pub async fn update_product<B: BlobStore>(
    db: &DatabaseConnection,
    blobs: &B,
    product_id: i64,
    input: ProductInput,
    sku_attempts: u32,
) -> Result<ProductDetail> {
    let name = sanitize_name(&input.name);
    let slug = super::slugify(&name);

    let txn = db.begin().await?;

    let existing = Product::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "Product",
            key: product_id.to_string(),
        })?;

    if slug_taken(&txn, &slug, Some(product_id)).await? {
        return Err(Error::Conflict {
            message: format!("product slug '{slug}' already exists"),
        });
    }

    let mut model: product::ActiveModel = existing.into();
    model.name = Set(name.clone());
    model.slug = Set(slug);
    model.description = Set(input.description.clone());
    model.is_supplement = Set(input.is_supplement);
    model.nutrition = Set(input.nutrition.clone());
    model.is_featured = Set(input.is_featured);
    model.is_active = Set(input.is_active);
    model.updated_at = Set(chrono::Utc::now());
    model.update(&txn).await?;

    category::attach_categories(
        &txn,
        product_id,
        &input.category_ids,
        input.primary_category_id,
    )
    .await?;

    variant::reconcile(
        &txn,
        product_id,
        &input.variants,
        input.keep_variant_ids.as_deref(),
        sku_attempts,
    )
    .await?;
    if let Some(matrix) = &input.matrix {
        variant::generate_matrix(
            &txn,
            product_id,
            &matrix.flavor_ids,
            &matrix.weight_ids,
            &matrix.defaults,
            sku_attempts,
        )
        .await?;
    }

    if !input.images.is_empty() {
        store_images(
            blobs,
            &txn,
            product_id,
            &name,
            &input.images,
            input.primary_image_index,
        )
        .await?;
    }

    let detail = load_detail_on(&txn, product_id).await?;
    txn.commit().await?;
    Ok(detail)
}

/// Deletes a product, or deactivates it when any of its variants carries
/// order history.
///
/// Hard deletion removes inventory logs, variants, category associations,
/// image rows, and the product in one transaction; image blobs are deleted
/// best-effort with a cleanup record for any failure.
pub async fn delete_product<B: BlobStore>(
    db: &DatabaseConnection,
    blobs: &B,
    product_id: i64,
) -> Result<DeleteOutcome> {
    let txn = db.begin().await?;

    let existing = Product::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "Product",
            key: product_id.to_string(),
        })?;

    let variants = ProductVariant::find()
        .filter(product_variant::Column::ProductId.eq(product_id))
        .all(&txn)
        .await?;

    let mut has_history = false;
    for v in &variants {
        if variant::has_order_history(&txn, v.id).await? {
            has_history = true;
            break;
        }
    }

    if has_history {
        let mut model: product::ActiveModel = existing.into();
        model.is_active = Set(false);
        model.updated_at = Set(chrono::Utc::now());
        model.update(&txn).await?;
        for v in variants {
            let mut active: product_variant::ActiveModel = v.into();
            active.is_active = Set(false);
            active.update(&txn).await?;
        }
        txn.commit().await?;
        info!("Deactivated product {} (order history present)", product_id);
        return Ok(DeleteOutcome::Deactivated);
    }

    let images = ProductImage::find()
        .filter(product_image::Column::ProductId.eq(product_id))
        .all(&txn)
        .await?;
    for image in &images {
        best_effort_delete(blobs, &txn, &image.storage_path, "product delete").await?;
    }

    let variant_ids: Vec<i64> = variants.iter().map(|v| v.id).collect();
    if !variant_ids.is_empty() {
        InventoryLog::delete_many()
            .filter(inventory_log::Column::VariantId.is_in(variant_ids))
            .exec(&txn)
            .await?;
    }
    ProductVariant::delete_many()
        .filter(product_variant::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    ProductCategory::delete_many()
        .filter(product_category::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    ProductImage::delete_many()
        .filter(product_image::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    Product::delete_by_id(product_id).exec(&txn).await?;

    txn.commit().await?;
    info!("Deleted product '{}' (ID: {})", existing.name, product_id);
    Ok(DeleteOutcome::Deleted)
}

/// Moves the primary flag to one image of a product: clear-all-then-set-one.
pub async fn set_primary_image(
    db: &DatabaseConnection,
    product_id: i64,
    image_id: i64,
) -> Result<()> {
    use sea_orm::sea_query::Expr;

    let txn = db.begin().await?;

    let image = ProductImage::find_by_id(image_id)
        .one(&txn)
        .await?
        .filter(|i| i.product_id == product_id)
        .ok_or(Error::NotFound {
            entity: "Image",
            key: image_id.to_string(),
        })?;

    ProductImage::update_many()
        .col_expr(product_image::Column::IsPrimary, Expr::value(false))
        .filter(product_image::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;

    let mut model: product_image::ActiveModel = image.into();
    model.is_primary = Set(true);
    model.update(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Deletes one image of a product.
///
/// The last remaining image cannot be deleted. When the deleted image held
/// the primary flag, the flag moves to the first remaining image.
pub async fn delete_image<B: BlobStore>(
    db: &DatabaseConnection,
    blobs: &B,
    product_id: i64,
    image_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;

    let image = ProductImage::find_by_id(image_id)
        .one(&txn)
        .await?
        .filter(|i| i.product_id == product_id)
        .ok_or(Error::NotFound {
            entity: "Image",
            key: image_id.to_string(),
        })?;

    let sibling_count = ProductImage::find()
        .filter(product_image::Column::ProductId.eq(product_id))
        .count(&txn)
        .await?;
    if sibling_count <= 1 {
        return Err(Error::InvariantViolation {
            message: "cannot delete a product's last remaining image".to_string(),
        });
    }

    let was_primary = image.is_primary;
    let storage_path = image.storage_path.clone();
    ProductImage::delete_by_id(image_id).exec(&txn).await?;

    if was_primary {
        let successor = ProductImage::find()
            .filter(product_image::Column::ProductId.eq(product_id))
            .order_by_asc(product_image::Column::Id)
            .one(&txn)
            .await?;
        if let Some(successor) = successor {
            let mut model: product_image::ActiveModel = successor.into();
            model.is_primary = Set(true);
            model.update(&txn).await?;
        }
    }

    best_effort_delete(blobs, &txn, &storage_path, "image delete").await?;

    txn.commit().await?;
    Ok(())
}

async fn load_detail_on<C: ConnectionTrait>(conn: &C, product_id: i64) -> Result<ProductDetail> {
    let model = Product::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or(Error::NotFound {
            entity: "Product",
            key: product_id.to_string(),
        })?;

    let associations = ProductCategory::find()
        .filter(product_category::Column::ProductId.eq(product_id))
        .order_by_desc(product_category::Column::IsPrimary)
        .order_by_asc(product_category::Column::Id)
        .all(conn)
        .await?;
    let mut categories = Vec::with_capacity(associations.len());
    for assoc in associations {
        if let Some(cat) = category::get_category_by_id(conn, assoc.category_id).await? {
            categories.push(CategoryAssociation {
                category: cat,
                is_primary: assoc.is_primary,
            });
        }
    }

    let variants = ProductVariant::find()
        .filter(product_variant::Column::ProductId.eq(product_id))
        .order_by_asc(product_variant::Column::Id)
        .all(conn)
        .await?;

    let images = ProductImage::find()
        .filter(product_image::Column::ProductId.eq(product_id))
        .order_by_desc(product_image::Column::IsPrimary)
        .order_by_asc(product_image::Column::Id)
        .all(conn)
        .await?;

    Ok(ProductDetail {
        product: model,
        categories,
        variants,
        images,
    })
}

/// Loads the full product aggregate for the admin edit surface.
pub async fn load_product_detail(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<ProductDetail> {
    load_detail_on(db, product_id).await
}
