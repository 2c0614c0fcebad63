//! Category hierarchy management.
//!
//! Maintains the category tree and the per-product primary-category
//! invariant: at most one association per product is marked primary, and a
//! wholesale replacement of a product's category set happens inside the
//! caller's transaction.

use crate::{
    entities::{Category, ProductCategory, category, product_category},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Retrieves all categories ordered alphabetically by name.
pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>> {
    Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a category by id.
pub async fn get_category_by_id<C: ConnectionTrait>(
    conn: &C,
    category_id: i64,
) -> Result<Option<category::Model>> {
    Category::find_by_id(category_id)
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Creates a new category, deriving the slug from the name.
///
/// # Errors
/// Returns `Validation` for an empty name, `NotFound` for a missing parent,
/// and `Conflict` when the name or slug is already taken.
pub async fn create_category(
    db: &DatabaseConnection,
    name: String,
    parent_id: Option<i64>,
    image_path: Option<String>,
) -> Result<category::Model> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Category name cannot be empty".to_string(),
        });
    }

    if let Some(parent_id) = parent_id {
        get_category_by_id(db, parent_id)
            .await?
            .ok_or(Error::NotFound {
                entity: "Category",
                key: parent_id.to_string(),
            })?;
    }

    let slug = super::slugify(&name);
    let taken = Category::find()
        .filter(
            category::Column::Name
                .eq(&name)
                .or(category::Column::Slug.eq(&slug)),
        )
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(Error::Conflict {
            message: format!("category name or slug '{name}' already exists"),
        });
    }

    let model = category::ActiveModel {
        name: Set(name),
        slug: Set(slug),
        parent_id: Set(parent_id),
        image_path: Set(image_path),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Walks the ancestor chain of `start_id` and returns true when `needle`
/// appears in it. Bounded by the tree size; a malformed cycle in stored data
/// terminates via the visited set rather than looping.
async fn is_ancestor<C: ConnectionTrait>(conn: &C, needle: i64, start_id: i64) -> Result<bool> {
    let mut visited = std::collections::HashSet::new();
    let mut current = Some(start_id);
    while let Some(id) = current {
        if id == needle {
            return Ok(true);
        }
        if !visited.insert(id) {
            break;
        }
        current = get_category_by_id(conn, id).await?.and_then(|c| c.parent_id);
    }
    Ok(false)
}

/// Updates a category's name and parent.
///
/// Rejects a parent assignment equal to the category's own id and any parent
/// that is a descendant of the category (full ancestor walk, covering the
/// deeper cycles the direct self-parent check misses).
///
/// # Errors
/// Returns `NotFound` for a missing category or parent, `InvariantViolation`
/// for a cycle, `Conflict` for a name/slug collision.
pub async fn update_category(
    db: &DatabaseConnection,
    category_id: i64,
    new_name: String,
    new_parent_id: Option<i64>,
) -> Result<category::Model> {
    let new_name = new_name.trim().to_string();
    if new_name.is_empty() {
        return Err(Error::Validation {
            message: "Category name cannot be empty".to_string(),
        });
    }

    let existing = get_category_by_id(db, category_id)
        .await?
        .ok_or(Error::NotFound {
            entity: "Category",
            key: category_id.to_string(),
        })?;

    if let Some(parent_id) = new_parent_id {
        if parent_id == category_id {
            return Err(Error::InvariantViolation {
                message: "a category cannot be its own parent".to_string(),
            });
        }
        get_category_by_id(db, parent_id)
            .await?
            .ok_or(Error::NotFound {
                entity: "Category",
                key: parent_id.to_string(),
            })?;
        if is_ancestor(db, category_id, parent_id).await? {
            return Err(Error::InvariantViolation {
                message: "a category cannot be moved under its own descendant".to_string(),
            });
        }
    }

    let slug = super::slugify(&new_name);
    let taken = Category::find()
        .filter(
            category::Column::Name
                .eq(&new_name)
                .or(category::Column::Slug.eq(&slug)),
        )
        .filter(category::Column::Id.ne(category_id))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(Error::Conflict {
            message: format!("category name or slug '{new_name}' already exists"),
        });
    }

    let mut model: category::ActiveModel = existing.into();
    model.name = Set(new_name);
    model.slug = Set(slug);
    model.parent_id = Set(new_parent_id);
    model.update(db).await.map_err(Into::into)
}

/// Deletes a category.
///
/// # Errors
/// Returns `InvariantViolation` when the category still has children, and
/// `NotFound` when it does not exist. Product associations pointing at the
/// category are removed in the same transaction.
pub async fn delete_category(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let existing = get_category_by_id(&txn, category_id)
        .await?
        .ok_or(Error::NotFound {
            entity: "Category",
            key: category_id.to_string(),
        })?;

    let child_count = Category::find()
        .filter(category::Column::ParentId.eq(category_id))
        .count(&txn)
        .await?;
    if child_count > 0 {
        return Err(Error::InvariantViolation {
            message: format!(
                "category '{}' still has {} child categories",
                existing.name, child_count
            ),
        });
    }

    ProductCategory::delete_many()
        .filter(product_category::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;
    Category::delete_by_id(category_id).exec(&txn).await?;

    txn.commit().await?;
    info!("Deleted category '{}' (ID: {})", existing.name, category_id);
    Ok(())
}

/// Replaces a product's category set wholesale inside the caller's
/// transaction.
///
/// Every id must exist. The primary association is the explicitly supplied
/// id when present (which must be part of the set), else the first id by
/// convention. Previous associations are deleted and replaced atomically
/// with respect to `conn`.
///
/// # Errors
/// Returns `Validation` for an empty set or a primary id outside the set,
/// `NotFound` for an unknown category id.
pub async fn attach_categories<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    category_ids: &[i64],
    primary_id: Option<i64>,
) -> Result<Vec<product_category::Model>> {
    if category_ids.is_empty() {
        return Err(Error::Validation {
            message: "a product needs at least one category".to_string(),
        });
    }

    for &category_id in category_ids {
        get_category_by_id(conn, category_id)
            .await?
            .ok_or(Error::NotFound {
                entity: "Category",
                key: category_id.to_string(),
            })?;
    }

    let primary = match primary_id {
        Some(id) if category_ids.contains(&id) => id,
        Some(id) => {
            return Err(Error::Validation {
                message: format!("primary category {id} is not part of the category set"),
            });
        }
        None => category_ids[0],
    };

    ProductCategory::delete_many()
        .filter(product_category::Column::ProductId.eq(product_id))
        .exec(conn)
        .await?;

    let mut associations = Vec::with_capacity(category_ids.len());
    for &category_id in category_ids {
        let model = product_category::ActiveModel {
            product_id: Set(product_id),
            category_id: Set(category_id),
            is_primary: Set(category_id == primary),
            ..Default::default()
        };
        associations.push(model.insert(conn).await?);
    }
    Ok(associations)
}

/// Moves the primary flag to one association of a product without touching
/// the rest of the set: clear-all-then-set-one, preserving the at-most-one
/// invariant.
pub async fn set_primary_category(
    db: &DatabaseConnection,
    product_id: i64,
    category_id: i64,
) -> Result<()> {
    use sea_orm::sea_query::Expr;

    let txn = db.begin().await?;

    let association = ProductCategory::find()
        .filter(product_category::Column::ProductId.eq(product_id))
        .filter(product_category::Column::CategoryId.eq(category_id))
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "Category association",
            key: format!("product {product_id} / category {category_id}"),
        })?;

    ProductCategory::update_many()
        .col_expr(product_category::Column::IsPrimary, Expr::value(false))
        .filter(product_category::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;

    let mut model: product_category::ActiveModel = association.into();
    model.is_primary = Set(true);
    model.update(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Resolves the product's primary category name, falling back to the first
/// association by convention when none is flagged. Used by the SKU resolver.
pub async fn primary_category_name<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
) -> Result<Option<String>> {
    let associations = ProductCategory::find()
        .filter(product_category::Column::ProductId.eq(product_id))
        .order_by_asc(product_category::Column::Id)
        .all(conn)
        .await?;

    let chosen = associations
        .iter()
        .find(|a| a.is_primary)
        .or_else(|| associations.first());

    match chosen {
        Some(assoc) => Ok(get_category_by_id(conn, assoc.category_id)
            .await?
            .map(|c| c.name)),
        None => Ok(None),
    }
}
