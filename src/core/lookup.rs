//! Flavor and weight reference values.
//!
//! These are small independent lookup tables referenced, never owned, by
//! variants. Deleting a value that variants still reference is rejected.

use crate::{
    entities::{Flavor, ProductVariant, Weight, flavor, product_variant, weight},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Retrieves all flavors ordered alphabetically by name.
pub async fn list_flavors(db: &DatabaseConnection) -> Result<Vec<flavor::Model>> {
    Flavor::find()
        .order_by_asc(flavor::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a flavor by id.
pub async fn get_flavor_by_id<C: ConnectionTrait>(
    conn: &C,
    flavor_id: i64,
) -> Result<Option<flavor::Model>> {
    Flavor::find_by_id(flavor_id).one(conn).await.map_err(Into::into)
}

/// Creates a new flavor.
///
/// # Errors
/// Returns `Validation` for an empty name and `Conflict` for a duplicate.
pub async fn create_flavor(db: &DatabaseConnection, name: String) -> Result<flavor::Model> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Flavor name cannot be empty".to_string(),
        });
    }

    let taken = Flavor::find()
        .filter(flavor::Column::Name.eq(&name))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(Error::Conflict {
            message: format!("flavor '{name}' already exists"),
        });
    }

    let model = flavor::ActiveModel {
        name: Set(name),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Deletes a flavor unless any variant still references it.
pub async fn delete_flavor(db: &DatabaseConnection, flavor_id: i64) -> Result<()> {
    let existing = get_flavor_by_id(db, flavor_id).await?.ok_or(Error::NotFound {
        entity: "Flavor",
        key: flavor_id.to_string(),
    })?;

    let in_use = ProductVariant::find()
        .filter(product_variant::Column::FlavorId.eq(flavor_id))
        .count(db)
        .await?;
    if in_use > 0 {
        return Err(Error::InvariantViolation {
            message: format!("flavor '{}' is referenced by {in_use} variants", existing.name),
        });
    }

    Flavor::delete_by_id(flavor_id).exec(db).await?;
    Ok(())
}

/// Retrieves all weights ordered by numeric value.
pub async fn list_weights(db: &DatabaseConnection) -> Result<Vec<weight::Model>> {
    Weight::find()
        .order_by_asc(weight::Column::Value)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a weight by id.
pub async fn get_weight_by_id<C: ConnectionTrait>(
    conn: &C,
    weight_id: i64,
) -> Result<Option<weight::Model>> {
    Weight::find_by_id(weight_id).one(conn).await.map_err(Into::into)
}

/// Creates a new weight, unique by its (value, unit) natural key.
///
/// # Errors
/// Returns `Validation` for a non-positive value or empty unit and
/// `Conflict` for a duplicate pair.
pub async fn create_weight(
    db: &DatabaseConnection,
    value: f64,
    unit: String,
) -> Result<weight::Model> {
    let unit = unit.trim().to_string();
    if unit.is_empty() {
        return Err(Error::Validation {
            message: "Weight unit cannot be empty".to_string(),
        });
    }
    if !(value.is_finite() && value > 0.0) {
        return Err(Error::Validation {
            message: format!("Weight value must be positive, got {value}"),
        });
    }

    let taken = Weight::find()
        .filter(weight::Column::Value.eq(value))
        .filter(weight::Column::Unit.eq(&unit))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(Error::Conflict {
            message: format!("weight {value}{unit} already exists"),
        });
    }

    let model = weight::ActiveModel {
        value: Set(value),
        unit: Set(unit),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Deletes a weight unless any variant still references it.
pub async fn delete_weight(db: &DatabaseConnection, weight_id: i64) -> Result<()> {
    let existing = get_weight_by_id(db, weight_id).await?.ok_or(Error::NotFound {
        entity: "Weight",
        key: weight_id.to_string(),
    })?;

    let in_use = ProductVariant::find()
        .filter(product_variant::Column::WeightId.eq(weight_id))
        .count(db)
        .await?;
    if in_use > 0 {
        return Err(Error::InvariantViolation {
            message: format!(
                "weight {}{} is referenced by {in_use} variants",
                existing.value, existing.unit
            ),
        });
    }

    Weight::delete_by_id(weight_id).exec(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_flavor_create_and_duplicate() -> Result<()> {
        let db = setup_test_db().await?;

        let vanilla = create_flavor(&db, " Vanilla ".to_string()).await?;
        assert_eq!(vanilla.name, "Vanilla");

        let dup = create_flavor(&db, "Vanilla".to_string()).await;
        assert!(matches!(dup.unwrap_err(), Error::Conflict { .. }));

        let empty = create_flavor(&db, "  ".to_string()).await;
        assert!(matches!(empty.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_weight_validation_and_duplicate() -> Result<()> {
        let db = setup_test_db().await?;

        let w = create_weight(&db, 500.0, "g".to_string()).await?;
        assert_eq!(w.value, 500.0);
        assert_eq!(w.unit, "g");

        let dup = create_weight(&db, 500.0, "g".to_string()).await;
        assert!(matches!(dup.unwrap_err(), Error::Conflict { .. }));

        // Same value with a different unit is a distinct natural key
        create_weight(&db, 500.0, "mg".to_string()).await?;

        let bad = create_weight(&db, -1.0, "g".to_string()).await;
        assert!(matches!(bad.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_in_use_lookup_rejected() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let vanilla = create_flavor(&db, "Vanilla".to_string()).await?;

        let variant = create_test_variant(&db, product.id, "SKU-LOOKUP-1").await?;
        let mut active: crate::entities::product_variant::ActiveModel = variant.into();
        active.flavor_id = Set(Some(vanilla.id));
        active.update(&db).await?;

        let result = delete_flavor(&db, vanilla.id).await;
        assert!(matches!(result.unwrap_err(), Error::InvariantViolation { .. }));

        // Unreferenced values delete fine
        let chocolate = create_flavor(&db, "Chocolate".to_string()).await?;
        delete_flavor(&db, chocolate.id).await?;
        assert!(get_flavor_by_id(&db, chocolate.id).await?.is_none());
        Ok(())
    }
}
