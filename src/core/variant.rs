//! Variant reconciliation engine.
//!
//! Diffs an incoming variant set against the persisted variants of a
//! product and decides create / update / delete per element. Client payloads
//! are parsed exactly once at the boundary into the tagged [`VariantInput`]
//! union; nothing below this module branches on ad hoc id string prefixes.
//!
//! Deletion precedence: when the caller supplies an explicit keep list, that
//! list alone decides which persisted variants survive, guarding against a
//! desynchronized client whose incoming array lags behind reality. Without a
//! keep list, the persisted ids mentioned in the incoming array survive.

use crate::{
    core::{lookup, sku},
    entities::{
        OrderItem, Product, ProductVariant, order_item, product_variant,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{debug, info};

/// Field values common to persisted and new variants.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantFields {
    /// Optional flavor reference
    pub flavor_id: Option<i64>,
    /// Optional weight reference
    pub weight_id: Option<i64>,
    /// Caller-supplied SKU; empty/placeholder values trigger generation
    pub sku: Option<String>,
    /// Regular price
    pub price: f64,
    /// Optional discounted price
    pub sale_price: Option<f64>,
    /// Initial stock quantity (creates only; the ledger owns it afterwards)
    pub quantity: i32,
    /// Active flag
    pub is_active: bool,
}

impl Default for VariantFields {
    fn default() -> Self {
        Self {
            flavor_id: None,
            weight_id: None,
            sku: None,
            price: 0.0,
            sale_price: None,
            quantity: 0,
            is_active: true,
        }
    }
}

/// One incoming variant, already resolved to persisted-or-new at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantInput {
    /// Carries the id of an existing variant of this product
    Persisted {
        /// Persisted variant id
        id: i64,
        /// Field values to apply
        fields: VariantFields,
    },
    /// No persisted id; a row will be created
    New {
        /// Field values to apply
        fields: VariantFields,
    },
}

impl VariantInput {
    fn fields(&self) -> &VariantFields {
        match self {
            Self::Persisted { fields, .. } | Self::New { fields } => fields,
        }
    }
}

/// Wire shape of one variant element as clients send it. The `id` may be a
/// number, a numeric string, a client-local temporary string, or absent.
#[derive(Debug, Clone, Deserialize)]
struct RawVariant {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    flavor_id: Option<i64>,
    #[serde(default)]
    weight_id: Option<i64>,
    #[serde(default)]
    sku: Option<String>,
    price: f64,
    #[serde(default)]
    sale_price: Option<f64>,
    #[serde(default)]
    quantity: i32,
    #[serde(default = "default_active")]
    is_active: bool,
}

const fn default_active() -> bool {
    true
}

fn resolve_raw_id(id: Option<&serde_json::Value>) -> Option<i64> {
    match id {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        // Numeric strings are persisted ids; anything else ("tmp-3", "new-1",
        // uuid debris) is a client-local marker for a new variant.
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    }
}

/// Parses a raw variant payload into the tagged union.
///
/// Accepts either a JSON array or a string containing an encoded JSON array
/// (some clients double-encode the field). This is the only place where the
/// "new vs persisted id" convention is interpreted.
///
/// # Errors
/// Returns `Validation` when the payload is not an array of variant objects.
pub fn parse_variant_payload(payload: &serde_json::Value) -> Result<Vec<VariantInput>> {
    let decoded;
    let array = match payload {
        serde_json::Value::String(s) => {
            decoded = serde_json::from_str::<serde_json::Value>(s).map_err(|e| {
                Error::Validation {
                    message: format!("variant payload is not valid JSON: {e}"),
                }
            })?;
            &decoded
        }
        other => other,
    };

    let items = array.as_array().ok_or_else(|| Error::Validation {
        message: "variant payload must be an array".to_string(),
    })?;

    let mut inputs = Vec::with_capacity(items.len());
    for item in items {
        let raw: RawVariant =
            serde_json::from_value(item.clone()).map_err(|e| Error::Validation {
                message: format!("malformed variant element: {e}"),
            })?;
        let fields = VariantFields {
            flavor_id: raw.flavor_id,
            weight_id: raw.weight_id,
            sku: raw.sku,
            price: raw.price,
            sale_price: raw.sale_price,
            quantity: raw.quantity,
            is_active: raw.is_active,
        };
        inputs.push(match resolve_raw_id(raw.id.as_ref()) {
            Some(id) => VariantInput::Persisted { id, fields },
            None => VariantInput::New { fields },
        });
    }
    Ok(inputs)
}

fn validate_fields(fields: &VariantFields) -> Result<()> {
    if !(fields.price.is_finite() && fields.price > 0.0) {
        return Err(Error::Validation {
            message: format!("variant price must be positive, got {}", fields.price),
        });
    }
    if let Some(sale) = fields.sale_price {
        if !(sale.is_finite() && sale > 0.0) {
            return Err(Error::Validation {
                message: format!("sale price must be positive, got {sale}"),
            });
        }
    }
    if fields.quantity < 0 {
        return Err(Error::Validation {
            message: format!("initial quantity cannot be negative, got {}", fields.quantity),
        });
    }
    Ok(())
}

async fn validate_references<C: ConnectionTrait>(conn: &C, fields: &VariantFields) -> Result<()> {
    if let Some(flavor_id) = fields.flavor_id {
        lookup::get_flavor_by_id(conn, flavor_id)
            .await?
            .ok_or(Error::NotFound {
                entity: "Flavor",
                key: flavor_id.to_string(),
            })?;
    }
    if let Some(weight_id) = fields.weight_id {
        lookup::get_weight_by_id(conn, weight_id)
            .await?
            .ok_or(Error::NotFound {
                entity: "Weight",
                key: weight_id.to_string(),
            })?;
    }
    Ok(())
}

/// Checks the (product, flavor, weight) uniqueness invariant against the
/// persisted set, optionally excluding one variant (the one being updated).
async fn combo_taken<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    flavor_id: Option<i64>,
    weight_id: Option<i64>,
    exclude_id: Option<i64>,
) -> Result<bool> {
    let mut query = ProductVariant::find()
        .filter(product_variant::Column::ProductId.eq(product_id));
    query = match flavor_id {
        Some(id) => query.filter(product_variant::Column::FlavorId.eq(id)),
        None => query.filter(product_variant::Column::FlavorId.is_null()),
    };
    query = match weight_id {
        Some(id) => query.filter(product_variant::Column::WeightId.eq(id)),
        None => query.filter(product_variant::Column::WeightId.is_null()),
    };
    if let Some(exclude) = exclude_id {
        query = query.filter(product_variant::Column::Id.ne(exclude));
    }
    Ok(query.one(conn).await?.is_some())
}

fn combo_label(flavor_id: Option<i64>, weight_id: Option<i64>) -> String {
    format!(
        "flavor {} / weight {}",
        flavor_id.map_or("none".to_string(), |id| id.to_string()),
        weight_id.map_or("none".to_string(), |id| id.to_string())
    )
}

/// Builds the SKU naming context and creates one variant row.
pub(crate) async fn create_variant_row<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    fields: &VariantFields,
    sku_attempts: u32,
) -> Result<product_variant::Model> {
    validate_fields(fields)?;
    validate_references(conn, fields).await?;

    if combo_taken(conn, product_id, fields.flavor_id, fields.weight_id, None).await? {
        return Err(Error::Conflict {
            message: format!(
                "product {product_id} already has a variant with {}",
                combo_label(fields.flavor_id, fields.weight_id)
            ),
        });
    }

    let product = Product::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or(Error::NotFound {
            entity: "Product",
            key: product_id.to_string(),
        })?;
    let category_name = super::category::primary_category_name(conn, product_id).await?;
    let flavor = match fields.flavor_id {
        Some(id) => lookup::get_flavor_by_id(conn, id).await?,
        None => None,
    };
    let weight = match fields.weight_id {
        Some(id) => lookup::get_weight_by_id(conn, id).await?,
        None => None,
    };

    let ctx = sku::SkuContext {
        product_name: &product.name,
        category_name: category_name.as_deref(),
        flavor_name: flavor.as_ref().map(|f| f.name.as_str()),
        weight: weight.as_ref().map(|w| (w.value, w.unit.as_str())),
    };
    let sku = sku::generate(conn, &ctx, fields.sku.as_deref(), sku_attempts).await?;

    let model = product_variant::ActiveModel {
        product_id: Set(product_id),
        flavor_id: Set(fields.flavor_id),
        weight_id: Set(fields.weight_id),
        sku: Set(sku),
        price: Set(fields.price),
        sale_price: Set(fields.sale_price),
        quantity: Set(fields.quantity),
        is_active: Set(fields.is_active),
        ..Default::default()
    };
    model.insert(conn).await.map_err(Into::into)
}

/// Whether a variant appears in any completed order item.
pub(crate) async fn has_order_history<C: ConnectionTrait>(
    conn: &C,
    variant_id: i64,
) -> Result<bool> {
    Ok(OrderItem::find()
        .filter(order_item::Column::VariantId.eq(variant_id))
        .count(conn)
        .await?
        > 0)
}

/// Reconciles the incoming variant set against the persisted one.
///
/// - `Persisted` elements update their row (flavor/weight changes re-check
///   the combo invariant; an id unknown to this product is `NotFound`).
/// - `New` elements create rows, generating SKUs as needed.
/// - Persisted variants absent from the survivor set are deleted: hard when
///   they carry no order history, soft (`is_active = false`) otherwise.
/// - When `keep_ids` is `Some`, it alone determines survivors; the incoming
///   array's omissions are ignored for deletion purposes.
///
/// Quantity on `Persisted` elements is deliberately ignored; quantity moves
/// only through the inventory ledger.
///
/// # Errors
/// Returns `InvariantViolation` when the result would leave the product with
/// zero variants.
pub async fn reconcile<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    incoming: &[VariantInput],
    keep_ids: Option<&[i64]>,
    sku_attempts: u32,
) -> Result<Vec<product_variant::Model>> {
    let existing = ProductVariant::find()
        .filter(product_variant::Column::ProductId.eq(product_id))
        .order_by_asc(product_variant::Column::Id)
        .all(conn)
        .await?;

    for input in incoming {
        validate_fields(input.fields())?;
        if let VariantInput::Persisted { id, .. } = input {
            if !existing.iter().any(|v| v.id == *id) {
                return Err(Error::NotFound {
                    entity: "Variant",
                    key: id.to_string(),
                });
            }
        }
    }

    // Survivor set: explicit keep list wins over the incoming array.
    let survivors: Vec<i64> = match keep_ids {
        Some(ids) => existing
            .iter()
            .map(|v| v.id)
            .filter(|id| ids.contains(id))
            .collect(),
        None => incoming
            .iter()
            .filter_map(|input| match input {
                VariantInput::Persisted { id, .. } => Some(*id),
                VariantInput::New { .. } => None,
            })
            .collect(),
    };

    let doomed: Vec<&product_variant::Model> = existing
        .iter()
        .filter(|v| !survivors.contains(&v.id))
        .collect();
    let creations = incoming
        .iter()
        .filter(|i| matches!(i, VariantInput::New { .. }))
        .count();

    if survivors.len() + creations == 0 && !existing.is_empty() {
        return Err(Error::InvariantViolation {
            message: "cannot delete a product's last remaining variant".to_string(),
        });
    }

    // Deletions first so a re-created combination does not collide.
    for variant in doomed {
        if has_order_history(conn, variant.id).await? {
            debug!(
                "Variant {} has order history; deactivating instead of deleting",
                variant.id
            );
            let mut active: product_variant::ActiveModel = variant.clone().into();
            active.is_active = Set(false);
            active.update(conn).await?;
        } else {
            ProductVariant::delete_by_id(variant.id).exec(conn).await?;
        }
    }

    // Updates.
    for input in incoming {
        let VariantInput::Persisted { id, fields } = input else {
            continue;
        };
        let Some(current) = existing.iter().find(|v| v.id == *id) else {
            return Err(Error::NotFound {
                entity: "Variant",
                key: id.to_string(),
            });
        };
        if !survivors.contains(id) {
            // The keep list already doomed this row; skip the update.
            continue;
        }

        validate_references(conn, fields).await?;
        let combo_changed =
            current.flavor_id != fields.flavor_id || current.weight_id != fields.weight_id;
        if combo_changed
            && combo_taken(conn, product_id, fields.flavor_id, fields.weight_id, Some(*id)).await?
        {
            return Err(Error::Conflict {
                message: format!(
                    "product {product_id} already has a variant with {}",
                    combo_label(fields.flavor_id, fields.weight_id)
                ),
            });
        }

        let mut active: product_variant::ActiveModel = current.clone().into();
        active.flavor_id = Set(fields.flavor_id);
        active.weight_id = Set(fields.weight_id);
        active.price = Set(fields.price);
        active.sale_price = Set(fields.sale_price);
        active.is_active = Set(fields.is_active);
        match fields.sku.as_deref() {
            Some(supplied) if !sku::is_placeholder(supplied) => {
                let supplied = supplied.trim();
                if supplied != current.sku {
                    if ProductVariant::find()
                        .filter(product_variant::Column::Sku.eq(supplied))
                        .filter(product_variant::Column::Id.ne(*id))
                        .one(conn)
                        .await?
                        .is_some()
                    {
                        return Err(Error::Conflict {
                            message: format!("SKU '{supplied}' is already in use"),
                        });
                    }
                    active.sku = Set(supplied.to_string());
                }
            }
            _ => {
                // Placeholder or absent: keep the current SKU unless the
                // combination changed, in which case the variant is renamed
                // and gets a freshly generated identifier.
                if combo_changed {
                    let product = Product::find_by_id(product_id)
                        .one(conn)
                        .await?
                        .ok_or(Error::NotFound {
                            entity: "Product",
                            key: product_id.to_string(),
                        })?;
                    let category_name =
                        super::category::primary_category_name(conn, product_id).await?;
                    let flavor = match fields.flavor_id {
                        Some(fid) => lookup::get_flavor_by_id(conn, fid).await?,
                        None => None,
                    };
                    let weight = match fields.weight_id {
                        Some(wid) => lookup::get_weight_by_id(conn, wid).await?,
                        None => None,
                    };
                    let ctx = sku::SkuContext {
                        product_name: &product.name,
                        category_name: category_name.as_deref(),
                        flavor_name: flavor.as_ref().map(|f| f.name.as_str()),
                        weight: weight.as_ref().map(|w| (w.value, w.unit.as_str())),
                    };
                    active.sku = Set(sku::generate(conn, &ctx, None, sku_attempts).await?);
                }
            }
        }
        active.update(conn).await?;
    }

    // Creations.
    for input in incoming {
        if let VariantInput::New { fields } = input {
            create_variant_row(conn, product_id, fields, sku_attempts).await?;
        }
    }

    ProductVariant::find()
        .filter(product_variant::Column::ProductId.eq(product_id))
        .order_by_asc(product_variant::Column::Id)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Default field values for matrix-generated variants.
#[derive(Debug, Clone)]
pub struct MatrixDefaults {
    /// Price applied to every generated variant
    pub price: f64,
    /// Optional sale price applied to every generated variant
    pub sale_price: Option<f64>,
    /// Initial quantity for every generated variant
    pub quantity: i32,
}

impl Default for MatrixDefaults {
    fn default() -> Self {
        Self {
            price: 0.0,
            sale_price: None,
            quantity: 0,
        }
    }
}

/// Generates variants from flavor and weight selections.
///
/// Both axes selected yields the Cartesian product; a single axis yields one
/// variant per element with the other axis null. Combinations the product
/// already has are skipped silently.
///
/// # Errors
/// Returns `Validation` when both selections are empty.
pub async fn generate_matrix<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    flavor_ids: &[i64],
    weight_ids: &[i64],
    defaults: &MatrixDefaults,
    sku_attempts: u32,
) -> Result<Vec<product_variant::Model>> {
    if flavor_ids.is_empty() && weight_ids.is_empty() {
        return Err(Error::Validation {
            message: "variant generation needs at least one flavor or weight".to_string(),
        });
    }

    let combos: Vec<(Option<i64>, Option<i64>)> = if weight_ids.is_empty() {
        flavor_ids.iter().map(|&f| (Some(f), None)).collect()
    } else if flavor_ids.is_empty() {
        weight_ids.iter().map(|&w| (None, Some(w))).collect()
    } else {
        flavor_ids
            .iter()
            .flat_map(|&f| weight_ids.iter().map(move |&w| (Some(f), Some(w))))
            .collect()
    };

    let mut created = Vec::new();
    for (flavor_id, weight_id) in combos {
        if combo_taken(conn, product_id, flavor_id, weight_id, None).await? {
            debug!(
                "Skipping existing combination {} for product {}",
                combo_label(flavor_id, weight_id),
                product_id
            );
            continue;
        }
        let fields = VariantFields {
            flavor_id,
            weight_id,
            sku: None,
            price: defaults.price,
            sale_price: defaults.sale_price,
            quantity: defaults.quantity,
            is_active: true,
        };
        created.push(create_variant_row(conn, product_id, &fields, sku_attempts).await?);
    }

    info!(
        "Generated {} variants for product {} from {}x{} selections",
        created.len(),
        product_id,
        flavor_ids.len().max(1),
        weight_ids.len().max(1)
    );
    Ok(created)
}

/// Deletes one variant as a standalone administrative operation.
///
/// Mirrors the product-level policy: a variant with order history is
/// deactivated instead of removed, and the product's last remaining variant
/// cannot be deleted at all.
pub async fn delete_variant(
    db: &DatabaseConnection,
    variant_id: i64,
) -> Result<super::product::DeleteOutcome> {
    use super::product::DeleteOutcome;

    let txn = db.begin().await?;

    let variant = ProductVariant::find_by_id(variant_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "Variant",
            key: variant_id.to_string(),
        })?;

    let sibling_count = ProductVariant::find()
        .filter(product_variant::Column::ProductId.eq(variant.product_id))
        .count(&txn)
        .await?;
    if sibling_count <= 1 {
        return Err(Error::InvariantViolation {
            message: "cannot delete a product's last remaining variant".to_string(),
        });
    }

    let outcome = if has_order_history(&txn, variant_id).await? {
        let mut active: product_variant::ActiveModel = variant.into();
        active.is_active = Set(false);
        active.update(&txn).await?;
        DeleteOutcome::Deactivated
    } else {
        ProductVariant::delete_by_id(variant_id).exec(&txn).await?;
        DeleteOutcome::Deleted
    };

    txn.commit().await?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::product::DeleteOutcome;
    use crate::test_utils::*;
    use serde_json::json;

    #[test]
    fn test_parse_structured_array() -> Result<()> {
        let payload = json!([
            { "id": 7, "price": 19.99, "quantity": 3 },
            { "id": "12", "price": 9.99 },
            { "id": "tmp-1", "price": 5.0 },
            { "price": 4.5, "sku": "EXPLICIT-1" }
        ]);
        let inputs = parse_variant_payload(&payload)?;
        assert_eq!(inputs.len(), 4);
        assert!(matches!(inputs[0], VariantInput::Persisted { id: 7, .. }));
        assert!(matches!(inputs[1], VariantInput::Persisted { id: 12, .. }));
        assert!(matches!(inputs[2], VariantInput::New { .. }));
        match &inputs[3] {
            VariantInput::New { fields } => {
                assert_eq!(fields.sku.as_deref(), Some("EXPLICIT-1"));
                assert!(fields.is_active);
            }
            other => panic!("expected New, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_parse_string_encoded_array() -> Result<()> {
        let payload = json!("[{\"id\": \"new-2\", \"price\": 3.0}]");
        let inputs = parse_variant_payload(&payload)?;
        assert_eq!(inputs.len(), 1);
        assert!(matches!(inputs[0], VariantInput::New { .. }));
        Ok(())
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let not_array = json!({ "price": 1.0 });
        assert!(matches!(
            parse_variant_payload(&not_array).unwrap_err(),
            Error::Validation { .. }
        ));

        let bad_string = json!("{not json");
        assert!(matches!(
            parse_variant_payload(&bad_string).unwrap_err(),
            Error::Validation { .. }
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_combo() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let vanilla = create_test_flavor(&db, "Vanilla").await?;

        let fields = VariantFields {
            flavor_id: Some(vanilla.id),
            price: 10.0,
            ..Default::default()
        };
        create_variant_row(&db, product.id, &fields, 5).await?;

        let dup = create_variant_row(&db, product.id, &fields, 5).await;
        assert!(matches!(dup.unwrap_err(), Error::Conflict { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_simple_variant_limited_to_one() -> Result<()> {
        let (db, product) = setup_with_product().await?;

        let fields = VariantFields {
            price: 10.0,
            ..Default::default()
        };
        create_variant_row(&db, product.id, &fields, 5).await?;

        // A second both-null "simple" variant violates the combo invariant
        let dup = create_variant_row(&db, product.id, &fields, 5).await;
        assert!(matches!(dup.unwrap_err(), Error::Conflict { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_matrix_cartesian_product() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let vanilla = create_test_flavor(&db, "Vanilla").await?;
        let chocolate = create_test_flavor(&db, "Chocolate").await?;
        let g500 = create_test_weight(&db, 500.0, "g").await?;
        let kg1 = create_test_weight(&db, 1.0, "kg").await?;

        let defaults = MatrixDefaults {
            price: 29.99,
            sale_price: None,
            quantity: 0,
        };
        let created = generate_matrix(
            &db,
            product.id,
            &[vanilla.id, chocolate.id],
            &[g500.id, kg1.id],
            &defaults,
            5,
        )
        .await?;
        assert_eq!(created.len(), 4);

        // All SKUs unique
        let mut skus: Vec<&str> = created.iter().map(|v| v.sku.as_str()).collect();
        skus.sort_unstable();
        skus.dedup();
        assert_eq!(skus.len(), 4);

        // Re-running skips every existing combination
        let again = generate_matrix(
            &db,
            product.id,
            &[vanilla.id, chocolate.id],
            &[g500.id, kg1.id],
            &defaults,
            5,
        )
        .await?;
        assert!(again.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_matrix_partial_overlap() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let vanilla = create_test_flavor(&db, "Vanilla").await?;
        let chocolate = create_test_flavor(&db, "Chocolate").await?;
        let g500 = create_test_weight(&db, 500.0, "g").await?;

        // Pre-seed one combination
        let fields = VariantFields {
            flavor_id: Some(vanilla.id),
            weight_id: Some(g500.id),
            price: 20.0,
            ..Default::default()
        };
        create_variant_row(&db, product.id, &fields, 5).await?;

        let defaults = MatrixDefaults {
            price: 20.0,
            sale_price: None,
            quantity: 0,
        };
        let created = generate_matrix(
            &db,
            product.id,
            &[vanilla.id, chocolate.id],
            &[g500.id],
            &defaults,
            5,
        )
        .await?;
        // 2x1 minus the pre-existing pair
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].flavor_id, Some(chocolate.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_matrix_single_axis() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let vanilla = create_test_flavor(&db, "Vanilla").await?;
        let chocolate = create_test_flavor(&db, "Chocolate").await?;

        let defaults = MatrixDefaults {
            price: 15.0,
            sale_price: None,
            quantity: 0,
        };
        let created =
            generate_matrix(&db, product.id, &[vanilla.id, chocolate.id], &[], &defaults, 5)
                .await?;
        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|v| v.weight_id.is_none()));

        let nothing = generate_matrix(&db, product.id, &[], &[], &defaults, 5).await;
        assert!(matches!(nothing.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_update_create_delete() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let vanilla = create_test_flavor(&db, "Vanilla").await?;
        let chocolate = create_test_flavor(&db, "Chocolate").await?;

        let keep = create_variant_row(
            &db,
            product.id,
            &VariantFields {
                flavor_id: Some(vanilla.id),
                price: 10.0,
                ..Default::default()
            },
            5,
        )
        .await?;
        let drop = create_variant_row(
            &db,
            product.id,
            &VariantFields {
                flavor_id: Some(chocolate.id),
                price: 10.0,
                ..Default::default()
            },
            5,
        )
        .await?;

        let incoming = vec![
            VariantInput::Persisted {
                id: keep.id,
                fields: VariantFields {
                    flavor_id: Some(vanilla.id),
                    price: 12.5,
                    sale_price: Some(9.99),
                    ..Default::default()
                },
            },
            VariantInput::New {
                fields: VariantFields {
                    price: 8.0,
                    ..Default::default()
                },
            },
        ];

        let result = reconcile(&db, product.id, &incoming, None, 5).await?;
        assert_eq!(result.len(), 2);

        let updated = result.iter().find(|v| v.id == keep.id).unwrap();
        assert_eq!(updated.price, 12.5);
        assert_eq!(updated.sale_price, Some(9.99));
        // SKU untouched when the combination is unchanged
        assert_eq!(updated.sku, keep.sku);

        assert!(result.iter().all(|v| v.id != drop.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_keep_ids_overrides_incoming() -> Result<()> {
        // The disagreement case: the incoming array omits a variant but the
        // explicit keep list retains it. The keep list wins.
        let (db, product) = setup_with_product().await?;
        let vanilla = create_test_flavor(&db, "Vanilla").await?;
        let chocolate = create_test_flavor(&db, "Chocolate").await?;

        let a = create_variant_row(
            &db,
            product.id,
            &VariantFields {
                flavor_id: Some(vanilla.id),
                price: 10.0,
                ..Default::default()
            },
            5,
        )
        .await?;
        let b = create_variant_row(
            &db,
            product.id,
            &VariantFields {
                flavor_id: Some(chocolate.id),
                price: 10.0,
                ..Default::default()
            },
            5,
        )
        .await?;

        // Incoming mentions only `a`; keep list retains both.
        let incoming = vec![VariantInput::Persisted {
            id: a.id,
            fields: VariantFields {
                flavor_id: Some(vanilla.id),
                price: 11.0,
                ..Default::default()
            },
        }];
        let result = reconcile(&db, product.id, &incoming, Some(&[a.id, b.id]), 5).await?;
        assert_eq!(result.len(), 2);
        assert!(result.iter().any(|v| v.id == b.id));

        // And the converse: incoming mentions `b` but the keep list dooms it.
        let incoming = vec![
            VariantInput::Persisted {
                id: a.id,
                fields: VariantFields {
                    flavor_id: Some(vanilla.id),
                    price: 11.0,
                    ..Default::default()
                },
            },
            VariantInput::Persisted {
                id: b.id,
                fields: VariantFields {
                    flavor_id: Some(chocolate.id),
                    price: 11.0,
                    ..Default::default()
                },
            },
        ];
        let result = reconcile(&db, product.id, &incoming, Some(&[a.id]), 5).await?;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, a.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_rejects_emptying_product() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let only = create_variant_row(
            &db,
            product.id,
            &VariantFields {
                price: 10.0,
                ..Default::default()
            },
            5,
        )
        .await?;

        let result = reconcile(&db, product.id, &[], None, 5).await;
        assert!(matches!(result.unwrap_err(), Error::InvariantViolation { .. }));

        // Variant untouched
        let still_there = ProductVariant::find_by_id(only.id).one(&db).await?;
        assert!(still_there.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_soft_deletes_ordered_variant() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let vanilla = create_test_flavor(&db, "Vanilla").await?;

        let ordered = create_variant_row(
            &db,
            product.id,
            &VariantFields {
                flavor_id: Some(vanilla.id),
                price: 10.0,
                ..Default::default()
            },
            5,
        )
        .await?;
        let plain = create_variant_row(
            &db,
            product.id,
            &VariantFields {
                price: 10.0,
                ..Default::default()
            },
            5,
        )
        .await?;
        record_test_order(&db, ordered.id, 2).await?;

        let incoming = vec![VariantInput::Persisted {
            id: plain.id,
            fields: VariantFields {
                price: 10.0,
                ..Default::default()
            },
        }];
        reconcile(&db, product.id, &incoming, None, 5).await?;

        // Ordered variant survives as an inactive row
        let survivor = ProductVariant::find_by_id(ordered.id).one(&db).await?.unwrap();
        assert!(!survivor.is_active);
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_combo_change_revalidates() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let vanilla = create_test_flavor(&db, "Vanilla").await?;
        let chocolate = create_test_flavor(&db, "Chocolate").await?;

        let a = create_variant_row(
            &db,
            product.id,
            &VariantFields {
                flavor_id: Some(vanilla.id),
                price: 10.0,
                ..Default::default()
            },
            5,
        )
        .await?;
        let b = create_variant_row(
            &db,
            product.id,
            &VariantFields {
                flavor_id: Some(chocolate.id),
                price: 10.0,
                ..Default::default()
            },
            5,
        )
        .await?;

        // Moving `b` onto vanilla collides with `a`
        let incoming = vec![
            VariantInput::Persisted {
                id: a.id,
                fields: VariantFields {
                    flavor_id: Some(vanilla.id),
                    price: 10.0,
                    ..Default::default()
                },
            },
            VariantInput::Persisted {
                id: b.id,
                fields: VariantFields {
                    flavor_id: Some(vanilla.id),
                    price: 10.0,
                    ..Default::default()
                },
            },
        ];
        let result = reconcile(&db, product.id, &incoming, None, 5).await;
        assert!(matches!(result.unwrap_err(), Error::Conflict { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_unknown_persisted_id() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        create_variant_row(
            &db,
            product.id,
            &VariantFields {
                price: 10.0,
                ..Default::default()
            },
            5,
        )
        .await?;

        let incoming = vec![VariantInput::Persisted {
            id: 9999,
            fields: VariantFields {
                price: 10.0,
                ..Default::default()
            },
        }];
        let result = reconcile(&db, product.id, &incoming, Some(&[9999]), 5).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_variant_standalone() -> Result<()> {
        let (db, product) = setup_with_product().await?;
        let vanilla = create_test_flavor(&db, "Vanilla").await?;

        let a = create_variant_row(
            &db,
            product.id,
            &VariantFields {
                flavor_id: Some(vanilla.id),
                price: 10.0,
                ..Default::default()
            },
            5,
        )
        .await?;
        let b = create_variant_row(
            &db,
            product.id,
            &VariantFields {
                price: 10.0,
                ..Default::default()
            },
            5,
        )
        .await?;

        // Ordered variant deactivates
        record_test_order(&db, a.id, 1).await?;
        assert_eq!(delete_variant(&db, a.id).await?, DeleteOutcome::Deactivated);
        assert!(!ProductVariant::find_by_id(a.id).one(&db).await?.unwrap().is_active);

        // Last remaining active-or-not sibling cannot go: `a` still counts
        // as a row, so `b` can be removed...
        assert_eq!(delete_variant(&db, b.id).await?, DeleteOutcome::Deleted);
        // ...after which `a` is the last remaining variant
        let result = delete_variant(&db, a.id).await;
        assert!(matches!(result.unwrap_err(), Error::InvariantViolation { .. }));
        Ok(())
    }
}
