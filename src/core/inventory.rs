//! Inventory ledger - append-only quantity accounting per variant.
//!
//! Every quantity change goes through [`adjust`], which updates the variant
//! and writes exactly one immutable log entry inside the same database
//! transaction. The running balance invariant holds at all times: the
//! variant's initial quantity plus the ordered sum of deltas equals its
//! current persisted quantity. Read-side views are pure queries and never
//! mutate the ledger.

use crate::{
    entities::{InventoryLog, ProductVariant, inventory_log, product_variant},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Reason code attached to every ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentReason {
    /// Stock received
    Restock,
    /// Stock consumed by a sale
    Sale,
    /// Stock returned by a customer
    Return,
    /// Manual correction
    Adjustment,
}

impl AdjustmentReason {
    /// Stable string stored in the log row.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Restock => "restock",
            Self::Sale => "sale",
            Self::Return => "return",
            Self::Adjustment => "adjustment",
        }
    }

    /// Parses a stored reason code.
    ///
    /// # Errors
    /// Returns `Validation` for an unknown code.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "restock" => Ok(Self::Restock),
            "sale" => Ok(Self::Sale),
            "return" => Ok(Self::Return),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(Error::Validation {
                message: format!("unknown adjustment reason '{other}'"),
            }),
        }
    }
}

impl std::fmt::Display for AdjustmentReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful ledger adjustment.
#[derive(Debug, Clone)]
pub struct Adjustment {
    /// The variant with its updated quantity
    pub variant: product_variant::Model,
    /// The log entry written for this adjustment
    pub entry: inventory_log::Model,
}

/// Read-side stock aggregate over current variant state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockOverview {
    /// Active variants with zero quantity
    pub out_of_stock: u64,
    /// Active variants above zero but at or below the threshold
    pub low_stock: u64,
    /// All active variants
    pub total_active: u64,
}

/// Applies a signed quantity delta to a variant and records it.
///
/// The quantity update and the log entry are atomic together: either both
/// are committed or neither is. A negative delta whose magnitude exceeds the
/// current quantity is rejected with a validation error before any write.
///
/// # Errors
/// Returns `Validation` for a zero delta or a resulting negative quantity,
/// `NotFound` for an unknown variant.
pub async fn adjust(
    db: &DatabaseConnection,
    variant_id: i64,
    delta: i32,
    reason: AdjustmentReason,
    acting_admin: &str,
    note: Option<String>,
) -> Result<Adjustment> {
    if delta == 0 {
        return Err(Error::Validation {
            message: "inventory delta cannot be zero".to_string(),
        });
    }

    let txn = db.begin().await?;

    let variant = ProductVariant::find_by_id(variant_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "Variant",
            key: variant_id.to_string(),
        })?;

    let previous_quantity = variant.quantity;
    let new_quantity = previous_quantity + delta;
    if new_quantity < 0 {
        return Err(Error::Validation {
            message: format!(
                "cannot consume {} units: only {} in stock",
                -delta, previous_quantity
            ),
        });
    }

    let mut active: product_variant::ActiveModel = variant.into();
    active.quantity = Set(new_quantity);
    let variant = active.update(&txn).await?;

    let entry = inventory_log::ActiveModel {
        variant_id: Set(variant_id),
        delta: Set(delta),
        reason: Set(reason.as_str().to_string()),
        previous_quantity: Set(previous_quantity),
        new_quantity: Set(new_quantity),
        acting_admin: Set(acting_admin.to_string()),
        note: Set(note),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let entry = entry.insert(&txn).await?;

    txn.commit().await?;

    info!(
        "Inventory {} for variant {}: {} -> {} (delta {}, by {})",
        reason, variant_id, previous_quantity, new_quantity, delta, acting_admin
    );

    Ok(Adjustment { variant, entry })
}

/// Chronological adjustment history for a variant (oldest first).
pub async fn history(
    db: &DatabaseConnection,
    variant_id: i64,
) -> Result<Vec<inventory_log::Model>> {
    InventoryLog::find()
        .filter(inventory_log::Column::VariantId.eq(variant_id))
        .order_by_asc(inventory_log::Column::CreatedAt)
        .order_by_asc(inventory_log::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Most recent ledger entries across all variants (newest first).
pub async fn recent_activity(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<inventory_log::Model>> {
    InventoryLog::find()
        .order_by_desc(inventory_log::Column::CreatedAt)
        .order_by_desc(inventory_log::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Counts low-stock and out-of-stock active variants.
pub async fn stock_overview(
    db: &DatabaseConnection,
    low_stock_threshold: i32,
) -> Result<StockOverview> {
    let total_active = ProductVariant::find()
        .filter(product_variant::Column::IsActive.eq(true))
        .count(db)
        .await?;
    let out_of_stock = ProductVariant::find()
        .filter(product_variant::Column::IsActive.eq(true))
        .filter(product_variant::Column::Quantity.eq(0))
        .count(db)
        .await?;
    let low_stock = ProductVariant::find()
        .filter(product_variant::Column::IsActive.eq(true))
        .filter(product_variant::Column::Quantity.gt(0))
        .filter(product_variant::Column::Quantity.lte(low_stock_threshold))
        .count(db)
        .await?;

    Ok(StockOverview {
        out_of_stock,
        low_stock,
        total_active,
    })
}
