//! SKU generation and uniqueness resolution.
//!
//! A stock-keeping identifier is derived deterministically from the product
//! and primary-category names plus a time-derived suffix, extended with
//! flavor/weight suffixes when present. Collisions against the persisted
//! unique constraint are resolved by retrying with a random salt, bounded by
//! a configured attempt budget. The database unique constraint stays the
//! authoritative arbiter; the lookups here are an optimization, not a
//! substitute.

use crate::{
    entities::{ProductVariant, product_variant},
    errors::{Error, Result},
};
use rand::{Rng, distributions::Alphanumeric};
use sea_orm::prelude::*;
use tracing::debug;

/// Default retry budget when no configured value is supplied.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Caller-supplied values that mean "please generate one for me".
const PLACEHOLDER_SKUS: &[&str] = &["auto", "generated", "new"];

/// Naming context a SKU is derived from.
#[derive(Debug, Clone, Default)]
pub struct SkuContext<'a> {
    /// Product display name
    pub product_name: &'a str,
    /// Primary category name, when the product has one
    pub category_name: Option<&'a str>,
    /// Flavor name, when the variant has a flavor
    pub flavor_name: Option<&'a str>,
    /// Weight (value, unit), when the variant has a weight
    pub weight: Option<(f64, &'a str)>,
}

/// Whether a caller-supplied SKU should be honored verbatim.
#[must_use]
pub fn is_placeholder(supplied: &str) -> bool {
    let trimmed = supplied.trim();
    trimmed.is_empty()
        || PLACEHOLDER_SKUS
            .iter()
            .any(|p| trimmed.eq_ignore_ascii_case(p))
}

/// First three alphanumerics of a name, uppercased; `"XXX"` when the name
/// has none.
fn prefix3(name: &str) -> String {
    let p: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    if p.is_empty() { "XXX".to_string() } else { p }
}

/// Formats a weight as a compact suffix, e.g. `500G` or `1.5KG`.
fn weight_suffix(value: f64, unit: &str) -> String {
    let value_part = if (value.fract()).abs() < f64::EPSILON {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    };
    format!("{}{}", value_part, unit.to_ascii_uppercase())
}

/// Derives the deterministic base identifier for a variant.
#[must_use]
pub fn base_sku(ctx: &SkuContext<'_>) -> String {
    let time_part = chrono::Utc::now().timestamp_millis() % 10_000;
    let mut sku = format!(
        "{}-{}-{:04}",
        prefix3(ctx.product_name),
        prefix3(ctx.category_name.unwrap_or("GEN")),
        time_part
    );
    if let Some(flavor) = ctx.flavor_name {
        sku.push('-');
        sku.push_str(&prefix3(flavor));
    }
    if let Some((value, unit)) = ctx.weight {
        sku.push('-');
        sku.push_str(&weight_suffix(value, unit));
    }
    sku
}

fn random_salt() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(char::from)
        .collect::<String>()
        .to_ascii_uppercase()
}

async fn sku_taken<C: ConnectionTrait>(conn: &C, sku: &str) -> Result<bool> {
    Ok(ProductVariant::find()
        .filter(product_variant::Column::Sku.eq(sku))
        .one(conn)
        .await?
        .is_some())
}

/// Produces a unique SKU for a variant.
///
/// A non-placeholder `supplied` value is honored verbatim; if it is already
/// taken the operation fails with Conflict immediately (no silent rewrite of
/// an explicit identifier). Otherwise the base identifier is tried first and
/// then salted retries up to `max_attempts`, after which a Conflict is
/// surfaced to the caller.
///
/// # Errors
/// Returns `Conflict` on a taken explicit SKU or an exhausted retry budget.
pub async fn generate<C: ConnectionTrait>(
    conn: &C,
    ctx: &SkuContext<'_>,
    supplied: Option<&str>,
    max_attempts: u32,
) -> Result<String> {
    if let Some(supplied) = supplied {
        if !is_placeholder(supplied) {
            let supplied = supplied.trim().to_string();
            if sku_taken(conn, &supplied).await? {
                return Err(Error::Conflict {
                    message: format!("SKU '{supplied}' is already in use"),
                });
            }
            return Ok(supplied);
        }
    }

    let base = base_sku(ctx);
    let attempts = max_attempts.max(1);
    for attempt in 0..attempts {
        let candidate = if attempt == 0 {
            base.clone()
        } else {
            format!("{base}-{}", random_salt())
        };
        if !sku_taken(conn, &candidate).await? {
            if attempt > 0 {
                debug!("SKU collision resolved after {} retries: {}", attempt, candidate);
            }
            return Ok(candidate);
        }
    }

    Err(Error::Conflict {
        message: format!("could not derive a unique SKU from '{base}' after {attempts} attempts"),
    })
}
