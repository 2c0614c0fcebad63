//! Core business logic - framework-agnostic catalog and inventory operations.
//!
//! Each submodule owns one component of the catalog mutation core. The
//! coordinator in [`product`] opens the transaction and delegates to the
//! category manager, the variant reconciliation engine (which consults the
//! SKU resolver), and the inventory ledger, committing or aborting
//! atomically.

pub mod blob;
pub mod category;
pub mod inventory;
pub mod lookup;
pub mod product;
pub mod sku;
pub mod variant;

/// Derives a URL-safe slug from a display name.
///
/// Lowercases ASCII alphanumerics and collapses every other run of
/// characters into a single dash. Collisions are the caller's problem;
/// the coordinator surfaces them as Conflict rather than auto-suffixing.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Whey Protein"), "whey-protein");
        assert_eq!(slugify("  Multi   Word  Name "), "multi-word-name");
        assert_eq!(slugify("Creatine (500g)"), "creatine-500g");
    }

    #[test]
    fn test_slugify_degenerate() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("A"), "a");
    }
}
