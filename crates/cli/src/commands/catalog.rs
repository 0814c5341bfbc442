//! Catalog check.
//!
//! Loads the catalog compiled into the storefront binary, which fails on
//! malformed JSON or duplicate ids and slugs, then prints one line per product.

use aerox_storefront::catalog::{Catalog, CatalogError};

/// Validate and list the embedded catalog.
pub fn check() -> Result<(), CatalogError> {
    let catalog = Catalog::embedded()?;

    for product in catalog.all() {
        tracing::info!(
            id = %product.id,
            slug = %product.slug,
            category = ?product.category,
            price = %product.price,
            "{}",
            product.name
        );
    }

    tracing::info!(products = catalog.all().len(), "Catalog OK");
    Ok(())
}
