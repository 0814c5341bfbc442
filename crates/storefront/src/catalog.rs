//! The product catalog.
//!
//! A static, read-only product list compiled into the binary. It is the only
//! source of prices: carts carry product ids and quantities, never amounts.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const EMBEDDED_CATALOG: &str = include_str!("../data/catalog.json");

/// Top-level product fields never sent to clients.
pub const SENSITIVE_FIELDS: &[&str] = &["vendor_margin", "internal_sku", "cost_price", "supplier_id"];

/// Errors loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("malformed catalog: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("duplicate product id: {0}")]
    DuplicateId(String),

    #[error("duplicate product slug: {0}")]
    DuplicateSlug(String),
}

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Apparel,
    Equipment,
    Accessory,
}

/// Performance figures shown on the product page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drag_coefficient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occasion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit: Option<String>,
}

/// A catalog product.
///
/// Only the fields the server reasons about are typed. Presentational data
/// (images, 3D model path, size charts, storytelling) is kept in
/// `attributes` and passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub category: Category,
    pub image_url: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub tech_stats: TechStats,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Product lookup by id and slug.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
    by_id: HashMap<String, usize>,
    by_slug: HashMap<String, usize>,
}

impl Catalog {
    /// Load the catalog compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded JSON is malformed or has duplicate
    /// ids or slugs.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    /// Parse a catalog from a JSON array of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has duplicate ids or slugs.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let products: Vec<Product> = serde_json::from_str(json)?;
        Self::from_products(products)
    }

    /// Build a catalog from already-parsed products.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate ids or slugs.
    pub fn from_products(products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(products.len());
        let mut by_slug = HashMap::with_capacity(products.len());

        for (idx, product) in products.iter().enumerate() {
            if by_id.insert(product.id.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateId(product.id.clone()));
            }
            if by_slug.insert(product.slug.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateSlug(product.slug.clone()));
            }
        }

        Ok(Self {
            products,
            by_id,
            by_slug,
        })
    }

    #[must_use]
    pub fn all(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn by_id(&self, id: &str) -> Option<&Product> {
        self.by_id.get(id).and_then(|&idx| self.products.get(idx))
    }

    #[must_use]
    pub fn by_slug(&self, slug: &str) -> Option<&Product> {
        self.by_slug.get(slug).and_then(|&idx| self.products.get(idx))
    }

    /// Authoritative unit price of a product.
    #[must_use]
    pub fn price_of(&self, id: &str) -> Option<Decimal> {
        self.by_id(id).map(|p| p.price)
    }
}

/// Public JSON form of a product with [`SENSITIVE_FIELDS`] removed.
#[must_use]
pub fn sanitize(product: &Product) -> Value {
    let mut value = serde_json::to_value(product).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        for field in SENSITIVE_FIELDS {
            map.remove(*field);
        }
    }
    value
}
