//! Product catalog and cart record clients.
//!
//! The storefront's product listing reads a second sheet script with
//! the same positional-row envelope as the users sheet:
//! `[id, name, imageUrl, price, brand, description, rating, stock,
//! dateAdded]`. Cart lines come back as named objects keyed by the
//! session email. Both use the same tolerant decoding policy as the
//! user records: absent cells become defaults, never fetch failures.

use crate::error::{ClientError, Result};
use crate::record::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Same bounded wait as the users client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stock level below which the storefront shows a "only N left" badge.
const LOW_STOCK_THRESHOLD: i64 = 5;

// ── Products ────────────────────────────────────────────────────────

/// One catalog entry, decoded from a positional sheet row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: RecordId,
    pub name: String,
    pub image_url: String,
    pub price: f64,
    pub brand: String,
    pub description: String,
    pub rating: f64,
    pub stock: i64,
    pub date_added: String,
}

impl Product {
    /// Decode one positional row; absent or null cells default to
    /// empty text / zero.
    pub fn from_row(row: &[Value]) -> Self {
        Self {
            id: RecordId::from(row.get(0).unwrap_or(&Value::Null)),
            name: string_at(row, 1),
            image_url: string_at(row, 2),
            price: number_at(row, 3),
            brand: string_at(row, 4),
            description: string_at(row, 5),
            rating: number_at(row, 6),
            stock: number_at(row, 7) as i64,
            date_added: string_at(row, 8),
        }
    }

    /// Whether the listing should carry the low-stock badge.
    pub fn low_stock(&self) -> bool {
        self.stock < LOW_STOCK_THRESHOLD
    }
}

fn string_at(row: &[Value], idx: usize) -> String {
    match row.get(idx) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn number_at(row: &[Value], idx: usize) -> f64 {
    match row.get(idx) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

// ── Cart ────────────────────────────────────────────────────────────

/// One cart line, keyed by the owning session's email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub email: String,
    #[serde(rename = "cartProductName")]
    pub product_name: String,
    #[serde(rename = "cartDescription")]
    pub description: String,
    #[serde(rename = "cartProductImage")]
    pub product_image: String,
    #[serde(rename = "cartProductPrice")]
    pub product_price: String,
    #[serde(rename = "cartRating")]
    pub rating: String,
    pub quantity: u32,
}

/// Envelope of the cart endpoint.
#[derive(Debug, Deserialize)]
struct CartResponse {
    status: String,
    #[serde(default)]
    data: Vec<CartItem>,
    message: Option<String>,
}

/// Envelope of the products read endpoint.
#[derive(Debug, Deserialize)]
struct ProductsResponse {
    data: Vec<Value>,
}

// ── Client ──────────────────────────────────────────────────────────

/// HTTP adapter for the products sheet (and, when deployed, the cart
/// sheet).
pub struct CatalogClient {
    products_base: String,
    cart_base: Option<String>,
    http: reqwest::Client,
}

impl CatalogClient {
    pub fn new(products_base: impl Into<String>, cart_base: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            products_base: products_base.into(),
            cart_base,
            http,
        })
    }

    /// All catalog products, in sheet order.
    pub async fn fetch_products(&self) -> Result<Vec<Product>> {
        let resp = self
            .http
            .get(&self.products_base)
            .query(&[("action", "read")])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ClientError::Network(format!(
                "products request failed with status {}",
                resp.status()
            )));
        }

        let body: ProductsResponse = resp.json().await?;
        Ok(decode_product_rows(&body.data))
    }

    /// Cart lines belonging to the given email. The sheet returns every
    /// line; filtering happens client-side, like the storefront does.
    pub async fn fetch_cart(&self, email: &str) -> Result<Vec<CartItem>> {
        let base = self.cart_base.as_deref().ok_or_else(|| {
            ClientError::Network("no cart endpoint configured".to_string())
        })?;

        let resp = self
            .http
            .get(base)
            .query(&[("action", "read")])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ClientError::Network(format!(
                "cart request failed with status {}",
                resp.status()
            )));
        }

        let body: CartResponse = resp.json().await?;
        filter_cart(body, email)
    }
}

fn decode_product_rows(rows: &[Value]) -> Vec<Product> {
    rows.iter()
        .map(|row| match row.as_array() {
            Some(cells) => Product::from_row(cells),
            None => Product::from_row(&[]),
        })
        .collect()
}

fn filter_cart(body: CartResponse, email: &str) -> Result<Vec<CartItem>> {
    if body.status != "success" {
        return Err(ClientError::RemoteRejection(
            body.message
                .unwrap_or_else(|| "cart read failed".to_string()),
        ));
    }
    Ok(body
        .data
        .into_iter()
        .filter(|item| item.email == email)
        .collect())
}
