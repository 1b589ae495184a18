//! Cart pricing and the shipping surcharge.
//!
//! Amounts are `i64` minor units. Unit prices are whatever the product row
//! says at the moment of pricing; nothing is snapshotted into the cart.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Flat shipping fee charged once a customer has enough order history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub flat_fee: i64,
    /// Customers with fewer prior order rows than this ship for free.
    pub free_order_limit: i64,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            flat_fee: 10_000,
            free_order_limit: 3,
        }
    }
}

impl ShippingPolicy {
    /// Surcharge for a customer with `prior_orders` order rows, regardless of
    /// their status. Independent of what is in the cart.
    pub fn charge(&self, prior_orders: i64) -> i64 {
        if prior_orders < self.free_order_limit {
            0
        } else {
            self.flat_fee
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CheckoutQuote {
    pub subtotal: i64,
    pub shipping: i64,
    pub total: i64,
    /// Sum of line quantities.
    pub item_count: i64,
    pub line_count: i64,
}

fn too_large() -> AppError {
    AppError::BadRequest("Cart total is too large".into())
}

/// `unit_price × quantity`, rejected when it does not fit in an `i64`.
pub fn line_total(unit_price: i64, quantity: i32) -> AppResult<i64> {
    unit_price
        .checked_mul(i64::from(quantity))
        .ok_or_else(too_large)
}

/// Subtotal and item count of `lines`, without shipping.
pub fn subtotal(lines: &[PricedLine]) -> AppResult<(i64, i64)> {
    let mut subtotal: i64 = 0;
    let mut item_count: i64 = 0;
    for line in lines {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }
        subtotal = subtotal
            .checked_add(line_total(line.unit_price, line.quantity)?)
            .ok_or_else(too_large)?;
        item_count += i64::from(line.quantity);
    }
    Ok((subtotal, item_count))
}

pub fn quote(
    lines: &[PricedLine],
    prior_orders: i64,
    policy: &ShippingPolicy,
) -> AppResult<CheckoutQuote> {
    let (subtotal, item_count) = subtotal(lines)?;

    let shipping = if lines.is_empty() {
        0
    } else {
        policy.charge(prior_orders)
    };
    let total = subtotal
        .checked_add(shipping)
        .ok_or_else(too_large)?;

    Ok(CheckoutQuote {
        subtotal,
        shipping,
        total,
        item_count,
        line_count: lines.len() as i64,
    })
}
