//! Pricing and stock rules of the order workflow.
//!
//! Everything here is pure: the order service loads and locks the products,
//! hands them to [`plan_reservation`], and only writes once the whole cart
//! has been accepted.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    dto::orders::OrderItemRequest,
    entity::products::Model as ProductModel,
    error::{AppError, AppResult},
};

/// Orders at or above this subtotal ship for free.
pub fn free_shipping_threshold() -> Decimal {
    Decimal::ONE_HUNDRED
}

/// Flat delivery fee charged below the threshold.
pub fn flat_shipping_fee() -> Decimal {
    Decimal::new(700, 2)
}

/// Authoritative unit price: the promo price when set, else the base price,
/// else zero.
pub fn resolve_price(base: Option<Decimal>, promo: Option<Decimal>) -> Decimal {
    promo.or(base).unwrap_or(Decimal::ZERO)
}

pub fn shipping_cost(subtotal: Decimal) -> Decimal {
    if subtotal >= free_shipping_threshold() {
        Decimal::ZERO
    } else {
        flat_shipping_fee()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total_amount: Decimal,
}

impl OrderTotals {
    /// Totals over `(unit price, quantity)` pairs.
    pub fn compute<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (Decimal, i32)>,
    {
        let subtotal: Decimal = lines
            .into_iter()
            .map(|(price, quantity)| price * Decimal::from(quantity))
            .sum();
        let shipping_cost = shipping_cost(subtotal);
        Self {
            subtotal,
            shipping_cost,
            total_amount: subtotal + shipping_cost,
        }
    }
}

/// A validated, priced line ready to be stored as an order item.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine {
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub lines: Vec<PlannedLine>,
    /// One entry per distinct product, in first-seen order.
    pub decrements: Vec<(Uuid, i32)>,
    pub totals: OrderTotals,
}

/// Validate every cart line against the loaded products and price it.
///
/// Lines are checked in request order and the first violation wins. A
/// product named on several lines is checked against what the earlier lines
/// left, so the plan never reserves more than the stock it was given.
pub fn plan_reservation(
    items: &[OrderItemRequest],
    products: &HashMap<Uuid, ProductModel>,
) -> AppResult<Reservation> {
    if items.is_empty() {
        return Err(AppError::BadRequest("No items in order".into()));
    }

    let mut remaining: HashMap<Uuid, i32> = HashMap::new();
    let mut decrements: Vec<(Uuid, i32)> = Vec::new();
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        if item.quantity < 1 {
            return Err(AppError::BadRequest(format!(
                "Invalid quantity for product {}",
                item.product
            )));
        }

        let product = products
            .get(&item.product)
            .ok_or(AppError::ProductNotFound(item.product))?;

        let available = remaining.entry(product.id).or_insert(product.stock);
        if *available < item.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}. Available: {}",
                product.nom, available
            )));
        }
        *available -= item.quantity;

        match decrements.iter_mut().find(|(id, _)| *id == product.id) {
            Some((_, qty)) => *qty += item.quantity,
            None => decrements.push((product.id, item.quantity)),
        }

        lines.push(PlannedLine {
            product_id: product.id,
            name: product.nom.clone(),
            price: resolve_price(Some(product.prix), product.prix_promo),
            quantity: item.quantity,
            size: item.size.clone(),
            color: item.color.clone(),
            image: product.images.first().cloned().unwrap_or_default(),
        });
    }

    let totals = OrderTotals::compute(lines.iter().map(|l| (l.price, l.quantity)));
    Ok(Reservation {
        lines,
        decrements,
        totals,
    })
}

/// Quantities to give back per product, summed over lines and keyed by id so
/// the updates lock rows in the same order as a reservation does.
pub fn restock_plan<I>(lines: I) -> BTreeMap<Uuid, i32>
where
    I: IntoIterator<Item = (Uuid, i32)>,
{
    let mut plan = BTreeMap::new();
    for (product_id, quantity) in lines {
        *plan.entry(product_id).or_insert(0) += quantity;
    }
    plan
}
