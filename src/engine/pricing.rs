use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::discount::{CodeIssue, DiscountCode};
use crate::models::menu::{ItemKind, Pizza};
use crate::models::money::MoneyValue;
use crate::models::order::{LineItem, Order};
use crate::store::Store;

/// 40% margin.
pub const MARGIN_RATE: Decimal = Decimal::from_parts(140, 0, 0, false, 2);
/// 9% tax.
pub const TAX_RATE: Decimal = Decimal::from_parts(109, 0, 0, false, 2);
pub const LOYALTY_PIZZA_THRESHOLD: u32 = 10;
pub const LOYALTY_PERCENT: Decimal = Decimal::from_parts(10, 0, 0, false, 0);
/// Per-line cap, applied after duplicate lines are merged.
pub const MAX_QUANTITY: u32 = 9999;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BasketError {
    #[error("basket is empty")]
    Empty,

    #[error("quantity of {kind:?} {item_id} must be at least 1")]
    ZeroQuantity { kind: ItemKind, item_id: Uuid },

    #[error("quantity {quantity} of {kind:?} {item_id} exceeds the maximum of 9999")]
    QuantityTooLarge {
        kind: ItemKind,
        item_id: Uuid,
        quantity: u64,
    },

    #[error("basket amount is out of range")]
    AmountOutOfRange,

    #[error("unknown {kind:?} {item_id}")]
    UnknownItem { kind: ItemKind, item_id: Uuid },

    #[error("pizza {0} references an unknown ingredient")]
    IncompletePizza(Uuid),

    #[error("customer {0} not found")]
    UnknownCustomer(Uuid),
}

/// `None` when the amount leaves the representable range.
pub fn pizza_final_price(
    base_price: MoneyValue,
    ingredient_prices: impl IntoIterator<Item = MoneyValue>,
) -> Option<MoneyValue> {
    let cost = ingredient_prices
        .into_iter()
        .try_fold(base_price, MoneyValue::checked_add)?;
    cost.checked_scale(MARGIN_RATE)?.checked_scale(TAX_RATE)
}

pub fn pizza_price(store: &Store, pizza: &Pizza) -> Result<MoneyValue, BasketError> {
    let ingredient_prices = pizza
        .ingredient_ids
        .iter()
        .map(|id| {
            store
                .ingredients
                .get(id)
                .map(|ingredient| ingredient.price)
                .ok_or(BasketError::IncompletePizza(pizza.id))
        })
        .collect::<Result<Vec<_>, _>>()?;

    pizza_final_price(pizza.base_price, ingredient_prices).ok_or(BasketError::AmountOutOfRange)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PricedLine {
    pub kind: ItemKind,
    pub item_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: MoneyValue,
    pub line_total: MoneyValue,
}

impl PricedLine {
    pub fn new(
        kind: ItemKind,
        item_id: Uuid,
        name: String,
        quantity: u32,
        unit_price: MoneyValue,
    ) -> Result<Self, BasketError> {
        let line_total = unit_price
            .checked_mul(quantity)
            .ok_or(BasketError::AmountOutOfRange)?;

        Ok(Self {
            kind,
            item_id,
            name,
            quantity,
            unit_price,
            line_total,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct BasketSnapshot {
    pub lines: Vec<PricedLine>,
}

impl BasketSnapshot {
    pub fn subtotal(&self) -> MoneyValue {
        self.lines.iter().map(|line| line.line_total).sum()
    }

    pub fn pizza_count(&self) -> u32 {
        self.lines
            .iter()
            .filter(|line| line.kind == ItemKind::Pizza)
            .fold(0u32, |count, line| count.saturating_add(line.quantity))
    }

    pub fn cheapest_pizza(&self) -> Option<MoneyValue> {
        self.lines
            .iter()
            .filter(|line| line.kind == ItemKind::Pizza)
            .map(|line| line.unit_price)
            .min()
    }

    pub fn line_items(&self) -> Vec<LineItem> {
        self.lines
            .iter()
            .map(|line| LineItem {
                kind: line.kind,
                item_id: line.item_id,
                quantity: line.quantity,
            })
            .collect()
    }
}

/// Validate a basket and fold repeated references into one line.
pub fn merge_items(items: &[LineItem]) -> Result<Vec<LineItem>, BasketError> {
    if items.is_empty() {
        return Err(BasketError::Empty);
    }

    let mut merged: Vec<LineItem> = Vec::with_capacity(items.len());
    for item in items {
        match merged
            .iter_mut()
            .find(|existing| existing.kind == item.kind && existing.item_id == item.item_id)
        {
            Some(existing) => {
                let total = u64::from(existing.quantity) + u64::from(item.quantity);
                existing.quantity = u32::try_from(total).map_err(|_| BasketError::QuantityTooLarge {
                    kind: item.kind,
                    item_id: item.item_id,
                    quantity: total,
                })?;
            }
            None => merged.push(item.clone()),
        }
    }

    for line in &merged {
        if line.quantity == 0 {
            return Err(BasketError::ZeroQuantity {
                kind: line.kind,
                item_id: line.item_id,
            });
        }
        if line.quantity > MAX_QUANTITY {
            return Err(BasketError::QuantityTooLarge {
                kind: line.kind,
                item_id: line.item_id,
                quantity: u64::from(line.quantity),
            });
        }
    }

    Ok(merged)
}

pub fn price_basket(store: &Store, items: &[LineItem]) -> Result<BasketSnapshot, BasketError> {
    let merged = merge_items(items)?;
    let mut lines = Vec::with_capacity(merged.len());

    for item in merged {
        let unknown = BasketError::UnknownItem {
            kind: item.kind,
            item_id: item.item_id,
        };
        let (name, unit_price) = match item.kind {
            ItemKind::Pizza => {
                let pizza = store.pizzas.get(&item.item_id).ok_or(unknown)?;
                (pizza.name.clone(), pizza_price(store, &pizza)?)
            }
            ItemKind::Drink => {
                let drink = store.drinks.get(&item.item_id).ok_or(unknown)?;
                (drink.name.clone(), drink.price)
            }
            ItemKind::Dessert => {
                let dessert = store.desserts.get(&item.item_id).ok_or(unknown)?;
                (dessert.name.clone(), dessert.price)
            }
        };

        lines.push(PricedLine::new(item.kind, item.item_id, name, item.quantity, unit_price)?);
    }

    lines
        .iter()
        .try_fold(MoneyValue::ZERO, |total, line| total.checked_add(line.line_total))
        .ok_or(BasketError::AmountOutOfRange)?;

    Ok(BasketSnapshot { lines })
}

pub fn order_subtotal(store: &Store, order: &Order) -> Result<MoneyValue, BasketError> {
    Ok(price_basket(store, &order.items)?.subtotal())
}

#[derive(Debug, Clone, PartialEq)]
pub enum CodeLookup {
    NotSupplied,
    Rejected(CodeIssue),
    Found(DiscountCode),
}

impl CodeLookup {
    pub fn resolve(store: &Store, code: Option<&str>) -> Self {
        match code.map(str::trim).filter(|code| !code.is_empty()) {
            None => CodeLookup::NotSupplied,
            Some(code) => match store.find_code(code) {
                Some(found) => CodeLookup::Found(found),
                None => CodeLookup::Rejected(CodeIssue::NotFound),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscountRequest<'a> {
    pub basket: &'a BasketSnapshot,
    pub birthdate: NaiveDate,
    pub history: &'a [Order],
    /// Excluded from history when it is already persisted.
    pub current_order: Option<Uuid>,
    pub code: &'a CodeLookup,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum DiscountStep {
    Birthday,
    Loyalty,
    PromoCode,
}

pub const APPLICATION_ORDER: [DiscountStep; 3] = [
    DiscountStep::Birthday,
    DiscountStep::Loyalty,
    DiscountStep::PromoCode,
];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BreakdownLine {
    pub step: DiscountStep,
    pub label: String,
    pub amount_off: MoneyValue,
    pub applied: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PriceQuote {
    pub subtotal: MoneyValue,
    pub final_total: MoneyValue,
    pub breakdown: Vec<BreakdownLine>,
    pub code_issue: Option<CodeIssue>,
    pub loyalty_pizzas: u32,
    #[serde(skip)]
    pub applied_code: Option<Uuid>,
}

impl PriceQuote {
    pub fn labels(&self) -> Vec<&str> {
        self.breakdown.iter().map(|line| line.label.as_str()).collect()
    }
}

pub fn quote(request: &DiscountRequest<'_>) -> PriceQuote {
    quote_in_order(request, &APPLICATION_ORDER)
}

pub(crate) fn quote_in_order(request: &DiscountRequest<'_>, steps: &[DiscountStep]) -> PriceQuote {
    let subtotal = request.basket.subtotal();
    let loyalty_pizzas = completed_pizzas(request.history, request.current_order)
        .saturating_add(request.basket.pizza_count());

    let mut quote = PriceQuote {
        subtotal,
        final_total: subtotal,
        breakdown: Vec::new(),
        code_issue: None,
        loyalty_pizzas,
        applied_code: None,
    };

    for step in steps {
        match step {
            DiscountStep::Birthday => apply_birthday(request, &mut quote),
            DiscountStep::Loyalty => apply_loyalty(&mut quote),
            DiscountStep::PromoCode => apply_code(request, &mut quote),
        }
    }

    quote
}

fn apply_birthday(request: &DiscountRequest<'_>, quote: &mut PriceQuote) {
    if !is_birthday(request.birthdate, request.now.date_naive()) {
        return;
    }

    let Some(cheapest) = request.basket.cheapest_pizza().filter(|price| !price.is_zero()) else {
        return;
    };

    let after = quote.final_total.saturating_sub(cheapest);
    push_reduction(quote, DiscountStep::Birthday, "Birthday free pizza".to_string(), after);
}

fn apply_loyalty(quote: &mut PriceQuote) {
    if quote.loyalty_pizzas < LOYALTY_PIZZA_THRESHOLD {
        return;
    }

    let after = quote.final_total.less_percent(LOYALTY_PERCENT);
    push_reduction(
        quote,
        DiscountStep::Loyalty,
        format!("{LOYALTY_PERCENT}% loyalty discount"),
        after,
    );
}

fn apply_code(request: &DiscountRequest<'_>, quote: &mut PriceQuote) {
    let issue = match request.code {
        CodeLookup::NotSupplied => return,
        CodeLookup::Rejected(issue) => *issue,
        CodeLookup::Found(code) => match code.issue_at(request.now) {
            Some(issue) => issue,
            None => {
                quote.applied_code = Some(code.id);
                let after = quote.final_total.less_percent(code.percentage);
                push_reduction(
                    quote,
                    DiscountStep::PromoCode,
                    format!("{}% discount code {}", code.percentage.normalize(), code.code),
                    after,
                );
                return;
            }
        },
    };

    quote.code_issue = Some(issue);
    quote.breakdown.push(BreakdownLine {
        step: DiscountStep::PromoCode,
        label: issue.label().to_string(),
        amount_off: MoneyValue::ZERO,
        applied: false,
    });
}

fn push_reduction(quote: &mut PriceQuote, step: DiscountStep, label: String, after: MoneyValue) {
    let after = after.clamp_non_negative();
    quote.breakdown.push(BreakdownLine {
        step,
        label,
        amount_off: quote.final_total.saturating_sub(after),
        applied: true,
    });
    quote.final_total = after;
}

/// Pizzas bought in completed orders, not counting `current`.
pub fn completed_pizzas(history: &[Order], current: Option<Uuid>) -> u32 {
    history
        .iter()
        .filter(|order| Some(order.id) != current && order.status.is_completed())
        .fold(0u32, |count, order| count.saturating_add(order.pizza_count()))
}

/// Month/day match; Feb-29 birthdays fall on Feb-28 in common years.
pub fn is_birthday(birthdate: NaiveDate, today: NaiveDate) -> bool {
    let leap_day_birthday = birthdate.month() == 2 && birthdate.day() == 29;
    if leap_day_birthday && !is_leap_year(today.year()) {
        return today.month() == 2 && today.day() == 28;
    }

    birthdate.month() == today.month() && birthdate.day() == today.day()
}

fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}
