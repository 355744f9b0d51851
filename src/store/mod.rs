pub mod availability;
pub mod ledger;
pub mod unit_of_work;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::engine::lifecycle::{self, Transition, TransitionError};
use crate::models::courier::DeliveryPerson;
use crate::models::customer::Customer;
use crate::models::discount::DiscountCode;
use crate::models::menu::{Dessert, Drink, Ingredient, Pizza};
use crate::models::order::{Order, OrderStatus};
use crate::models::payment::Payment;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} {key} already exists")]
    Duplicate { entity: &'static str, key: String },

    #[error("invalid record: {0}")]
    Invalid(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

#[derive(Default)]
pub struct Store {
    pub ingredients: DashMap<Uuid, Ingredient>,
    pub pizzas: DashMap<Uuid, Pizza>,
    pub drinks: DashMap<Uuid, Drink>,
    pub desserts: DashMap<Uuid, Dessert>,
    pub customers: DashMap<Uuid, Customer>,
    pub orders: DashMap<Uuid, Order>,
    pub discount_codes: DashMap<Uuid, DiscountCode>,
    pub couriers: DashMap<Uuid, DeliveryPerson>,
    pub payments: DashMap<Uuid, Payment>,
    code_index: DashMap<String, Uuid>,
    payment_index: DashMap<Uuid, Uuid>,
    checkouts_in_flight: DashMap<Uuid, ()>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn customer(&self, id: Uuid) -> Option<Customer> {
        self.customers.get(&id).map(|entry| entry.value().clone())
    }

    pub fn insert_customer(&self, customer: Customer) -> Result<(), StoreError> {
        match self.customers.entry(customer.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate {
                entity: "customer",
                key: customer.id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(customer);
                Ok(())
            }
        }
    }

    pub fn order(&self, id: Uuid) -> Option<Order> {
        self.orders.get(&id).map(|entry| entry.value().clone())
    }

    pub fn insert_order(&self, order: Order) -> Result<(), StoreError> {
        match self.orders.entry(order.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate {
                entity: "order",
                key: order.id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(order);
                Ok(())
            }
        }
    }

    pub(crate) fn remove_order(&self, id: Uuid) {
        self.orders.remove(&id);
    }

    pub(crate) fn claim_checkout(&self, order_id: Uuid) {
        self.checkouts_in_flight.insert(order_id, ());
    }

    pub(crate) fn release_checkout(&self, order_id: Uuid) {
        self.checkouts_in_flight.remove(&order_id);
    }

    /// True while the checkout that created `order_id` has not finished.
    pub fn is_checking_out(&self, order_id: Uuid) -> bool {
        self.checkouts_in_flight.contains_key(&order_id)
    }

    /// Orders in any of `statuses`, oldest first.
    pub fn orders_with_status(&self, statuses: &[OrderStatus]) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| statuses.contains(&entry.value().status))
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        orders
    }

    pub fn orders_for_customer(&self, customer_id: Uuid) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| entry.value().customer_id == customer_id)
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        orders
    }

    pub fn transition_order(
        &self,
        id: Uuid,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<Order, StoreError> {
        let mut order = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("order", id))?;

        lifecycle::apply(&mut order, transition, now)?;
        Ok(order.clone())
    }

    pub fn record_payment(&self, payment: Payment) -> Result<(), StoreError> {
        match self.payment_index.entry(payment.order_id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate {
                entity: "payment for order",
                key: payment.order_id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(payment.id);
                self.payments.insert(payment.id, payment);
                Ok(())
            }
        }
    }

    pub(crate) fn remove_payment(&self, payment_id: Uuid) {
        if let Some((_, payment)) = self.payments.remove(&payment_id) {
            self.payment_index.remove(&payment.order_id);
        }
    }

    pub fn payment_for_order(&self, order_id: Uuid) -> Option<Payment> {
        let payment_id = *self.payment_index.get(&order_id)?;
        self.payments.get(&payment_id).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::Store;
    use crate::models::courier::DeliveryPerson;
    use crate::models::customer::Customer;
    use crate::models::discount::DiscountCode;
    use crate::models::menu::{Drink, Ingredient, ItemKind, Pizza, PizzaCategory};
    use crate::models::money::MoneyValue;
    use crate::models::order::{LineItem, Order, OrderStatus};

    pub fn customer(store: &Store, seed: u128, birthdate: NaiveDate, postal_code: &str) -> Customer {
        let customer = Customer {
            id: Uuid::from_u128(seed),
            first_name: "Test".to_string(),
            last_name: format!("Customer{seed}"),
            phone_number: format!("06{seed:08}"),
            birthdate,
            address: "1 Main St".to_string(),
            postal_code: postal_code.to_string(),
            is_staff: false,
            created_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        };
        store.insert_customer(customer.clone()).unwrap();
        customer
    }

    /// Final price is round(round((base + ingredients) * 1.40) * 1.09).
    pub fn pizza(store: &Store, seed: u128, base_cents: i64, ingredient_cents: &[i64]) -> Pizza {
        let ingredient_ids = ingredient_cents
            .iter()
            .enumerate()
            .map(|(index, cents)| {
                let ingredient = Ingredient {
                    id: Uuid::from_u128(seed * 1000 + index as u128),
                    name: format!("ingredient-{seed}-{index}"),
                    price: MoneyValue::from_cents(*cents),
                };
                let id = ingredient.id;
                store.ingredients.insert(id, ingredient);
                id
            })
            .collect();

        let pizza = Pizza {
            id: Uuid::from_u128(seed),
            name: format!("pizza-{seed}"),
            base_price: MoneyValue::from_cents(base_cents),
            category: PizzaCategory::Normal,
            ingredient_ids,
        };
        store.pizzas.insert(pizza.id, pizza.clone());
        pizza
    }

    pub fn drink(store: &Store, seed: u128, cents: i64) -> Drink {
        let drink = Drink {
            id: Uuid::from_u128(seed),
            name: format!("drink-{seed}"),
            price: MoneyValue::from_cents(cents),
        };
        store.drinks.insert(drink.id, drink.clone());
        drink
    }

    pub fn code(store: &Store, seed: u128, code: &str, percentage: i64, expires_at: DateTime<Utc>) -> DiscountCode {
        let discount = DiscountCode {
            id: Uuid::from_u128(seed),
            code: code.to_string(),
            percentage: Decimal::from(percentage),
            expires_at,
            is_used: false,
            redeemed_by: None,
        };
        store.add_discount_code(discount.clone()).unwrap();
        discount
    }

    pub fn courier(store: &Store, seed: u128, postal_code: &str, available_at: DateTime<Utc>) -> DeliveryPerson {
        let courier = DeliveryPerson {
            id: Uuid::from_u128(seed),
            first_name: "Test".to_string(),
            last_name: format!("Courier{seed}"),
            phone_number: format!("07{seed:08}"),
            postal_code: postal_code.to_string(),
            available_at,
            active_order: None,
            updated_at: available_at,
        };
        store.add_courier(courier.clone()).unwrap();
        courier
    }

    pub fn line(kind: ItemKind, item_id: Uuid, quantity: u32) -> LineItem {
        LineItem {
            kind,
            item_id,
            quantity,
        }
    }

    pub fn order(
        store: &Store,
        seed: u128,
        customer_id: Uuid,
        items: Vec<LineItem>,
        status: OrderStatus,
        created_at: DateTime<Utc>,
    ) -> Order {
        let order = Order {
            id: Uuid::from_u128(seed),
            customer_id,
            items,
            status,
            estimated_delivery_time: None,
            assigned_driver: None,
            discount_code_id: None,
            created_at,
            updated_at: created_at,
        };
        store.insert_order(order.clone()).unwrap();
        order
    }
}
