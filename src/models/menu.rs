use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::money::MoneyValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub price: MoneyValue,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PizzaCategory {
    #[default]
    Normal,
    Vegetarian,
    Vegan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pizza {
    pub id: Uuid,
    pub name: String,
    pub base_price: MoneyValue,
    pub category: PizzaCategory,
    pub ingredient_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drink {
    pub id: Uuid,
    pub name: String,
    pub price: MoneyValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dessert {
    pub id: Uuid,
    pub name: String,
    pub price: MoneyValue,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKind {
    Pizza,
    Drink,
    Dessert,
}

/// Pizza entry as listed on the menu, with its customer-facing price.
#[derive(Debug, Clone, Serialize)]
pub struct PizzaListing {
    #[serde(flatten)]
    pub pizza: Pizza,
    pub final_price: MoneyValue,
}
