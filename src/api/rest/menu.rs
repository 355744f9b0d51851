use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use super::require_text;
use crate::engine::pricing::pizza_price;
use crate::error::AppError;
use crate::models::menu::{Dessert, Drink, Ingredient, Pizza, PizzaCategory, PizzaListing};
use crate::models::money::MoneyValue;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ingredients", post(create_ingredient).get(list_ingredients))
        .route("/pizzas", post(create_pizza).get(list_pizzas))
        .route("/drinks", post(create_drink).get(list_drinks))
        .route("/desserts", post(create_dessert).get(list_desserts))
}

#[derive(Deserialize)]
pub struct PricedItemRequest {
    pub name: String,
    pub price: MoneyValue,
}

impl PricedItemRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text("name", &self.name)?;
        check_price("price", self.price)
    }
}

fn check_price(field: &str, price: MoneyValue) -> Result<(), AppError> {
    if price.is_negative() {
        return Err(AppError::BadRequest(format!("{field} cannot be negative")));
    }
    if price.exceeds_max_price() {
        return Err(AppError::BadRequest(format!(
            "{field} exceeds maximum allowed ({}), got {price}",
            MoneyValue::MAX_PRICE
        )));
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct CreatePizzaRequest {
    pub name: String,
    pub base_price: MoneyValue,
    #[serde(default)]
    pub category: PizzaCategory,
    pub ingredient_ids: Vec<Uuid>,
}

async fn create_ingredient(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PricedItemRequest>,
) -> Result<Json<Ingredient>, AppError> {
    payload.validate()?;
    if payload.price.is_zero() {
        return Err(AppError::BadRequest("ingredient price must be > 0".to_string()));
    }

    let ingredient = Ingredient {
        id: Uuid::new_v4(),
        name: payload.name,
        price: payload.price,
    };

    state.store.ingredients.insert(ingredient.id, ingredient.clone());
    Ok(Json(ingredient))
}

async fn list_ingredients(State(state): State<Arc<AppState>>) -> Json<Vec<Ingredient>> {
    let mut ingredients: Vec<Ingredient> = state
        .store
        .ingredients
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    ingredients.sort_by(|a, b| a.name.cmp(&b.name));
    Json(ingredients)
}

async fn create_pizza(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreatePizzaRequest>,
) -> Result<Json<PizzaListing>, AppError> {
    require_text("name", &payload.name)?;
    check_price("base_price", payload.base_price)?;
    if payload.ingredient_ids.is_empty() {
        return Err(AppError::BadRequest("pizza needs at least one ingredient".to_string()));
    }

    let pizza = Pizza {
        id: Uuid::new_v4(),
        name: payload.name,
        base_price: payload.base_price,
        category: payload.category,
        ingredient_ids: payload.ingredient_ids,
    };
    let final_price = pizza_price(&state.store, &pizza)?;

    state.store.pizzas.insert(pizza.id, pizza.clone());
    Ok(Json(PizzaListing { pizza, final_price }))
}

async fn list_pizzas(State(state): State<Arc<AppState>>) -> Result<Json<Vec<PizzaListing>>, AppError> {
    let mut pizzas: Vec<Pizza> = state
        .store
        .pizzas
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    pizzas.sort_by(|a, b| a.name.cmp(&b.name));

    let listings = pizzas
        .into_iter()
        .map(|pizza| {
            let final_price = pizza_price(&state.store, &pizza)?;
            Ok(PizzaListing { pizza, final_price })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(Json(listings))
}

async fn create_drink(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PricedItemRequest>,
) -> Result<Json<Drink>, AppError> {
    payload.validate()?;

    let drink = Drink {
        id: Uuid::new_v4(),
        name: payload.name,
        price: payload.price,
    };

    state.store.drinks.insert(drink.id, drink.clone());
    Ok(Json(drink))
}

async fn list_drinks(State(state): State<Arc<AppState>>) -> Json<Vec<Drink>> {
    let mut drinks: Vec<Drink> = state
        .store
        .drinks
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    drinks.sort_by(|a, b| a.name.cmp(&b.name));
    Json(drinks)
}

async fn create_dessert(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PricedItemRequest>,
) -> Result<Json<Dessert>, AppError> {
    payload.validate()?;

    let dessert = Dessert {
        id: Uuid::new_v4(),
        name: payload.name,
        price: payload.price,
    };

    state.store.desserts.insert(dessert.id, dessert.clone());
    Ok(Json(dessert))
}

async fn list_desserts(State(state): State<Arc<AppState>>) -> Json<Vec<Dessert>> {
    let mut desserts: Vec<Dessert> = state
        .store
        .desserts
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    desserts.sort_by(|a, b| a.name.cmp(&b.name));
    Json(desserts)
}
