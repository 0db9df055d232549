use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::cart::{CartDecrement, CartLineItem, ProductKey};
use crate::errors::AppError;
use crate::handlers::identity::CustomerId;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

/// Exactly one of `dish_id` / `setmeal_id` must be present.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CartItemRequest {
    pub dish_id: Option<Uuid>,
    pub setmeal_id: Option<Uuid>,
    /// Flavor selector; only meaningful for dishes.
    pub dish_flavor: Option<String>,
}

impl CartItemRequest {
    pub fn into_key(self) -> Result<ProductKey, AppError> {
        match (self.dish_id, self.setmeal_id) {
            (Some(dish), None) => Ok(ProductKey::dish(dish, self.dish_flavor)),
            (None, Some(setmeal)) => Ok(ProductKey::setmeal(setmeal)),
            _ => Err(AppError::BadRequest(
                "exactly one of dish_id and setmeal_id is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartLineResponse {
    pub id: Uuid,
    pub product_kind: String,
    pub product_id: Uuid,
    pub dish_flavor: Option<String>,
    pub name: String,
    pub image: Option<String>,
    /// Unit price snapshot as a decimal string, e.g. "18.00"
    pub amount: String,
    pub number: i32,
    pub created_at: DateTime<Utc>,
}

impl From<CartLineItem> for CartLineResponse {
    fn from(l: CartLineItem) -> Self {
        CartLineResponse {
            id: l.id,
            product_kind: l.key.kind.as_str().to_string(),
            product_id: l.key.product_id,
            dish_flavor: l.key.flavor,
            name: l.name,
            image: l.image,
            amount: l.unit_price.to_string(),
            number: l.quantity,
            created_at: l.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartSubtractResponse {
    /// Units left on the line; 0 once it is removed or if it never existed.
    pub remaining: i32,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /user/cart/add
///
/// Adds one unit. Repeated adds of the same product and flavor increment the
/// existing line.
#[utoipa::path(
    post,
    path = "/user/cart/add",
    request_body = CartItemRequest,
    responses(
        (status = 204, description = "Added"),
        (status = 400, description = "Neither or both product ids given"),
        (status = 404, description = "Product not in catalog"),
    ),
    tag = "cart"
)]
pub async fn add_to_cart(
    state: web::Data<AppState>,
    user: CustomerId,
    body: web::Json<CartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let key = body.into_inner().into_key()?;

    web::block(move || state.cart.add(user.0, key, Utc::now())).await??;

    Ok(HttpResponse::NoContent().finish())
}

/// POST /user/cart/sub
///
/// Takes one unit off a line, deleting it at zero. Unknown lines are ignored.
#[utoipa::path(
    post,
    path = "/user/cart/sub",
    request_body = CartItemRequest,
    responses(
        (status = 200, description = "Remaining quantity", body = CartSubtractResponse),
        (status = 400, description = "Neither or both product ids given"),
    ),
    tag = "cart"
)]
pub async fn subtract_from_cart(
    state: web::Data<AppState>,
    user: CustomerId,
    body: web::Json<CartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let key = body.into_inner().into_key()?;

    let outcome = web::block(move || state.cart.subtract(user.0, &key)).await??;

    let remaining = match outcome {
        CartDecrement::Decremented { remaining } => remaining,
        CartDecrement::Removed | CartDecrement::Missing => 0,
    };
    Ok(HttpResponse::Ok().json(CartSubtractResponse { remaining }))
}

/// GET /user/cart
#[utoipa::path(
    get,
    path = "/user/cart",
    responses(
        (status = 200, description = "Cart lines", body = [CartLineResponse]),
    ),
    tag = "cart"
)]
pub async fn list_cart(
    state: web::Data<AppState>,
    user: CustomerId,
) -> Result<HttpResponse, AppError> {
    let lines = web::block(move || state.cart.list(user.0)).await??;

    let body: Vec<CartLineResponse> = lines.into_iter().map(CartLineResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// DELETE /user/cart
#[utoipa::path(
    delete,
    path = "/user/cart",
    responses(
        (status = 204, description = "Cart emptied"),
    ),
    tag = "cart"
)]
pub async fn clear_cart(
    state: web::Data<AppState>,
    user: CustomerId,
) -> Result<HttpResponse, AppError> {
    web::block(move || state.cart.clear(user.0)).await??;

    Ok(HttpResponse::NoContent().finish())
}
