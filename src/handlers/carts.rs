use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{AuthRouterExt, AuthenticatedUser},
    errors::ApiError,
    handlers::common::{created_response, success_response, success_with_message, validate_input},
    services::cart::{CartLine, CartView, QuantityAction},
    AppState,
};

/// Creates the router for cart endpoints. Every route requires auth and
/// operates on the caller's own cart.
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart))
        .route("/", delete(clear_cart))
        .route("/count", get(get_cart_count))
        .route("/items", post(add_to_cart))
        .route("/items/:id", put(update_cart_item))
        .route("/items/:id", delete(remove_from_cart))
        .with_auth()
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "product_id": "550e8400-e29b-41d4-a716-446655440000",
    "quantity": 2
}))]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    /// Defaults to 1 when omitted
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({"action": "increment"}))]
pub struct UpdateCartItemRequest {
    /// increment | decrement
    pub action: QuantityAction,
}

/// Product summary embedded in a cart line
#[derive(Debug, Serialize, ToSchema)]
pub struct CartProductSummary {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    pub id: Uuid,
    pub quantity: i32,
    pub product: CartProductSummary,
    pub line_total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CartLine> for CartLineResponse {
    fn from(line: CartLine) -> Self {
        Self {
            id: line.item.id,
            quantity: line.item.quantity,
            product: CartProductSummary {
                id: line.product.id,
                name: line.product.name,
                price: line.product.price,
                image_path: line.product.image_path,
            },
            line_total: line.line_total,
            created_at: line.item.created_at,
            updated_at: line.item.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub items: Vec<CartLineResponse>,
    pub cart_total: Decimal,
    pub item_count: u64,
}

impl From<CartView> for CartResponse {
    fn from(view: CartView) -> Self {
        Self {
            cart_total: view.cart_total,
            item_count: view.item_count,
            items: view.lines.into_iter().map(CartLineResponse::from).collect(),
        }
    }
}

// Handler functions

/// Add a product to the cart (increments quantity when already present)
#[utoipa::path(
    post,
    path = "/cart/items",
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "Item added", body = crate::ApiResponse<CartLineResponse>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<AddToCartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let line = state
        .services
        .cart
        .add_item(user.user_id, payload.product_id, payload.quantity)
        .await?;

    Ok(created_response(
        CartLineResponse::from(line),
        "Item added to cart successfully",
    ))
}

/// All cart lines with product summaries and totals
#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "Cart retrieved", body = crate::ApiResponse<CartResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.services.cart.get_cart(user.user_id).await?;
    Ok(success_response(CartResponse::from(view)))
}

/// Number of lines in the cart
#[utoipa::path(
    get,
    path = "/cart/count",
    responses(
        (status = 200, description = "Cart count retrieved"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn get_cart_count(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let count = state.services.cart.count_items(user.user_id).await?;
    Ok(success_response(serde_json::json!({ "count": count })))
}

/// Adjust a cart line's quantity by one
#[utoipa::path(
    put,
    path = "/cart/items/:id",
    params(("id" = Uuid, Path, description = "Cart item ID")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Cart item updated", body = crate::ApiResponse<CartLineResponse>),
        (status = 400, description = "Quantity would fall below 1", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let line = state
        .services
        .cart
        .adjust_quantity(user.user_id, item_id, payload.action)
        .await?;

    Ok(success_with_message(
        CartLineResponse::from(line),
        "Cart item updated successfully",
    ))
}

/// Remove one cart line
#[utoipa::path(
    delete,
    path = "/cart/items/:id",
    params(("id" = Uuid, Path, description = "Cart item ID")),
    responses(
        (status = 200, description = "Item removed"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.cart.remove_item(user.user_id, item_id).await?;
    Ok(success_with_message(
        serde_json::json!({}),
        "Item removed from cart successfully",
    ))
}

/// Clear the entire cart
#[utoipa::path(
    delete,
    path = "/cart",
    responses(
        (status = 200, description = "Cart cleared"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.services.cart.clear_cart(user.user_id).await?;
    Ok(success_with_message(
        serde_json::json!({ "deleted_count": deleted }),
        "Cart cleared successfully",
    ))
}
