use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
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
    entities::{OrderItemModel, OrderModel, OrderStatus, PaymentStatus},
    errors::ApiError,
    handlers::common::{
        created_response, success_response, success_with_message, validate_input,
        PaginatedResponse, PaginationParams,
    },
    services::orders::{OrderWithItems, PlaceOrderInput},
    AppState,
};

const MAX_PAGE_SIZE: u64 = 100;

/// Creates the router for order endpoints. Every route requires auth
/// and is scoped to the caller's own orders.
pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(place_order))
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/cancel", post(cancel_order))
        .with_auth()
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "shipping_address": "12 Analytical Engine Way",
    "city": "London",
    "state": "Greater London",
    "zip_code": "EC1A 1BB",
    "country": "United Kingdom",
    "phone_number": "5551234567",
    "payment_method": "card",
    "notes": "Leave at the front desk"
}))]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, max = 255, message = "Shipping address is required"))]
    pub shipping_address: String,
    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 100, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 1, max = 20, message = "Zip code is required"))]
    pub zip_code: String,
    #[validate(length(min = 1, max = 100, message = "Country is required"))]
    pub country: String,
    #[validate(length(min = 1, max = 20, message = "Phone number is required"))]
    pub phone_number: String,
    #[validate(length(min = 1, max = 50, message = "Payment method is required"))]
    pub payment_method: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub product_name: String,
    pub product_sku: String,
}

impl From<OrderItemModel> for OrderItemResponse {
    fn from(model: OrderItemModel) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
            total_price: model.total_price,
            product_name: model.product_name,
            product_sku: model.product_sku,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub total_amount: Decimal,
    pub total_items: i32,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub phone_number: String,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<OrderItemResponse>,
}

impl OrderResponse {
    fn from_header(order: OrderModel) -> Self {
        Self::from_parts(order, Vec::new())
    }

    fn from_parts(order: OrderModel, items: Vec<OrderItemModel>) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            total_amount: order.total_amount,
            total_items: order.total_items,
            status: order.status,
            shipping_address: order.shipping_address,
            city: order.city,
            state: order.state,
            zip_code: order.zip_code,
            country: order.country,
            phone_number: order.phone_number,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            notes: order.notes,
            created_at: order.created_at,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
        }
    }
}

impl From<OrderWithItems> for OrderResponse {
    fn from(value: OrderWithItems) -> Self {
        Self::from_parts(value.order, value.items)
    }
}

// Handler functions

/// Place an order from the current cart
#[utoipa::path(
    post,
    path = "/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = crate::ApiResponse<OrderResponse>),
        (status = 400, description = "Empty cart or invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let order = state
        .services
        .orders
        .place_order(
            user.user_id,
            PlaceOrderInput {
                shipping_address: payload.shipping_address,
                city: payload.city,
                state: payload.state,
                zip_code: payload.zip_code,
                country: payload.country,
                phone_number: payload.phone_number,
                payment_method: payload.payment_method,
                notes: payload.notes,
            },
        )
        .await?;

    Ok(created_response(
        OrderResponse::from(order),
        "Order placed successfully",
    ))
}

/// The caller's orders, newest first
#[utoipa::path(
    get,
    path = "/orders",
    params(PaginationParams),
    responses(
        (status = 200, description = "Orders retrieved", body = crate::ApiResponse<PaginatedResponse<OrderResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    pagination.validate_against(MAX_PAGE_SIZE)?;

    let page = state
        .services
        .orders
        .list_orders(user.user_id, pagination.limit, pagination.offset())
        .await?;

    let items: Vec<OrderResponse> = page
        .orders
        .into_iter()
        .map(OrderResponse::from_header)
        .collect();

    Ok(success_response(PaginatedResponse::new(
        items,
        pagination.page,
        pagination.limit,
        page.total,
    )))
}

/// One order with its line items
#[utoipa::path(
    get,
    path = "/orders/:id",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved", body = crate::ApiResponse<OrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.services.orders.get_order(user.user_id, order_id).await?;
    Ok(success_response(OrderResponse::from(order)))
}

/// Cancel a pending order
#[utoipa::path(
    post,
    path = "/orders/:id/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled", body = crate::ApiResponse<OrderResponse>),
        (status = 400, description = "Order is not pending", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .cancel_order(user.user_id, order_id)
        .await?;

    Ok(success_with_message(
        OrderResponse::from_header(order),
        "Order cancelled successfully",
    ))
}
