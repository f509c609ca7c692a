use axum::{
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{AuthRouterExt, AuthenticatedUser},
    entities::ProductModel,
    errors::ApiError,
    handlers::common::{
        created_response, no_content_response, success_response, success_with_message,
        validate_input, PaginatedResponse, PaginationParams,
    },
    services::catalog::{
        CreateProductInput, ProductSearchQuery, ProductSortKey, SortOrder, UpdateProductInput,
    },
    AppState,
};

const MAX_PAGE_SIZE: u64 = 100;

/// Creates the router for product endpoints
pub fn products_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_product))
        .route("/:id", put(update_product))
        .route("/:id", delete(delete_product))
        .with_auth();

    Router::new()
        .route("/", get(list_products))
        .route("/search", get(search_products))
        .route("/:id", get(get_product))
        .merge(protected)
}

// Multipart form assembly

#[derive(Debug, Default, Validate)]
struct ProductForm {
    #[validate(length(min = 1, max = 200, message = "Product name cannot be blank"))]
    name: Option<String>,
    price: Option<Decimal>,
    #[validate(length(max = 2000))]
    description: Option<String>,
    #[validate(length(min = 1, max = 100, message = "SKU cannot be blank"))]
    sku: Option<String>,
    category_id: Option<Uuid>,
    image: Option<UploadedImage>,
}

#[derive(Debug)]
struct UploadedImage {
    filename: String,
    bytes: Vec<u8>,
}

/// Drain an incoming multipart form into a [`ProductForm`].
///
/// Unknown parts are ignored; the image part only contributes when it
/// actually carries bytes (browsers submit an empty file part when the
/// picker was left untouched).
async fn read_product_form(
    mut multipart: Multipart,
    max_upload_size: usize,
) -> Result<ProductForm, ApiError> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart payload: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "name" => form.name = Some(text_field(field, "name").await?),
            "description" => form.description = Some(text_field(field, "description").await?),
            "sku" => form.sku = Some(text_field(field, "sku").await?),
            "price" => {
                let raw = text_field(field, "price").await?;
                let price = Decimal::from_str(raw.trim()).map_err(|_| {
                    ApiError::ValidationError(format!("price '{}' is not a number", raw))
                })?;
                if price < Decimal::ZERO {
                    return Err(ApiError::ValidationError(
                        "price cannot be negative".to_string(),
                    ));
                }
                form.price = Some(price);
            }
            "category_id" => {
                let raw = text_field(field, "category_id").await?;
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    let id = Uuid::parse_str(trimmed).map_err(|_| {
                        ApiError::ValidationError(format!(
                            "category_id '{}' is not a valid UUID",
                            trimmed
                        ))
                    })?;
                    form.category_id = Some(id);
                }
            }
            "image" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload.bin".to_string());
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed reading image upload: {}", e))
                })?;
                if bytes.len() > max_upload_size {
                    return Err(ApiError::ValidationError(format!(
                        "Image exceeds the maximum upload size of {} bytes",
                        max_upload_size
                    )));
                }
                if !bytes.is_empty() {
                    form.image = Some(UploadedImage {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn text_field(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed reading field '{}': {}", name, e)))
}

// Handler functions

/// Create a product from a multipart form with an optional image part
#[utoipa::path(
    post,
    path = "/products",
    responses(
        (status = 201, description = "Product created", body = crate::ApiResponse<ProductResponse>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate SKU", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn create_product(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_product_form(multipart, state.config.max_upload_size).await?;
    validate_input(&form)?;

    let name = form
        .name
        .ok_or_else(|| ApiError::ValidationError("name is required".to_string()))?;
    let sku = form
        .sku
        .ok_or_else(|| ApiError::ValidationError("sku is required".to_string()))?;
    let price = form
        .price
        .ok_or_else(|| ApiError::ValidationError("price is required".to_string()))?;

    let image_path = match form.image {
        Some(image) => Some(
            state
                .services
                .catalog
                .image_store()
                .save(&image.filename, &image.bytes)
                .await?,
        ),
        None => None,
    };

    let product = state
        .services
        .catalog
        .create_product(CreateProductInput {
            name: name.trim().to_string(),
            price,
            description: form.description.filter(|d| !d.trim().is_empty()),
            sku: sku.trim().to_string(),
            category_id: form.category_id,
            image_path,
        })
        .await?;

    Ok(created_response(
        ProductResponse::from(product),
        "Product created",
    ))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product retrieved", body = crate::ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.services.catalog.get_product(id).await?;
    Ok(success_response(ProductResponse::from(product)))
}

/// Update a product; fields omitted from the form are left untouched
#[utoipa::path(
    put,
    path = "/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product updated", body = crate::ApiResponse<ProductResponse>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate SKU", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn update_product(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_product_form(multipart, state.config.max_upload_size).await?;
    validate_input(&form)?;

    let image_path = match form.image {
        Some(image) => Some(
            state
                .services
                .catalog
                .image_store()
                .save(&image.filename, &image.bytes)
                .await?,
        ),
        None => None,
    };

    let product = state
        .services
        .catalog
        .update_product(
            id,
            UpdateProductInput {
                name: form.name.map(|n| n.trim().to_string()),
                price: form.price,
                description: form.description,
                sku: form.sku.map(|s| s.trim().to_string()),
                category_id: form.category_id,
                image_path,
            },
        )
        .await?;

    Ok(success_with_message(
        ProductResponse::from(product),
        "Product updated",
    ))
}

/// Delete a product and its uploaded image
#[utoipa::path(
    delete,
    path = "/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.catalog.delete_product(id).await?;
    Ok(no_content_response())
}

/// List products with pagination and an optional name filter
#[utoipa::path(
    get,
    path = "/products",
    params(PaginationParams, ListFilter),
    responses(
        (status = 200, description = "Products retrieved", body = crate::ApiResponse<PaginatedResponse<ProductResponse>>),
        (status = 400, description = "Invalid query parameters", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ListFilter>,
) -> Result<impl IntoResponse, ApiError> {
    pagination.validate_against(MAX_PAGE_SIZE)?;

    let result = state
        .services
        .catalog
        .list_products(filter.search, pagination.limit, pagination.offset())
        .await?;

    let items: Vec<ProductResponse> = result
        .products
        .into_iter()
        .map(ProductResponse::from)
        .collect();

    Ok(success_response(PaginatedResponse::new(
        items,
        pagination.page,
        pagination.limit,
        result.total,
    )))
}

/// Search products across name, SKU and description
#[utoipa::path(
    get,
    path = "/products/search",
    params(ProductSearchParams),
    responses(
        (status = 200, description = "Search results", body = crate::ApiResponse<ProductSearchResponse>),
        (status = 400, description = "Invalid query parameters", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<ProductSearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination = PaginationParams {
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(10),
    };
    pagination.validate_against(MAX_PAGE_SIZE)?;

    if let (Some(min), Some(max)) = (params.min_price, params.max_price) {
        if min > max {
            return Err(ApiError::ValidationError(
                "min_price cannot exceed max_price".to_string(),
            ));
        }
    }

    let result = state
        .services
        .catalog
        .search_products(ProductSearchQuery {
            q: params.q,
            sku: params.sku,
            min_price: params.min_price,
            max_price: params.max_price,
            category_id: params.category_id,
            sort_by: params.sort_by,
            order: params.order,
            limit: Some(pagination.limit),
            offset: Some(pagination.offset()),
        })
        .await?;

    let items: Vec<ProductResponse> = result
        .products
        .into_iter()
        .map(ProductResponse::from)
        .collect();

    Ok(success_response(ProductSearchResponse {
        total: result.total,
        items,
        page: pagination.page,
        limit: pagination.limit,
    }))
}

// Request/Response DTOs

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilter {
    /// Substring filter on product name
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductSearchParams {
    /// Substring matched against name, SKU and description
    #[serde(default)]
    pub q: Option<String>,
    /// Exact SKU match
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub min_price: Option<Decimal>,
    #[serde(default)]
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    /// name | price | created_at (default created_at)
    #[serde(default)]
    pub sort_by: Option<ProductSortKey>,
    /// asc | desc (default desc)
    #[serde(default)]
    pub order: Option<SortOrder>,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "550e8400-e29b-41d4-a716-446655440000",
    "name": "Wireless Headphones",
    "price": "149.99",
    "description": "Over-ear wireless headphones with noise cancellation.",
    "sku": "WH-BLK-001",
    "category_id": "660e8400-e29b-41d4-a716-446655440001",
    "image_path": "/uploads/products/9f0d6c32.jpg",
    "created_at": "2025-06-09T10:30:00Z",
    "updated_at": "2025-06-09T10:30:00Z"
}))]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductModel> for ProductResponse {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: model.price,
            description: model.description,
            sku: model.sku,
            category_id: model.category_id,
            image_path: model.image_path,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductSearchResponse {
    pub items: Vec<ProductResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}
