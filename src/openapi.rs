use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = r#"
# Storefront API

CRUD backend for a small e-commerce application: accounts with JWT
authentication, a product catalog with image upload, categories,
per-user shopping carts and order placement.

## Authentication

Protected endpoints expect a bearer token:

```
Authorization: Bearer <your-jwt-token>
```

Tokens are issued by `/auth/signup` and `/auth/login` and revoked by
`/auth/logout`; a revoked token fails every later request.

## Rate Limiting

Requests are rate-limited per client IP. Responses carry
`X-RateLimit-Limit`, `X-RateLimit-Remaining` and `X-RateLimit-Reset`.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Auth", description = "Account signup, login, logout and profile"),
        (name = "Products", description = "Product catalog management and search"),
        (name = "Categories", description = "Category management"),
        (name = "Cart", description = "Per-user shopping cart"),
        (name = "Orders", description = "Order placement and history")
    ),
    paths(
        // Auth
        crate::handlers::auth::signup,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::profile,

        // Products
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::search_products,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,

        // Categories
        crate::handlers::categories::create_category,
        crate::handlers::categories::list_categories,
        crate::handlers::categories::get_category,
        crate::handlers::categories::get_category_by_slug,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,

        // Cart
        crate::handlers::carts::add_to_cart,
        crate::handlers::carts::get_cart,
        crate::handlers::carts::get_cart_count,
        crate::handlers::carts::update_cart_item,
        crate::handlers::carts::remove_from_cart,
        crate::handlers::carts::clear_cart,

        // Orders
        crate::handlers::orders::place_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::cancel_order,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::handlers::auth::SignupRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::AuthDataResponse,
            crate::handlers::auth::ProfileResponse,
            crate::handlers::products::ProductResponse,
            crate::handlers::products::ProductSearchResponse,
            crate::handlers::categories::CreateCategoryRequest,
            crate::handlers::categories::UpdateCategoryRequest,
            crate::handlers::categories::CategoryResponse,
            crate::handlers::carts::AddToCartRequest,
            crate::handlers::carts::UpdateCartItemRequest,
            crate::handlers::carts::CartLineResponse,
            crate::handlers::carts::CartResponse,
            crate::handlers::orders::PlaceOrderRequest,
            crate::handlers::orders::OrderResponse,
            crate::handlers::orders::OrderItemResponse,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("Storefront API"));
        assert!(json.contains("/products/search"));
        assert!(json.contains("/auth/logout"));
    }
}
