pub mod auth;
pub mod carts;
pub mod categories;
pub mod common;
pub mod orders;
pub mod products;

use std::sync::Arc;

use crate::auth::AuthService;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    AccountService, CartService, CategoryService, ImageStore, OrderService, ProductCatalogService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountService>,
    pub catalog: Arc<ProductCatalogService>,
    pub categories: Arc<CategoryService>,
    pub cart: Arc<CartService>,
    pub orders: Arc<OrderService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        auth_service: Arc<AuthService>,
        image_store: ImageStore,
    ) -> Self {
        let accounts = Arc::new(AccountService::new(
            db_pool.clone(),
            auth_service,
            event_sender.clone(),
        ));
        let catalog = Arc::new(ProductCatalogService::new(
            db_pool.clone(),
            image_store,
            event_sender.clone(),
        ));
        let categories = Arc::new(CategoryService::new(db_pool.clone(), event_sender.clone()));
        let cart = Arc::new(CartService::new(db_pool.clone(), event_sender.clone()));
        let orders = Arc::new(OrderService::new(db_pool, event_sender));

        Self {
            accounts,
            catalog,
            categories,
            cart,
            orders,
        }
    }
}
