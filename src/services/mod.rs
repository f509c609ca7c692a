//! Business logic used by the HTTP handlers.
//!
//! Each service wraps the shared connection pool and performs the
//! single-table reads/writes for its resource.

pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod categories;
pub mod orders;
pub mod uploads;

pub use accounts::AccountService;
pub use cart::CartService;
pub use catalog::ProductCatalogService;
pub use categories::CategoryService;
pub use orders::OrderService;
pub use uploads::ImageStore;
