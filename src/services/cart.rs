use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{cart_item, CartItem, CartItemModel, Product, ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Cart service. Every operation is scoped to the owning user; cart
/// line ids from other users behave as if they do not exist.
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

/// Direction for quantity adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QuantityAction {
    Increment,
    Decrement,
}

/// One cart line joined with its product summary.
#[derive(Debug)]
pub struct CartLine {
    pub item: CartItemModel,
    pub product: ProductModel,
    pub line_total: Decimal,
}

/// The whole cart with computed totals.
#[derive(Debug)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub cart_total: Decimal,
    pub item_count: u64,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Add a product to the user's cart. An existing line for the same
    /// product has its quantity incremented instead of duplicating.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartLine, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let existing = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;

        let item = match existing {
            Some(item) => {
                let new_quantity = item.quantity + quantity;
                let mut active: cart_item::ActiveModel = item.into();
                active.quantity = Set(new_quantity);
                active.updated_at = Set(Utc::now());
                active.update(&*self.db).await?
            }
            None => {
                let now = Utc::now();
                let item = cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    product_id: Set(product_id),
                    quantity: Set(quantity),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                item.insert(&*self.db).await?
            }
        };

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                user_id,
                product_id,
                quantity,
            })
            .await;

        info!(%user_id, %product_id, "cart item added");
        let line_total = product.price * Decimal::from(item.quantity);
        Ok(CartLine {
            item,
            product,
            line_total,
        })
    }

    /// All cart lines for a user, with product summaries and totals.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        let mut lines = Vec::with_capacity(rows.len());
        let mut cart_total = Decimal::ZERO;
        for (item, product) in rows {
            // A dangling product means the FK is broken; surface it.
            let product = product.ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Cart line {} references a missing product",
                    item.id
                ))
            })?;
            let line_total = product.price * Decimal::from(item.quantity);
            cart_total += line_total;
            lines.push(CartLine {
                item,
                product,
                line_total,
            });
        }

        let item_count = lines.len() as u64;
        Ok(CartView {
            lines,
            cart_total,
            item_count,
        })
    }

    /// Number of cart lines for a user.
    #[instrument(skip(self))]
    pub async fn count_items(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .count(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Adjust a cart line's quantity by one in either direction.
    #[instrument(skip(self))]
    pub async fn adjust_quantity(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        action: QuantityAction,
    ) -> Result<CartLine, ServiceError> {
        let item = self.find_owned_item(user_id, item_id).await?;

        let new_quantity = match action {
            QuantityAction::Increment => item.quantity + 1,
            QuantityAction::Decrement => item.quantity - 1,
        };
        if new_quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let product_id = item.product_id;
        let mut active: cart_item::ActiveModel = item.into();
        active.quantity = Set(new_quantity);
        active.updated_at = Set(Utc::now());
        let item = active.update(&*self.db).await?;

        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let line_total = product.price * Decimal::from(item.quantity);
        Ok(CartLine {
            item,
            product,
            line_total,
        })
    }

    /// Remove one cart line.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let item = self.find_owned_item(user_id, item_id).await?;
        item.delete(&*self.db).await?;
        info!(%user_id, %item_id, "cart item removed");
        Ok(())
    }

    /// Clear the user's cart, returning the number of removed lines.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let result = CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        self.event_sender
            .send_or_log(Event::CartCleared(user_id))
            .await;

        info!(%user_id, deleted = result.rows_affected, "cart cleared");
        Ok(result.rows_affected)
    }

    async fn find_owned_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<CartItemModel, ServiceError> {
        CartItem::find_by_id(item_id)
            .filter(cart_item::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))
    }
}
