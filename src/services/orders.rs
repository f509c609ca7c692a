use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        cart_item, order, order_item, CartItem, Order, OrderItem, OrderItemModel, OrderModel,
        OrderStatus, PaymentStatus, Product,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Order service. Placement converts the user's cart into an order
/// header plus snapshot line items inside one transaction.
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

/// Shipping and payment details captured at checkout.
#[derive(Debug)]
pub struct PlaceOrderInput {
    pub shipping_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub phone_number: String,
    pub payment_method: String,
    pub notes: Option<String>,
}

/// An order header with its line items.
#[derive(Debug)]
pub struct OrderWithItems {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

#[derive(Debug)]
pub struct OrderPage {
    pub orders: Vec<OrderModel>,
    pub total: u64,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Place an order from the user's current cart.
    #[instrument(skip(self, input))]
    pub async fn place_order(
        &self,
        user_id: Uuid,
        input: PlaceOrderInput,
    ) -> Result<OrderWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let cart_rows = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .find_also_related(Product)
            .all(&txn)
            .await?;

        if cart_rows.is_empty() {
            return Err(ServiceError::ValidationError("Cart is empty".to_string()));
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let mut total_amount = Decimal::ZERO;
        let mut total_items: i32 = 0;
        let mut items = Vec::with_capacity(cart_rows.len());

        for (line, product) in &cart_rows {
            let product = product.as_ref().ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Cart line {} references a missing product",
                    line.id
                ))
            })?;

            let line_total = product.price * Decimal::from(line.quantity);
            total_amount += line_total;
            total_items += line.quantity;

            items.push(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                quantity: Set(line.quantity),
                unit_price: Set(product.price),
                total_price: Set(line_total),
                product_name: Set(product.name.clone()),
                product_sku: Set(product.sku.clone()),
                created_at: Set(now),
            });
        }

        let header = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            order_number: Set(generate_order_number()),
            total_amount: Set(total_amount),
            total_items: Set(total_items),
            status: Set(OrderStatus::Pending),
            shipping_address: Set(input.shipping_address),
            city: Set(input.city),
            state: Set(input.state),
            zip_code: Set(input.zip_code),
            country: Set(input.country),
            phone_number: Set(input.phone_number),
            payment_method: Set(input.payment_method),
            payment_status: Set(PaymentStatus::Pending),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let header = header.insert(&txn).await?;

        let mut inserted_items = Vec::with_capacity(items.len());
        for item in items {
            inserted_items.push(item.insert(&txn).await?);
        }

        CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderPlaced {
                order_id,
                user_id,
            })
            .await;

        info!(%order_id, %user_id, total = %header.total_amount, "order placed");
        Ok(OrderWithItems {
            order: header,
            items: inserted_items,
        })
    }

    /// The caller's orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        user_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<OrderPage, ServiceError> {
        let query = Order::find().filter(order::Column::UserId.eq(user_id));

        let total = query.clone().count(&*self.db).await?;

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, limit.max(1));
        let page_index = offset / limit.max(1);
        let orders = paginator.fetch_page(page_index).await?;

        Ok(OrderPage { orders, total })
    }

    /// One order with its items, scoped to the owner.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderWithItems, ServiceError> {
        let order = Order::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;

        Ok(OrderWithItems { order, items })
    }

    /// Cancel a pending order.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        let existing = self.get_order(user_id, order_id).await?.order;

        if existing.status != OrderStatus::Pending {
            return Err(ServiceError::ValidationError(format!(
                "Only pending orders can be cancelled (status is {:?})",
                existing.status
            )));
        }

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(OrderStatus::Cancelled);
        active.updated_at = Set(Utc::now());
        let order = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderCancelled(order_id))
            .await;

        info!(%order_id, "order cancelled");
        Ok(order)
    }
}

/// Order numbers are unique by construction with overwhelming
/// probability; the unique index is the backstop.
fn generate_order_number() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();
    format!("SO-{}-{}", Utc::now().format("%Y%m%d%H%M%S"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_have_expected_shape() {
        let number = generate_order_number();
        assert!(number.starts_with("SO-"));
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].len(), 14);
        assert_eq!(parts[2].len(), 6);
    }
}
