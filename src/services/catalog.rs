use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{product, Category, Product, ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
    services::uploads::ImageStore,
};

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

/// Product catalog service
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
    images: ImageStore,
    event_sender: EventSender,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>, images: ImageStore, event_sender: EventSender) -> Self {
        Self {
            db,
            images,
            event_sender,
        }
    }

    pub fn image_store(&self) -> &ImageStore {
        &self.images
    }

    /// Create a new product
    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        self.ensure_unique_sku(&input.sku, None).await?;
        if let Some(category_id) = input.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            price: Set(input.price),
            description: Set(input.description),
            sku: Set(input.sku),
            category_id: Set(input.category_id),
            image_path: Set(input.image_path),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let product = product.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product.id))
            .await;

        info!("Created product: {}", product.id);
        Ok(product)
    }

    /// Get a product by ID
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Update an existing product. A replaced image has its old file
    /// removed from disk.
    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        if let Some(ref sku) = input.sku {
            self.ensure_unique_sku(sku, Some(product_id)).await?;
        }
        if let Some(category_id) = input.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        let product = self.get_product(product_id).await?;
        let previous_image = product.image_path.clone();
        let mut active: product::ActiveModel = product.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(sku) = input.sku {
            active.sku = Set(sku);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(Some(category_id));
        }
        let image_replaced = input.image_path.is_some();
        if let Some(image_path) = input.image_path {
            active.image_path = Set(Some(image_path));
        }
        active.updated_at = Set(Utc::now());

        let product = active.update(&*self.db).await?;

        if image_replaced {
            if let Some(old) = previous_image {
                self.images.delete(&old).await;
            }
        }

        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;

        info!("Updated product: {}", product_id);
        Ok(product)
    }

    /// Delete a product and its uploaded image file.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let product = self.get_product(product_id).await?;
        let image_path = product.image_path.clone();

        product.delete(&*self.db).await?;

        if let Some(path) = image_path {
            self.images.delete(&path).await;
        }

        self.event_sender
            .send_or_log(Event::ProductDeleted(product_id))
            .await;

        info!("Deleted product: {}", product_id);
        Ok(())
    }

    /// Search products with multi-field filters, sorting and pagination.
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        query: ProductSearchQuery,
    ) -> Result<ProductSearchResult, ServiceError> {
        let mut db_query = Product::find();

        if let Some(q) = query
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
        {
            db_query = db_query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(q))
                    .add(product::Column::Sku.contains(q))
                    .add(product::Column::Description.contains(q)),
            );
        }

        if let Some(sku) = query.sku.as_deref().filter(|s| !s.is_empty()) {
            db_query = db_query.filter(product::Column::Sku.eq(sku));
        }
        if let Some(min_price) = query.min_price {
            db_query = db_query.filter(product::Column::Price.gte(min_price));
        }
        if let Some(max_price) = query.max_price {
            db_query = db_query.filter(product::Column::Price.lte(max_price));
        }
        if let Some(category_id) = query.category_id {
            db_query = db_query.filter(product::Column::CategoryId.eq(category_id));
        }

        let total = db_query.clone().count(&*self.db).await?;

        let sort_column = match query.sort_by.unwrap_or(ProductSortKey::CreatedAt) {
            ProductSortKey::Name => product::Column::Name,
            ProductSortKey::Price => product::Column::Price,
            ProductSortKey::CreatedAt => product::Column::CreatedAt,
        };
        db_query = match query.order.unwrap_or(SortOrder::Desc) {
            SortOrder::Asc => db_query.order_by_asc(sort_column),
            SortOrder::Desc => db_query.order_by_desc(sort_column),
        };

        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = query.offset.unwrap_or(0);

        let products = db_query
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?;

        Ok(ProductSearchResult { products, total })
    }

    /// List products, optionally filtered on name.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        search: Option<String>,
        limit: u64,
        offset: u64,
    ) -> Result<ProductSearchResult, ServiceError> {
        self.search_products(ProductSearchQuery {
            q: search,
            limit: Some(limit),
            offset: Some(offset),
            ..Default::default()
        })
        .await
    }

    async fn ensure_unique_sku(
        &self,
        sku: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = Product::find().filter(product::Column::Sku.eq(sku));
        if let Some(id) = exclude_id {
            query = query.filter(product::Column::Id.ne(id));
        }

        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "SKU {} already exists",
                sku
            )));
        }

        Ok(())
    }

    async fn ensure_category_exists(&self, category_id: Uuid) -> Result<(), ServiceError> {
        if Category::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .is_none()
        {
            return Err(ServiceError::InvalidInput(format!(
                "Category {} does not exist",
                category_id
            )));
        }
        Ok(())
    }
}

/// Input for creating a product
#[derive(Debug)]
pub struct CreateProductInput {
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub sku: String,
    pub category_id: Option<Uuid>,
    pub image_path: Option<String>,
}

/// Input for updating a product
#[derive(Debug, Default)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub category_id: Option<Uuid>,
    pub image_path: Option<String>,
}

/// Sort keys accepted by product search
#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortKey {
    Name,
    Price,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Product search query
#[derive(Debug, Default)]
pub struct ProductSearchQuery {
    pub q: Option<String>,
    pub sku: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub sort_by: Option<ProductSortKey>,
    pub order: Option<SortOrder>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Product search result
#[derive(Debug)]
pub struct ProductSearchResult {
    pub products: Vec<ProductModel>,
    pub total: u64,
}
