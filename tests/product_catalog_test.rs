mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::errors::ServiceError;
use storefront_api::services::catalog::{
    CreateProductInput, ProductSearchQuery, ProductSortKey, SortOrder, UpdateProductInput,
};
use storefront_api::services::categories::CreateCategoryInput;
use uuid::Uuid;

fn product(name: &str, sku: &str, price: rust_decimal::Decimal) -> CreateProductInput {
    CreateProductInput {
        name: name.into(),
        price,
        description: Some(format!("{} description", name)),
        sku: sku.into(),
        category_id: None,
        image_path: None,
    }
}

#[tokio::test]
async fn create_then_fetch_returns_same_fields() {
    let app = TestApp::new().await;

    let created = app
        .services
        .catalog
        .create_product(product("Wireless Headphones", "WH-001", dec!(149.99)))
        .await
        .expect("create should succeed");

    let fetched = app
        .services
        .catalog
        .get_product(created.id)
        .await
        .expect("fetch should succeed");

    assert_eq!(fetched.name, "Wireless Headphones");
    assert_eq!(fetched.sku, "WH-001");
    assert_eq!(fetched.price, dec!(149.99));
    assert_eq!(fetched.description.as_deref(), Some("Wireless Headphones description"));
}

#[tokio::test]
async fn duplicate_sku_rejected() {
    let app = TestApp::new().await;
    app.services
        .catalog
        .create_product(product("First", "DUP-SKU", dec!(10.00)))
        .await
        .unwrap();

    let err = app
        .services
        .catalog
        .create_product(product("Second", "DUP-SKU", dec!(12.00)))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn unknown_category_rejected() {
    let app = TestApp::new().await;

    let mut input = product("Gadget", "GAD-1", dec!(5.00));
    input.category_id = Some(Uuid::new_v4());

    let err = app.services.catalog.create_product(input).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn product_joins_existing_category() {
    let app = TestApp::new().await;
    let category = app
        .services
        .categories
        .create_category(CreateCategoryInput {
            name: "Audio".into(),
            description: None,
            slug: "audio".into(),
        })
        .await
        .unwrap();

    let mut input = product("Speaker", "SPK-1", dec!(89.00));
    input.category_id = Some(category.id);

    let created = app.services.catalog.create_product(input).await.unwrap();
    assert_eq!(created.category_id, Some(category.id));
}

#[tokio::test]
async fn update_changes_fields_and_guards_sku() {
    let app = TestApp::new().await;
    let first = app
        .services
        .catalog
        .create_product(product("First", "SKU-1", dec!(10.00)))
        .await
        .unwrap();
    app.services
        .catalog
        .create_product(product("Second", "SKU-2", dec!(20.00)))
        .await
        .unwrap();

    let updated = app
        .services
        .catalog
        .update_product(
            first.id,
            UpdateProductInput {
                name: Some("First Renamed".into()),
                price: Some(dec!(11.50)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "First Renamed");
    assert_eq!(updated.price, dec!(11.50));

    // Taking another product's SKU must conflict
    let err = app
        .services
        .catalog
        .update_product(
            first.id,
            UpdateProductInput {
                sku: Some("SKU-2".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    // Re-asserting its own SKU is fine
    assert!(app
        .services
        .catalog
        .update_product(
            first.id,
            UpdateProductInput {
                sku: Some("SKU-1".into()),
                ..Default::default()
            },
        )
        .await
        .is_ok());
}

#[tokio::test]
async fn delete_removes_row_and_image_file() {
    let app = TestApp::new().await;

    let image_path = app
        .services
        .catalog
        .image_store()
        .save("photo.jpg", b"jpeg-bytes")
        .await
        .unwrap();
    let filename = image_path.rsplit('/').next().unwrap().to_string();
    assert!(app.upload_path().join(&filename).exists());

    let mut input = product("Disposable", "DEL-1", dec!(1.00));
    input.image_path = Some(image_path);
    let created = app.services.catalog.create_product(input).await.unwrap();

    app.services
        .catalog
        .delete_product(created.id)
        .await
        .expect("delete should succeed");

    let err = app.services.catalog.get_product(created.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    assert!(!app.upload_path().join(&filename).exists());
}

#[tokio::test]
async fn search_matches_name_sku_and_description() {
    let app = TestApp::new().await;
    app.services
        .catalog
        .create_product(product("Wireless Headphones", "WH-001", dec!(149.99)))
        .await
        .unwrap();
    app.services
        .catalog
        .create_product(product("Desk Lamp", "DL-002", dec!(39.99)))
        .await
        .unwrap();

    let by_name = app
        .services
        .catalog
        .search_products(ProductSearchQuery {
            q: Some("Wireless".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_name.total, 1);
    assert_eq!(by_name.products[0].sku, "WH-001");

    let by_sku_fragment = app
        .services
        .catalog
        .search_products(ProductSearchQuery {
            q: Some("DL-0".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_sku_fragment.total, 1);
    assert_eq!(by_sku_fragment.products[0].name, "Desk Lamp");
}

#[tokio::test]
async fn search_filters_price_range_and_exact_sku() {
    let app = TestApp::new().await;
    app.services
        .catalog
        .create_product(product("Cheap", "CH-1", dec!(5.00)))
        .await
        .unwrap();
    app.services
        .catalog
        .create_product(product("Mid", "MD-1", dec!(50.00)))
        .await
        .unwrap();
    app.services
        .catalog
        .create_product(product("Expensive", "EX-1", dec!(500.00)))
        .await
        .unwrap();

    let in_range = app
        .services
        .catalog
        .search_products(ProductSearchQuery {
            min_price: Some(dec!(10.00)),
            max_price: Some(dec!(100.00)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(in_range.total, 1);
    assert_eq!(in_range.products[0].name, "Mid");

    let exact = app
        .services
        .catalog
        .search_products(ProductSearchQuery {
            sku: Some("EX-1".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(exact.total, 1);
    assert_eq!(exact.products[0].name, "Expensive");
}

#[tokio::test]
async fn search_sorts_by_price() {
    let app = TestApp::new().await;
    for (name, sku, price) in [
        ("B", "S-B", dec!(20.00)),
        ("A", "S-A", dec!(10.00)),
        ("C", "S-C", dec!(30.00)),
    ] {
        app.services
            .catalog
            .create_product(product(name, sku, price))
            .await
            .unwrap();
    }

    let ascending = app
        .services
        .catalog
        .search_products(ProductSearchQuery {
            sort_by: Some(ProductSortKey::Price),
            order: Some(SortOrder::Asc),
            ..Default::default()
        })
        .await
        .unwrap();

    let prices: Vec<_> = ascending.products.iter().map(|p| p.price).collect();
    assert_eq!(prices, vec![dec!(10.00), dec!(20.00), dec!(30.00)]);
}

#[tokio::test]
async fn pagination_reports_full_total() {
    let app = TestApp::new().await;
    for i in 0..5 {
        app.services
            .catalog
            .create_product(product(&format!("Item {}", i), &format!("PG-{}", i), dec!(9.99)))
            .await
            .unwrap();
    }

    let page = app
        .services
        .catalog
        .list_products(None, 2, 0)
        .await
        .unwrap();
    assert_eq!(page.products.len(), 2);
    assert_eq!(page.total, 5);

    let last_page = app
        .services
        .catalog
        .list_products(None, 2, 4)
        .await
        .unwrap();
    assert_eq!(last_page.products.len(), 1);
}
