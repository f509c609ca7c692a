mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::errors::ServiceError;
use storefront_api::services::accounts::SignupInput;
use storefront_api::services::cart::QuantityAction;
use storefront_api::services::catalog::CreateProductInput;
use uuid::Uuid;

async fn setup_user(app: &TestApp, email: &str, phone: &str) -> Uuid {
    app.services
        .accounts
        .signup(SignupInput {
            name: "Cart Tester".into(),
            email: email.into(),
            phone: phone.into(),
            password: "Str0ng!Passw0rd".into(),
        })
        .await
        .expect("signup should succeed")
        .user
        .id
}

async fn setup_product(app: &TestApp, sku: &str, price: rust_decimal::Decimal) -> Uuid {
    app.services
        .catalog
        .create_product(CreateProductInput {
            name: format!("Product {}", sku),
            price,
            description: None,
            sku: sku.into(),
            category_id: None,
            image_path: None,
        })
        .await
        .expect("product create should succeed")
        .id
}

#[tokio::test]
async fn add_item_creates_line_with_quantity() {
    let app = TestApp::new().await;
    let user = setup_user(&app, "cart@example.com", "5550000001").await;
    let product = setup_product(&app, "CART-1", dec!(19.99)).await;

    let line = app
        .services
        .cart
        .add_item(user, product, 2)
        .await
        .expect("add should succeed");

    assert_eq!(line.item.quantity, 2);
    assert_eq!(line.line_total, dec!(39.98));
}

#[tokio::test]
async fn adding_same_product_increments_existing_line() {
    let app = TestApp::new().await;
    let user = setup_user(&app, "cart@example.com", "5550000001").await;
    let product = setup_product(&app, "CART-1", dec!(10.00)).await;

    let first = app.services.cart.add_item(user, product, 1).await.unwrap();
    let second = app.services.cart.add_item(user, product, 3).await.unwrap();

    // Same row, bumped quantity
    assert_eq!(first.item.id, second.item.id);
    assert_eq!(second.item.quantity, 4);

    let count = app.services.cart.count_items(user).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn add_rejects_unknown_product_and_bad_quantity() {
    let app = TestApp::new().await;
    let user = setup_user(&app, "cart@example.com", "5550000001").await;
    let product = setup_product(&app, "CART-1", dec!(10.00)).await;

    let err = app
        .services
        .cart
        .add_item(user, Uuid::new_v4(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = app.services.cart.add_item(user, product, 0).await.unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn cart_view_computes_totals() {
    let app = TestApp::new().await;
    let user = setup_user(&app, "cart@example.com", "5550000001").await;
    let cheap = setup_product(&app, "CHEAP", dec!(5.00)).await;
    let pricey = setup_product(&app, "PRICEY", dec!(100.00)).await;

    app.services.cart.add_item(user, cheap, 3).await.unwrap();
    app.services.cart.add_item(user, pricey, 1).await.unwrap();

    let view = app.services.cart.get_cart(user).await.unwrap();
    assert_eq!(view.item_count, 2);
    assert_eq!(view.cart_total, dec!(115.00));

    let cheap_line = view
        .lines
        .iter()
        .find(|l| l.product.sku == "CHEAP")
        .unwrap();
    assert_eq!(cheap_line.line_total, dec!(15.00));
}

#[tokio::test]
async fn adjust_quantity_in_both_directions() {
    let app = TestApp::new().await;
    let user = setup_user(&app, "cart@example.com", "5550000001").await;
    let product = setup_product(&app, "ADJ-1", dec!(10.00)).await;

    let line = app.services.cart.add_item(user, product, 1).await.unwrap();

    let bumped = app
        .services
        .cart
        .adjust_quantity(user, line.item.id, QuantityAction::Increment)
        .await
        .unwrap();
    assert_eq!(bumped.item.quantity, 2);

    let dropped = app
        .services
        .cart
        .adjust_quantity(user, line.item.id, QuantityAction::Decrement)
        .await
        .unwrap();
    assert_eq!(dropped.item.quantity, 1);

    // Below 1 is rejected and the line survives
    let err = app
        .services
        .cart
        .adjust_quantity(user, line.item.id, QuantityAction::Decrement)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
    assert_eq!(app.services.cart.count_items(user).await.unwrap(), 1);
}

#[tokio::test]
async fn cart_lines_are_scoped_to_their_owner() {
    let app = TestApp::new().await;
    let owner = setup_user(&app, "owner@example.com", "5550000001").await;
    let intruder = setup_user(&app, "intruder@example.com", "5550000002").await;
    let product = setup_product(&app, "SCOPE-1", dec!(10.00)).await;

    let line = app.services.cart.add_item(owner, product, 1).await.unwrap();

    // Another user's line id behaves as missing
    let err = app
        .services
        .cart
        .adjust_quantity(intruder, line.item.id, QuantityAction::Increment)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = app
        .services
        .cart
        .remove_item(intruder, line.item.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // The owner still sees it
    assert_eq!(app.services.cart.count_items(owner).await.unwrap(), 1);
}

#[tokio::test]
async fn remove_and_clear() {
    let app = TestApp::new().await;
    let user = setup_user(&app, "cart@example.com", "5550000001").await;
    let first = setup_product(&app, "RM-1", dec!(10.00)).await;
    let second = setup_product(&app, "RM-2", dec!(20.00)).await;

    let line = app.services.cart.add_item(user, first, 1).await.unwrap();
    app.services.cart.add_item(user, second, 1).await.unwrap();

    app.services
        .cart
        .remove_item(user, line.item.id)
        .await
        .expect("remove should succeed");
    assert_eq!(app.services.cart.count_items(user).await.unwrap(), 1);

    let deleted = app.services.cart.clear_cart(user).await.unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(app.services.cart.count_items(user).await.unwrap(), 0);
}
