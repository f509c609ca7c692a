mod common;

use common::TestApp;
use storefront_api::errors::ServiceError;
use storefront_api::services::accounts::SignupInput;

fn signup_input(email: &str, phone: &str) -> SignupInput {
    SignupInput {
        name: "Ada Lovelace".into(),
        email: email.into(),
        phone: phone.into(),
        password: "Str0ng!Passw0rd".into(),
    }
}

#[tokio::test]
async fn signup_then_login_round_trip() {
    let app = TestApp::new().await;

    let registered = app
        .services
        .accounts
        .signup(signup_input("ada@example.com", "5551234567"))
        .await
        .expect("signup should succeed");

    assert_eq!(registered.user.email, "ada@example.com");
    assert_eq!(registered.user.phone, "5551234567");
    assert!(!registered.token.access_token.is_empty());
    // The stored value must be a hash, never the plaintext
    assert_ne!(registered.user.password_hash, "Str0ng!Passw0rd");

    let logged_in = app
        .services
        .accounts
        .login("ada@example.com", "Str0ng!Passw0rd")
        .await
        .expect("login should succeed");

    assert_eq!(logged_in.user.id, registered.user.id);
}

#[tokio::test]
async fn login_email_is_case_insensitive() {
    let app = TestApp::new().await;
    app.services
        .accounts
        .signup(signup_input("ada@example.com", "5551234567"))
        .await
        .unwrap();

    let logged_in = app
        .services
        .accounts
        .login("ADA@Example.COM", "Str0ng!Passw0rd")
        .await
        .expect("email lookup should normalize case");
    assert_eq!(logged_in.user.email, "ada@example.com");
}

#[tokio::test]
async fn duplicate_email_rejected_with_conflict() {
    let app = TestApp::new().await;
    app.services
        .accounts
        .signup(signup_input("ada@example.com", "5551234567"))
        .await
        .unwrap();

    let err = app
        .services
        .accounts
        .signup(signup_input("ada@example.com", "5559999999"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn duplicate_phone_rejected_with_conflict() {
    let app = TestApp::new().await;
    app.services
        .accounts
        .signup(signup_input("ada@example.com", "5551234567"))
        .await
        .unwrap();

    let err = app
        .services
        .accounts
        .signup(signup_input("grace@example.com", "5551234567"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn wrong_password_rejected() {
    let app = TestApp::new().await;
    app.services
        .accounts
        .signup(signup_input("ada@example.com", "5551234567"))
        .await
        .unwrap();

    let err = app
        .services
        .accounts
        .login("ada@example.com", "WrongPassword1!")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}

#[tokio::test]
async fn unknown_email_rejected() {
    let app = TestApp::new().await;

    let err = app
        .services
        .accounts
        .login("nobody@example.com", "whatever")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}

#[tokio::test]
async fn logout_revokes_token() {
    let app = TestApp::new().await;
    let account = app
        .services
        .accounts
        .signup(signup_input("ada@example.com", "5551234567"))
        .await
        .unwrap();

    let token = account.token.access_token.clone();
    assert!(app.auth.validate_token(&token).await.is_ok());

    app.services
        .accounts
        .logout(account.user.id, &token)
        .await
        .expect("logout should succeed");

    let err = app.auth.validate_token(&token).await.unwrap_err();
    assert!(matches!(
        err,
        storefront_api::auth::AuthError::RevokedToken
    ));
}

#[tokio::test]
async fn logout_leaves_other_sessions_valid() {
    let app = TestApp::new().await;
    let account = app
        .services
        .accounts
        .signup(signup_input("ada@example.com", "5551234567"))
        .await
        .unwrap();

    let second_session = app
        .services
        .accounts
        .login("ada@example.com", "Str0ng!Passw0rd")
        .await
        .unwrap();

    app.services
        .accounts
        .logout(account.user.id, &account.token.access_token)
        .await
        .unwrap();

    assert!(app
        .auth
        .validate_token(&second_session.token.access_token)
        .await
        .is_ok());
}

#[tokio::test]
async fn profile_returns_stored_fields() {
    let app = TestApp::new().await;
    let account = app
        .services
        .accounts
        .signup(signup_input("ada@example.com", "5551234567"))
        .await
        .unwrap();

    let profile = app
        .services
        .accounts
        .profile(account.user.id)
        .await
        .expect("profile should resolve");

    assert_eq!(profile.name, "Ada Lovelace");
    assert_eq!(profile.email, "ada@example.com");
    assert_eq!(profile.phone, "5551234567");
}
