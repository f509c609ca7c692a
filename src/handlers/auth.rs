use axum::{
    extract::{Json, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    auth::{bearer_token, AuthRouterExt, AuthenticatedUser},
    errors::ApiError,
    handlers::common::{created_response, success_response, success_with_message, validate_input},
    services::accounts::SignupInput,
    AppState,
};

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z\s'-]+$").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{10,12}$").unwrap());

fn validate_name_characters(name: &str) -> Result<(), ValidationError> {
    if NAME_RE.is_match(name.trim()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("name_characters");
        err.message =
            Some("Name can only contain letters, spaces, hyphens, and apostrophes".into());
        Err(err)
    }
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE_RE.is_match(phone.trim()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone_format");
        err.message = Some("Phone must be 10-12 digits".into());
        Err(err)
    }
}

// The regex crate has no lookahead, so strength is checked per class.
fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| "@$!%*?&".contains(c));

    if has_lower && has_upper && has_digit && has_special {
        Ok(())
    } else {
        let mut err = ValidationError::new("password_strength");
        err.message = Some(
            "Password must contain uppercase, lowercase, number, and special character (@$!%*?&)"
                .into(),
        );
        Err(err)
    }
}

/// Creates the router for auth endpoints
pub fn auth_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .with_auth();

    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .merge(protected)
}

// Request and response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Ada Lovelace",
    "email": "ada@example.com",
    "password": "Str0ng!Passw0rd",
    "phone": "5551234567"
}))]
pub struct SignupRequest {
    /// User's full name
    #[validate(
        length(min = 2, message = "Name must be at least 2 characters"),
        custom = "validate_name_characters"
    )]
    #[schema(example = "Ada Lovelace")]
    pub name: String,

    /// Email address (must be unique)
    #[validate(email(message = "Please provide a valid email"))]
    #[schema(example = "ada@example.com")]
    pub email: String,

    /// Password (minimum 8 characters with upper, lower, digit, special)
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters"),
        custom = "validate_password_strength"
    )]
    #[schema(example = "Str0ng!Passw0rd")]
    pub password: String,

    /// Phone number (must be unique, 10-12 digits)
    #[validate(custom = "validate_phone")]
    #[schema(example = "5551234567")]
    pub phone: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "email": "ada@example.com",
    "password": "Str0ng!Passw0rd"
}))]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Account fields plus the freshly issued token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthDataResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub token: String,
    pub expires_in: i64,
}

/// Public view of the stored account row
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entities::UserModel> for ProfileResponse {
    fn from(user: crate::entities::UserModel) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// Handler functions

/// Create an account and issue the first token
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = crate::ApiResponse<AuthDataResponse>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email or phone already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let account = state
        .services
        .accounts
        .signup(SignupInput {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            password: payload.password,
        })
        .await?;

    info!("Signup completed for {}", account.user.id);

    Ok(created_response(
        AuthDataResponse {
            id: account.user.id,
            name: account.user.name,
            email: account.user.email,
            phone: account.user.phone,
            token: account.token.access_token,
            expires_in: account.token.expires_in,
        },
        "Signup successful",
    ))
}

/// Verify credentials and issue a token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = crate::ApiResponse<AuthDataResponse>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let account = state
        .services
        .accounts
        .login(&payload.email, &payload.password)
        .await?;

    Ok(success_with_message(
        AuthDataResponse {
            id: account.user.id,
            name: account.user.name,
            email: account.user.email,
            phone: account.user.phone,
            token: account.token.access_token,
            expires_in: account.token.expires_in,
        },
        "Login successful",
    ))
}

/// Revoke the presented token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "Missing, invalid or expired token", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::Unauthorized)?;

    state.services.accounts.logout(user.user_id, token).await?;

    Ok(success_with_message(
        serde_json::json!({}),
        "Logout successful",
    ))
}

/// Return the stored account row for the caller
#[utoipa::path(
    get,
    path = "/auth/profile",
    responses(
        (status = 200, description = "Current account", body = crate::ApiResponse<ProfileResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub async fn profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.services.accounts.profile(user.user_id).await?;
    Ok(success_response(ProfileResponse::from(account)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_strength_requires_all_classes() {
        assert!(validate_password_strength("Str0ng!Passw0rd").is_ok());
        assert!(validate_password_strength("weakpassword").is_err());
        assert!(validate_password_strength("NoDigits!Here").is_err());
        assert!(validate_password_strength("n0special123A").is_err());
    }

    #[test]
    fn phone_must_be_10_to_12_digits() {
        assert!(validate_phone("5551234567").is_ok());
        assert!(validate_phone("555123456789").is_ok());
        assert!(validate_phone("555123").is_err());
        assert!(validate_phone("555-123-4567").is_err());
    }

    #[test]
    fn name_rejects_symbols() {
        assert!(validate_name_characters("Ada Lovelace").is_ok());
        assert!(validate_name_characters("O'Brien-Smith").is_ok());
        assert!(validate_name_characters("ada<script>").is_err());
    }

    #[test]
    fn signup_request_validation() {
        let valid = SignupRequest {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            password: "Str0ng!Passw0rd".into(),
            phone: "5551234567".into(),
        };
        assert!(valid.validate().is_ok());

        let invalid = SignupRequest {
            name: "A".into(),
            email: "not-an-email".into(),
            password: "short".into(),
            phone: "123".into(),
        };
        assert!(invalid.validate().is_err());
    }
}
