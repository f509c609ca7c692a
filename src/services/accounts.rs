use argon2::password_hash::{
    rand_core::OsRng, Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier,
    SaltString,
};
use argon2::Argon2;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{AuthService, IssuedToken},
    entities::{user, User, UserModel},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Account service: signup, login, profile and logout over the users
/// table. Passwords are stored as salted argon2 PHC strings.
pub struct AccountService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
    event_sender: EventSender,
}

/// Input for creating an account
#[derive(Debug)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// A signed-in (or freshly registered) account with its token.
#[derive(Debug)]
pub struct AuthenticatedAccount {
    pub user: UserModel,
    pub token: IssuedToken,
}

impl AccountService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        auth: Arc<AuthService>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            auth,
            event_sender,
        }
    }

    /// Register a new account and issue its first token.
    #[instrument(skip(self, input))]
    pub async fn signup(&self, input: SignupInput) -> Result<AuthenticatedAccount, ServiceError> {
        let email = input.email.trim().to_ascii_lowercase();
        let phone = input.phone.trim().to_string();

        // The unique indexes are the real guard; the pre-checks exist to
        // produce a conflict message instead of a bare database error.
        let existing = User::find()
            .filter(
                user::Column::Email
                    .eq(&email)
                    .or(user::Column::Phone.eq(&phone)),
            )
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "email or phone already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password)?;
        let now = Utc::now();

        let account = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            email: Set(email),
            phone: Set(phone),
            password_hash: Set(password_hash),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let account = account.insert(&*self.db).await?;
        let token = self
            .auth
            .generate_token(&account)
            .map_err(|e| ServiceError::AuthError(e.to_string()))?;

        self.event_sender
            .send_or_log(Event::UserRegistered {
                user_id: account.id,
                name: account.name.clone(),
                email: account.email.clone(),
            })
            .await;

        info!("User registered: {}", account.id);
        Ok(AuthenticatedAccount {
            user: account,
            token,
        })
    }

    /// Verify credentials and issue a token.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedAccount, ServiceError> {
        let email = email.trim().to_ascii_lowercase();

        let account = User::find()
            .filter(user::Column::Email.eq(&email))
            .one(&*self.db)
            .await?;

        let Some(account) = account else {
            warn!("Login attempt with unknown email");
            return Err(ServiceError::Unauthorized("Invalid email".to_string()));
        };

        if !verify_password(&account.password_hash, password)? {
            warn!(user_id = %account.id, "Failed login attempt");
            return Err(ServiceError::Unauthorized("Invalid password".to_string()));
        }

        let token = self
            .auth
            .generate_token(&account)
            .map_err(|e| ServiceError::AuthError(e.to_string()))?;

        self.event_sender
            .send_or_log(Event::UserLoggedIn(account.id))
            .await;

        info!("User logged in: {}", account.id);
        Ok(AuthenticatedAccount {
            user: account,
            token,
        })
    }

    /// Fetch the stored account row for an authenticated user.
    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: Uuid) -> Result<UserModel, ServiceError> {
        User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    /// Revoke the presented token.
    #[instrument(skip(self, token))]
    pub async fn logout(&self, user_id: Uuid, token: &str) -> Result<(), ServiceError> {
        self.auth
            .revoke_token(token)
            .await
            .map_err(|e| ServiceError::AuthError(e.to_string()))?;

        self.event_sender
            .send_or_log(Event::UserLoggedOut(user_id))
            .await;

        info!("User logged out: {}", user_id);
        Ok(())
    }
}

fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::HashError(e.to_string()))?;
    Ok(hash.to_string())
}

fn verify_password(expected_hash: &str, candidate: &str) -> Result<bool, ServiceError> {
    let parsed =
        PasswordHash::new(expected_hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(e) => Err(ServiceError::HashError(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("Str0ng!Passw0rd").unwrap();
        assert_ne!(hash, "Str0ng!Passw0rd");
        assert!(hash.starts_with("$argon2"));

        assert!(verify_password(&hash, "Str0ng!Passw0rd").unwrap());
        assert!(!verify_password(&hash, "wrong-password").unwrap());
    }

    #[test]
    fn two_hashes_of_same_password_differ() {
        let first = hash_password("Str0ng!Passw0rd").unwrap();
        let second = hash_password("Str0ng!Passw0rd").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn garbage_stored_hash_is_an_error() {
        assert!(matches!(
            verify_password("not-a-phc-string", "anything"),
            Err(ServiceError::HashError(_))
        ));
    }
}
