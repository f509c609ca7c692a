use std::sync::Arc;
use std::time::Duration;

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;

use storefront_api::auth::{AuthConfig, AuthService, TokenBlacklist};
use storefront_api::events::{process_events, EventSender};
use storefront_api::handlers::AppServices;
use storefront_api::migrator::Migrator;
use storefront_api::services::ImageStore;

/// Test harness: in-memory SQLite with the full schema applied, the
/// real services wired together, and an in-memory token blacklist.
#[allow(dead_code)]
pub struct TestApp {
    pub db: Arc<sea_orm::DatabaseConnection>,
    pub services: AppServices,
    pub auth: Arc<AuthService>,
    pub event_sender: EventSender,
    upload_dir: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("failed to open in-memory sqlite");
        Migrator::up(&db, None)
            .await
            .expect("failed to run migrations");
        let db = Arc::new(db);

        let (event_tx, event_rx) = mpsc::channel(64);
        tokio::spawn(process_events(event_rx, None));
        let event_sender = EventSender::new(event_tx);

        let auth = Arc::new(AuthService::new(
            AuthConfig::new(
                "integration-test-secret-key-long-enough-to-sign-tokens-0123456789".into(),
                "storefront-api".into(),
                "storefront-clients".into(),
                Duration::from_secs(3600),
            ),
            TokenBlacklist::in_memory(),
        ));

        let upload_dir = tempfile::tempdir().expect("failed to create upload dir");
        let image_store = ImageStore::new(upload_dir.path(), "/uploads/products");

        let services = AppServices::new(
            db.clone(),
            event_sender.clone(),
            auth.clone(),
            image_store,
        );

        Self {
            db,
            services,
            auth,
            event_sender,
            upload_dir,
        }
    }

    /// Path of the temporary upload directory for filesystem assertions.
    #[allow(dead_code)]
    pub fn upload_path(&self) -> &std::path::Path {
        self.upload_dir.path()
    }
}
