use std::sync::Arc;

use axum_test::TestServer;

use auth_api::modules::auth::memory::{InMemoryTokenStore, InMemoryUserStore};
use auth_api::modules::auth::service::AuthSettings;

// Allow dead_code for utilities used by other test files
#[allow(dead_code)]
pub struct TestContext {
    pub server: TestServer,
    pub users: InMemoryUserStore,
    pub tokens: InMemoryTokenStore,
}

#[allow(dead_code)]
impl TestContext {
    pub async fn new() -> Self {
        Self::with_settings(AuthSettings::default()).await
    }

    pub async fn with_settings(settings: AuthSettings) -> Self {
        let users = InMemoryUserStore::new();
        let tokens = InMemoryTokenStore::new();

        let app = auth_api::create_app(
            Arc::new(users.clone()),
            Arc::new(tokens.clone()),
            settings,
        )
        .await;

        let server = TestServer::new(app).expect("Failed to create test server");

        Self {
            server,
            users,
            tokens,
        }
    }
}

// Helper to generate unique test email
#[allow(dead_code)]
pub fn test_email() -> String {
    format!("test_{}@example.com", uuid::Uuid::new_v4())
}

// Helper to generate test password
#[allow(dead_code)]
pub fn test_password() -> &'static str {
    "TestPassword123!"
}
