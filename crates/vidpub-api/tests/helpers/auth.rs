use chrono::Duration;
use uuid::Uuid;
use vidpub_api::auth::JwtService;

/// Must match the `JWT_SECRET` the test app is built with.
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";

/// A caller with a valid bearer token
pub struct TestUser {
    pub user_id: Uuid,
    pub token: String,
}

impl TestUser {
    pub fn new() -> Self {
        let user_id = Uuid::new_v4();
        let token = JwtService::new(TEST_JWT_SECRET)
            .issue_token(user_id, Duration::hours(1))
            .expect("Failed to mint test token");
        Self { user_id, token }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}
