use esdr::storage;
use sea_orm::DatabaseConnection;

/// Builder for creating test users
pub struct UserBuilder {
    username: String,
    password: String,
    email: Option<String>,
}

impl UserBuilder {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            password: "password123".to_string(),
            email: None,
        }
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> storage::User {
        storage::create_user(db, &self.username, &self.password, self.email)
            .await
            .expect("Failed to create test user")
    }
}

/// Builder for creating feeds owned by a user
pub struct FeedBuilder {
    user_id: i64,
    product_id: i64,
    name: String,
}

impl FeedBuilder {
    pub fn new(user_id: i64, product_id: i64) -> Self {
        Self {
            user_id,
            product_id,
            name: "Test Feed".to_string(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> storage::Feed {
        storage::create_feed(db, self.user_id, self.product_id, &self.name)
            .await
            .expect("Failed to create test feed")
    }
}

/// Create a test API client
pub async fn seed_client(db: &DatabaseConnection, name: &str) -> storage::Client {
    storage::create_client(db, name)
        .await
        .expect("Failed to create test client")
}

/// Create a test product
pub async fn seed_product(db: &DatabaseConnection, name: &str) -> storage::Product {
    storage::create_product(db, name)
        .await
        .expect("Failed to create test product")
}

/// Issue an access token for the user/client pair and return the bearer string
pub async fn issue_token(db: &DatabaseConnection, user_id: i64, client_id: i64) -> String {
    storage::issue_access_token(db, user_id, client_id, 3600)
        .await
        .expect("Failed to issue access token")
        .token
}
