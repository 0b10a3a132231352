#[cfg(test)]
pub mod test_utils {
    use crate::auth::JwtVerifier;
    use crate::router::{RouterConfig, create_router};
    use crate::schemas::{ApiResponse, AppState};
    use axum::http::{HeaderName, HeaderValue, StatusCode, header::AUTHORIZATION};
    use axum_test::TestServer;
    use chrono::Utc;
    use migration::{Migrator, MigratorTrait};
    use model::entities::{house, house_member, user};
    use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;
    use uuid::Uuid;

    pub const TEST_JWT_SECRET: &str = "housesplit-test-secret";

    /// Create an in-memory SQLite database for testing.
    ///
    /// Pinned to one connection so every query sees the same in-memory database.
    pub async fn setup_test_db() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let db = Database::connect(options)
            .await
            .expect("Failed to connect to in-memory database");

        // Run migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    pub fn test_verifier() -> JwtVerifier {
        JwtVerifier::new(TEST_JWT_SECRET, 1)
    }

    /// Create AppState for testing
    pub async fn setup_test_app_state() -> AppState {
        AppState {
            db: setup_test_db().await,
            verifier: Arc::new(test_verifier()),
        }
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level comes from RUST_LOG, defaulting to WARN.
    pub fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| level.parse::<Level>().ok())
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub async fn seed_user(db: &DatabaseConnection, name: &str) -> user::Model {
        let now = Utc::now();
        user::ActiveModel {
            user_id: Set(Uuid::new_v4()),
            display_name: Set(name.to_string()),
            email: Set(format!("{}-{}@example.com", name, Uuid::new_v4())),
            photo_url: Set(None),
            payment_method: Set(None),
            payment_link: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .expect("Failed to seed user")
    }

    pub async fn seed_house(db: &DatabaseConnection, head: &user::Model) -> house::Model {
        let now = Utc::now();
        house::ActiveModel {
            house_id: Set(Uuid::new_v4()),
            name: Set(format!("{}'s house", head.display_name)),
            invite_code: Set(None),
            user_id: Set(head.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .expect("Failed to seed house")
    }

    pub async fn seed_member(
        db: &DatabaseConnection,
        house: &house::Model,
        member: &user::Model,
        is_admin: bool,
    ) -> house_member::Model {
        let now = Utc::now();
        house_member::ActiveModel {
            house_member_id: Set(Uuid::new_v4()),
            house_id: Set(house.house_id),
            user_id: Set(member.user_id),
            nickname: Set(Some(member.display_name.clone())),
            is_admin: Set(is_admin),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .expect("Failed to seed house member")
    }

    /// HTTP harness around the full router
    pub struct TestApp {
        pub server: TestServer,
        pub db: DatabaseConnection,
        verifier: JwtVerifier,
        _tracing: tracing::subscriber::DefaultGuard,
    }

    /// Create the test server with a migrated database
    pub async fn setup_test_app() -> TestApp {
        let tracing = init_test_tracing();

        let state = setup_test_app_state().await;
        let db = state.db.clone();
        let router = create_router(state, RouterConfig::default());

        TestApp {
            server: TestServer::new(router).expect("Failed to build test server"),
            db,
            verifier: test_verifier(),
            _tracing: tracing,
        }
    }

    impl TestApp {
        pub fn token(&self, user_id: Uuid) -> String {
            self.verifier.issue(user_id).expect("Failed to issue token")
        }

        /// `Authorization: Bearer ...` for the given user
        pub fn auth(&self, user_id: Uuid) -> (HeaderName, HeaderValue) {
            let value = HeaderValue::from_str(&format!("Bearer {}", self.token(user_id)))
                .expect("Token is a valid header value");
            (AUTHORIZATION, value)
        }

        /// Register a profile through the API and return its user id
        pub async fn register_user(&self, display_name: &str) -> Uuid {
            let user_id = Uuid::new_v4();
            let (name, value) = self.auth(user_id);
            let response = self
                .server
                .post("/api/v1/users")
                .add_header(name, value)
                .json(&json!({
                    "display_name": display_name,
                    "email": format!("{}-{}@example.com", display_name, user_id),
                }))
                .await;
            response.assert_status(StatusCode::CREATED);
            user_id
        }

        /// Create a house headed by `head` and return its id
        pub async fn create_house(&self, head: Uuid, name: &str) -> Uuid {
            let (header, value) = self.auth(head);
            let response = self
                .server
                .post("/api/v1/houses")
                .add_header(header, value)
                .json(&json!({ "name": name }))
                .await;
            response.assert_status(StatusCode::CREATED);
            let body: ApiResponse<Value> = response.json();
            parse_id(&body.data["house_id"])
        }

        /// Add `user_id` to the house on behalf of `head`, returning the membership id
        pub async fn add_member(&self, head: Uuid, house_id: Uuid, user_id: Uuid) -> Uuid {
            let (header, value) = self.auth(head);
            let response = self
                .server
                .post("/api/v1/house-members")
                .add_header(header, value)
                .json(&json!({ "house_id": house_id, "user_id": user_id }))
                .await;
            response.assert_status(StatusCode::CREATED);
            let body: ApiResponse<Value> = response.json();
            parse_id(&body.data["house_member_id"])
        }

        /// Membership id of `user_id` in `house_id`
        pub async fn membership_of(&self, house_id: Uuid, user_id: Uuid) -> Uuid {
            let (header, value) = self.auth(user_id);
            let response = self
                .server
                .get("/api/v1/house-members")
                .add_header(header, value)
                .add_query_param("house_id", house_id)
                .add_query_param("user_id", user_id)
                .await;
            response.assert_status_ok();
            let body: ApiResponse<Vec<Value>> = response.json();
            assert_eq!(body.data.len(), 1, "expected exactly one membership");
            parse_id(&body.data[0]["house_member_id"])
        }
    }

    pub fn parse_id(value: &Value) -> Uuid {
        value
            .as_str()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_else(|| panic!("expected a UUID, got {value}"))
    }
}
