use crate::config::Settings;
use crate::handlers::{
    expense_splits::{
        create_expense_split, delete_expense_split, get_expense_split, get_expense_splits,
        update_expense_split,
    },
    expenses::{create_expense, delete_expense, get_expense, get_expenses, update_expense},
    health::health_check,
    house_members::{
        create_house_member, delete_house_member, get_house_member, get_house_members,
        get_house_members_user_info, update_house_member,
    },
    houses::{create_house, delete_house, get_house, get_houses, update_house},
    receipts::{create_receipt, delete_receipt, get_receipt, get_receipts, update_receipt},
    recurring_expenses::{
        create_recurring_expense, delete_recurring_expense, get_recurring_expense,
        get_recurring_expenses, update_recurring_expense,
    },
    user_houses::get_user_houses,
    users::{create_user, delete_user, get_user, get_users, update_user},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// HTTP-level knobs for the router
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Origins accepted in addition to `http(s)://localhost[:port]`
    pub allowed_origins: Vec<String>,
    pub request_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&Settings> for RouterConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            allowed_origins: settings.allowed_origins(),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
        }
    }
}

fn is_localhost_origin(origin: &str) -> bool {
    let Some(rest) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };

    match rest.strip_prefix("localhost") {
        Some("") => true,
        Some(port) => port
            .strip_prefix(':')
            .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())),
        None => false,
    }
}

fn is_allowed_origin(origin: &HeaderValue, extra: &[String]) -> bool {
    match origin.to_str() {
        Ok(origin) => is_localhost_origin(origin) || extra.iter().any(|allowed| allowed == origin),
        Err(_) => false,
    }
}

fn cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _parts| {
            is_allowed_origin(origin, &allowed_origins)
        }))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
}

/// Create application router with all routes and middleware
pub fn create_router(state: AppState, config: RouterConfig) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // User routes
        .route("/api/v1/users", get(get_users).post(create_user))
        .route(
            "/api/v1/users/:user_id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        // House routes
        .route("/api/v1/houses", get(get_houses).post(create_house))
        .route(
            "/api/v1/houses/:house_id",
            get(get_house).patch(update_house).delete(delete_house),
        )
        // House member routes; `:id` is a membership id, or a house id for user-info
        .route(
            "/api/v1/house-members",
            get(get_house_members).post(create_house_member),
        )
        .route(
            "/api/v1/house-members/:id",
            get(get_house_member)
                .patch(update_house_member)
                .delete(delete_house_member),
        )
        .route(
            "/api/v1/house-members/:id/user-info",
            get(get_house_members_user_info),
        )
        .route("/api/v1/user-houses/:user_id", get(get_user_houses))
        // Expense routes
        .route("/api/v1/expenses", get(get_expenses).post(create_expense))
        .route(
            "/api/v1/expenses/:expense_id",
            get(get_expense).patch(update_expense).delete(delete_expense),
        )
        .route(
            "/api/v1/expense-splits",
            get(get_expense_splits).post(create_expense_split),
        )
        .route(
            "/api/v1/expense-splits/:expense_split_id",
            get(get_expense_split)
                .patch(update_expense_split)
                .delete(delete_expense_split),
        )
        .route(
            "/api/v1/recurring-expenses",
            get(get_recurring_expenses).post(create_recurring_expense),
        )
        .route(
            "/api/v1/recurring-expenses/:recurring_expense_id",
            get(get_recurring_expense)
                .patch(update_recurring_expense)
                .delete(delete_recurring_expense),
        )
        .route("/api/v1/receipts", get(get_receipts).post(create_receipt))
        .route(
            "/api/v1/receipts/:receipt_id",
            get(get_receipt).patch(update_receipt).delete(delete_receipt),
        )
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(config.request_timeout))
                .layer(cors_layer(config.allowed_origins)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localhost_origins_are_allowed() {
        assert!(is_localhost_origin("http://localhost"));
        assert!(is_localhost_origin("http://localhost:3000"));
        assert!(is_localhost_origin("https://localhost:5173"));
    }

    #[test]
    fn test_lookalike_origins_are_rejected() {
        assert!(!is_localhost_origin("http://localhost.evil.com"));
        assert!(!is_localhost_origin("http://localhost:"));
        assert!(!is_localhost_origin("http://localhost:80a"));
        assert!(!is_localhost_origin("ftp://localhost"));
        assert!(!is_localhost_origin("http://example.com"));
    }

    #[test]
    fn test_configured_origins_are_allowed() {
        let extra = vec!["https://app.example.com".to_string()];
        let origin = HeaderValue::from_static("https://app.example.com");
        let other = HeaderValue::from_static("https://other.example.com");

        assert!(is_allowed_origin(&origin, &extra));
        assert!(!is_allowed_origin(&other, &extra));
    }
}
