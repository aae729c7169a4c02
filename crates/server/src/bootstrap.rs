use axum::{
    http::{header::CONTENT_TYPE, Method},
    Router,
};
use memberdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use memberdesk_db::{connect_with_config, migrations, CustomerGateway, DbPool};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::{customers, health};

/// Process-wide resources, built once at startup and handed to the router.
pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub gateway: CustomerGateway,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        max_connections = db_pool.options().get_max_connections(),
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let gateway = CustomerGateway::sql(db_pool.clone());
    Ok(Application { config, db_pool, gateway })
}

impl Application {
    /// Customer routes are served at the root and under `/api`, the prefix
    /// the browser client calls.
    pub fn router(&self) -> Router {
        let customers = customers::router(self.gateway.clone());
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE]);

        Router::new()
            .merge(customers.clone())
            .nest("/api", customers)
            .merge(health::router(self.db_pool.clone()))
            .layer(cors)
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    };
    use memberdesk_core::config::{ConfigOverrides, LoadOptions};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::bootstrap::{bootstrap, BootstrapError};

    fn in_memory_options() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_non_sqlite_store() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("mongodb://localhost:27017/customers".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let Err(error) = result else {
            panic!("bootstrap should fail for a non-sqlite url");
        };
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("database.url"));
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_serves_api_prefix() {
        let app = bootstrap(in_memory_options()).await.expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'customer'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("customer table should exist after bootstrap");
        assert_eq!(table_count, 1);

        let router = app.router();
        let create = Request::builder()
            .method(Method::POST)
            .uri("/api/customer")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "name": "Ada",
                    "dateOfBirth": "1990-01-01",
                    "memberNumber": "42",
                    "interests": "math"
                })
                .to_string(),
            ))
            .expect("request");
        let response = router.clone().oneshot(create).await.expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);

        let list = Request::builder().uri("/customer").body(Body::empty()).expect("request");
        let response = router.clone().oneshot(list).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["data"][0]["memberNumber"], json!(42));

        let health = Request::builder().uri("/health").body(Body::empty()).expect("request");
        let response = router.oneshot(health).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let app = bootstrap(in_memory_options()).await.expect("bootstrap should succeed");

        let preflight = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/customer")
            .header("origin", "http://localhost:5173")
            .header("access-control-request-method", "PUT")
            .body(Body::empty())
            .expect("request");
        let response = app.router().oneshot(preflight).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").map(|v| v.as_bytes()),
            Some(&b"*"[..])
        );

        app.db_pool.close().await;
    }
}
