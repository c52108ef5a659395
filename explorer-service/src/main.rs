//! 数据库结构浏览服务
//!
//! 根据已注册的实例名称动态浏览数据库结构并读取数据，包括：
//! - schema / 表 / 列（含主键）的枚举
//! - 整表数据读取
//! - 列统计（平均值、最小值、最大值、中位数）
//! - 实例连接信息的注册与管理

mod column_stats;
mod connection_factory;
mod handlers;
mod metadata;
mod profile_store;
mod routes;
mod service;
mod state;
mod table_reader;
mod value_decoder;

#[cfg(test)]
mod test_support;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::{AppConfig, LogFormat};
use common::middleware::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "explorer-service";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "结构浏览服务 API",
        version = "0.1.0",
        description = "数据库结构浏览与临时查询微服务"
    ),
    paths(
        handlers::list_schemas,
        handlers::list_tables,
        handlers::read_table,
        handlers::list_columns,
        handlers::column_stats,
        handlers::list_instances,
        handlers::register_instance,
        handlers::get_instance,
        handlers::delete_instance,
        handlers::health_check,
    ),
    components(schemas(
        common::models::SchemaDescriptor,
        common::models::TableDescriptor,
        common::models::ColumnDescriptor,
        common::models::Nullability,
        common::models::ColumnStats,
        common::models::ConnectionProfile,
        common::models::RegisterProfileRequest,
        common::response::ErrorPayload,
        handlers::HealthResponse,
    )),
    tags(
        (name = "explore", description = "结构浏览端点"),
        (name = "instances", description = "实例管理端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (if present) before anything else
    AppConfig::load_dotenv();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME);

    // 初始化日志追踪
    init_tracing(config.log_format);

    // 创建应用状态（连接实例信息存储）
    let state = AppState::from_config(config.clone())
        .await
        .context("Failed to initialize profile store (check DATABASE_URL)")?;

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = format!("{}:{}", config.host, config.port);
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", addr))?;
    axum::serve(listener, app).await.context("服务启动失败")?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use common::middleware::REQUEST_ID_HEADER;
    use tower::ServiceExt;

    use crate::profile_store::InMemoryProfileStore;

    #[test]
    fn test_openapi_lists_explore_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc
            .paths
            .paths
            .contains_key("/api/explore/{instance}/{schema}/{table}/columns/{column}"));
        assert!(doc.paths.paths.contains_key("/api/instances"));
    }

    #[tokio::test]
    async fn test_router_echoes_request_id() {
        let state = AppState::new(AppConfig::default(), Arc::new(InMemoryProfileStore::new()));
        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/explore/ghost")
                    .header(&REQUEST_ID_HEADER, "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[&REQUEST_ID_HEADER], "req-42");
    }
}
