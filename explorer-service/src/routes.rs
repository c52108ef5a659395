//! 结构浏览服务路由模块

use axum::{routing::get, Router};

use crate::handlers::{
    column_stats, delete_instance, get_instance, health_check, list_columns, list_instances,
    list_schemas, list_tables, read_table, register_instance,
};
use crate::state::AppState;

/// 创建浏览与实例管理路由
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/explore/{instance}", get(list_schemas))
        .route("/api/explore/{instance}/{schema}", get(list_tables))
        .route("/api/explore/{instance}/{schema}/{table}", get(read_table))
        .route("/api/explore/{instance}/{schema}/{table}/columns", get(list_columns))
        .route(
            "/api/explore/{instance}/{schema}/{table}/columns/{column}",
            get(column_stats),
        )
        .route("/api/instances", get(list_instances).post(register_instance))
        .route("/api/instances/{instance}", get(get_instance).delete(delete_instance))
        .route("/api/health", get(health_check))
}
