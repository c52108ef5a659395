//! Handler模块

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use common::errors::AppError;
use common::models::{ConnectionProfile, RegisterProfileRequest};
use common::response::Record;
use crate::service::{ExplorerService, ExplorerServiceTrait};
use crate::state::AppState;

/// 列出实例中的所有 schema
#[utoipa::path(
    get,
    path = "/api/explore/{instance}",
    tag = "explore",
    params(
        ("instance" = String, Path, description = "实例名称")
    ),
    responses(
        (status = 200, description = "schema 列表", body = Vec<common::models::SchemaDescriptor>),
        (status = 404, description = "实例未注册", body = common::response::ErrorPayload),
        (status = 502, description = "无法连接实例", body = common::response::ErrorPayload)
    )
)]
pub async fn list_schemas(
    State(state): State<AppState>,
    Path(instance): Path<String>,
) -> Result<Json<Vec<Record>>, AppError> {
    let service = ExplorerService::new(state.connections);
    let data = service.list_schemas(&instance).await?;
    Ok(Json(data))
}

/// 列出 schema 中的基础表
#[utoipa::path(
    get,
    path = "/api/explore/{instance}/{schema}",
    tag = "explore",
    params(
        ("instance" = String, Path, description = "实例名称"),
        ("schema" = String, Path, description = "schema 名称")
    ),
    responses(
        (status = 200, description = "表列表（schema 不存在时为空）", body = Vec<common::models::TableDescriptor>),
        (status = 400, description = "非法标识符", body = common::response::ErrorPayload),
        (status = 404, description = "实例未注册", body = common::response::ErrorPayload)
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
    Path((instance, schema)): Path<(String, String)>,
) -> Result<Json<Vec<Record>>, AppError> {
    let service = ExplorerService::new(state.connections);
    let data = service.list_tables(&instance, &schema).await?;
    Ok(Json(data))
}

/// 读取整张表的数据
#[utoipa::path(
    get,
    path = "/api/explore/{instance}/{schema}/{table}",
    tag = "explore",
    params(
        ("instance" = String, Path, description = "实例名称"),
        ("schema" = String, Path, description = "schema 名称"),
        ("table" = String, Path, description = "表名")
    ),
    responses(
        (status = 200, description = "按列顺序组织的行数据", body = Vec<serde_json::Value>),
        (status = 400, description = "非法或未知的标识符", body = common::response::ErrorPayload),
        (status = 404, description = "实例未注册", body = common::response::ErrorPayload),
        (status = 500, description = "数据读取失败", body = common::response::ErrorPayload)
    )
)]
pub async fn read_table(
    State(state): State<AppState>,
    Path((instance, schema, table)): Path<(String, String, String)>,
) -> Result<Json<Vec<Record>>, AppError> {
    let service = ExplorerService::new(state.connections);
    let data = service.read_table(&instance, &schema, &table).await?;
    Ok(Json(data))
}

/// 列出表的列（含主键标记）
#[utoipa::path(
    get,
    path = "/api/explore/{instance}/{schema}/{table}/columns",
    tag = "explore",
    params(
        ("instance" = String, Path, description = "实例名称"),
        ("schema" = String, Path, description = "schema 名称"),
        ("table" = String, Path, description = "表名")
    ),
    responses(
        (status = 200, description = "列列表（表不存在时为空）", body = Vec<common::models::ColumnDescriptor>),
        (status = 400, description = "非法标识符", body = common::response::ErrorPayload),
        (status = 404, description = "实例未注册", body = common::response::ErrorPayload)
    )
)]
pub async fn list_columns(
    State(state): State<AppState>,
    Path((instance, schema, table)): Path<(String, String, String)>,
) -> Result<Json<Vec<Record>>, AppError> {
    let service = ExplorerService::new(state.connections);
    let data = service.list_columns(&instance, &schema, &table).await?;
    Ok(Json(data))
}

/// 计算列统计值（平均值、最小值、最大值、中位数）
#[utoipa::path(
    get,
    path = "/api/explore/{instance}/{schema}/{table}/columns/{column}",
    tag = "explore",
    params(
        ("instance" = String, Path, description = "实例名称"),
        ("schema" = String, Path, description = "schema 名称"),
        ("table" = String, Path, description = "表名"),
        ("column" = String, Path, description = "列名")
    ),
    responses(
        (status = 200, description = "列统计值，无结果的字段省略", body = common::models::ColumnStats),
        (status = 400, description = "非法或未知的标识符", body = common::response::ErrorPayload),
        (status = 404, description = "实例未注册", body = common::response::ErrorPayload),
        (status = 500, description = "聚合查询失败", body = common::response::ErrorPayload)
    )
)]
pub async fn column_stats(
    State(state): State<AppState>,
    Path((instance, schema, table, column)): Path<(String, String, String, String)>,
) -> Result<Json<Record>, AppError> {
    let service = ExplorerService::new(state.connections);
    let data = service
        .column_stats(&instance, &schema, &table, &column)
        .await?;
    Ok(Json(data))
}

/// 列出所有已注册的实例
#[utoipa::path(
    get,
    path = "/api/instances",
    tag = "instances",
    responses(
        (status = 200, description = "实例列表", body = Vec<ConnectionProfile>)
    )
)]
pub async fn list_instances(
    State(state): State<AppState>,
) -> Result<Json<Vec<ConnectionProfile>>, AppError> {
    let data = state.profiles.list().await?;
    Ok(Json(data))
}

/// 注册新的数据库实例
#[utoipa::path(
    post,
    path = "/api/instances",
    tag = "instances",
    request_body = RegisterProfileRequest,
    responses(
        (status = 201, description = "实例已注册", body = ConnectionProfile),
        (status = 400, description = "参数校验失败", body = common::response::ErrorPayload),
        (status = 409, description = "实例名称已存在", body = common::response::ErrorPayload)
    )
)]
pub async fn register_instance(
    State(state): State<AppState>,
    Json(req): Json<RegisterProfileRequest>,
) -> Result<(StatusCode, Json<ConnectionProfile>), AppError> {
    req.validate()?;
    if req.instance_name.trim().is_empty() {
        return Err(AppError::Validation("Instance name must not be blank".into()));
    }

    let profile = req.into_profile();
    state.profiles.add(profile.clone()).await?;

    tracing::info!(
        instance = %profile.instance_name,
        host = %profile.hostname,
        port = profile.port,
        "实例已注册"
    );
    Ok((StatusCode::CREATED, Json(profile)))
}

/// 根据名称获取实例
#[utoipa::path(
    get,
    path = "/api/instances/{instance}",
    tag = "instances",
    params(
        ("instance" = String, Path, description = "实例名称")
    ),
    responses(
        (status = 200, description = "实例详情", body = ConnectionProfile),
        (status = 404, description = "实例未注册", body = common::response::ErrorPayload)
    )
)]
pub async fn get_instance(
    State(state): State<AppState>,
    Path(instance): Path<String>,
) -> Result<Json<ConnectionProfile>, AppError> {
    state
        .profiles
        .find_by_instance_name(&instance)
        .await?
        .map(Json)
        .ok_or(AppError::InstanceNotFound(instance))
}

/// 删除已注册的实例
#[utoipa::path(
    delete,
    path = "/api/instances/{instance}",
    tag = "instances",
    params(
        ("instance" = String, Path, description = "实例名称")
    ),
    responses(
        (status = 204, description = "实例已删除"),
        (status = 404, description = "实例未注册", body = common::response::ErrorPayload)
    )
)]
pub async fn delete_instance(
    State(state): State<AppState>,
    Path(instance): Path<String>,
) -> Result<StatusCode, AppError> {
    state.profiles.remove(&instance).await?;
    tracing::info!(instance = %instance, "实例已删除");
    Ok(StatusCode::NO_CONTENT)
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
}
