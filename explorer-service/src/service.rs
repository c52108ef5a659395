//! 结构浏览服务模块
//!
//! 每个操作先校验调用方传入的名称，再为实例打开一个连接，
//! 在该连接上完成目录或数据查询后关闭连接，并把结果组装为记录。

use std::sync::Arc;

use async_trait::async_trait;

use common::errors::AppResult;
use common::response::{Record, ResultAssembler};
use common::utils::IdentifierValidator;

use crate::column_stats;
use crate::connection_factory::ConnectionFactory;
use crate::metadata;
use crate::table_reader;

/// 结构浏览服务 Trait
#[async_trait]
pub trait ExplorerServiceTrait: Send + Sync {
    /// 列出实例中的所有 schema
    async fn list_schemas(&self, instance: &str) -> AppResult<Vec<Record>>;

    /// 列出 schema 中的基础表
    async fn list_tables(&self, instance: &str, schema: &str) -> AppResult<Vec<Record>>;

    /// 列出表的列（含主键标记）
    async fn list_columns(&self, instance: &str, schema: &str, table: &str)
        -> AppResult<Vec<Record>>;

    /// 读取整张表的数据
    async fn read_table(&self, instance: &str, schema: &str, table: &str)
        -> AppResult<Vec<Record>>;

    /// 计算列的平均值、最小值、最大值和中位数
    async fn column_stats(
        &self,
        instance: &str,
        schema: &str,
        table: &str,
        column: &str,
    ) -> AppResult<Record>;
}

/// 数据库结构浏览服务
pub struct ExplorerService {
    factory: Arc<ConnectionFactory>,
}

impl ExplorerService {
    /// 创建新的浏览服务实例
    pub fn new(factory: Arc<ConnectionFactory>) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl ExplorerServiceTrait for ExplorerService {
    async fn list_schemas(&self, instance: &str) -> AppResult<Vec<Record>> {
        let schemas = self
            .factory
            .with_connection(instance, |conn| Box::pin(metadata::list_schemas(conn)))
            .await?;

        tracing::debug!(instance = %instance, count = schemas.len(), "Schemas listed");
        ResultAssembler::sequence(&schemas)
    }

    async fn list_tables(&self, instance: &str, schema: &str) -> AppResult<Vec<Record>> {
        IdentifierValidator::validate(schema)?;

        let schema = schema.to_string();
        let tables = self
            .factory
            .with_connection(instance, move |conn| {
                Box::pin(async move { metadata::list_tables(conn, &schema).await })
            })
            .await?;

        tracing::debug!(instance = %instance, count = tables.len(), "Tables listed");
        ResultAssembler::sequence(&tables)
    }

    async fn list_columns(
        &self,
        instance: &str,
        schema: &str,
        table: &str,
    ) -> AppResult<Vec<Record>> {
        IdentifierValidator::validate_all(&[schema, table])?;

        let (schema, table) = (schema.to_string(), table.to_string());
        let columns = self
            .factory
            .with_connection(instance, move |conn| {
                Box::pin(async move { metadata::list_columns(conn, &schema, &table).await })
            })
            .await?;

        tracing::debug!(instance = %instance, count = columns.len(), "Columns listed");
        ResultAssembler::sequence(&columns)
    }

    async fn read_table(
        &self,
        instance: &str,
        schema: &str,
        table: &str,
    ) -> AppResult<Vec<Record>> {
        IdentifierValidator::validate_all(&[schema, table])?;

        let (schema, table) = (schema.to_string(), table.to_string());
        let rows = self
            .factory
            .with_connection(instance, move |conn| {
                Box::pin(async move { table_reader::read_table(conn, &schema, &table).await })
            })
            .await?;

        // 行数据已是以列名为键的记录
        Ok(rows)
    }

    async fn column_stats(
        &self,
        instance: &str,
        schema: &str,
        table: &str,
        column: &str,
    ) -> AppResult<Record> {
        IdentifierValidator::validate_all(&[schema, table, column])?;

        let (schema, table, column) = (schema.to_string(), table.to_string(), column.to_string());
        let stats = self
            .factory
            .with_connection(instance, move |conn| {
                Box::pin(async move {
                    column_stats::compute_column_stats(conn, &schema, &table, &column).await
                })
            })
            .await?;

        ResultAssembler::single(&stats)
    }
}
