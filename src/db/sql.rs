use anyhow::{Context, Result, anyhow};
use bigdecimal::ToPrimitive;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::BigDecimal;
use sqlx::{Column, Executor, Row, Statement};
use uuid::Uuid;

use crate::db::{CellValue, TableData};

/// Opens a pool against the governance database. Fails immediately if
/// the host is unreachable or the credentials are rejected.
pub async fn connect(db_url: &str) -> Result<PgPool> {
    PgPool::connect(db_url)
        .await
        .map_err(|e| anyhow!("failed to connect to PostgreSQL: {}", e))
}

/// Runs `SELECT *` against `table` and materializes every row. Headers
/// are recovered from a statement describe when the table is empty, so
/// an empty table still yields its column names.
pub async fn fetch_table(pool: &PgPool, table: &str) -> Result<TableData> {
    let query = format!("SELECT * FROM {table}");
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .await
        .with_context(|| format!("query against table '{table}' failed"))?;

    let headers = match rows.first() {
        Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
        None => statement_headers(pool, &query).await?,
    };

    let mut data = TableData::new(headers);
    for row in &rows {
        let mut values = Vec::with_capacity(row.columns().len());
        for idx in 0..row.columns().len() {
            values.push(decode_cell(row, idx)?);
        }
        data.rows.push(values);
    }

    Ok(data)
}

async fn statement_headers(pool: &PgPool, query: &str) -> Result<Vec<String>> {
    let statement = pool
        .prepare(query)
        .await
        .context("failed to resolve result columns")?;
    Ok(statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect())
}

/// Decodes one cell by trying the common Postgres column types in
/// turn. `SELECT *` means the schema is unknown until runtime, so the
/// fallback chain stands in for a fixed record type.
fn decode_cell(row: &PgRow, idx: usize) -> Result<CellValue> {
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return Ok(v.map(CellValue::Text).unwrap_or(CellValue::Null));
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
        return Ok(v.map(|n| CellValue::Int(n.into())).unwrap_or(CellValue::Null));
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return Ok(v.map(|n| CellValue::Int(n.into())).unwrap_or(CellValue::Null));
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return Ok(v.map(CellValue::Int).unwrap_or(CellValue::Null));
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return Ok(v.map(|f| CellValue::Float(f.into())).unwrap_or(CellValue::Null));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return Ok(v.map(CellValue::Float).unwrap_or(CellValue::Null));
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return Ok(v.map(CellValue::Bool).unwrap_or(CellValue::Null));
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
        return Ok(v.map(CellValue::Timestamp).unwrap_or(CellValue::Null));
    }
    if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
        return Ok(v
            .map(|dt| CellValue::Timestamp(dt.naive_utc()))
            .unwrap_or(CellValue::Null));
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(idx) {
        return Ok(v.map(CellValue::Date).unwrap_or(CellValue::Null));
    }
    if let Ok(v) = row.try_get::<Option<Uuid>, _>(idx) {
        return Ok(v
            .map(|u| CellValue::Text(u.to_string()))
            .unwrap_or(CellValue::Null));
    }
    if let Ok(v) = row.try_get::<Option<BigDecimal>, _>(idx) {
        // NUMERIC lands as a number when it fits in an f64, otherwise
        // the exact decimal text is kept.
        return Ok(match v {
            Some(bd) => match bd.to_f64() {
                Some(f) => CellValue::Float(f),
                None => CellValue::Text(bd.to_string()),
            },
            None => CellValue::Null,
        });
    }
    if let Ok(v) = row.try_get::<Option<JsonValue>, _>(idx) {
        return Ok(v
            .map(|j| CellValue::Text(j.to_string()))
            .unwrap_or(CellValue::Null));
    }

    let column = row.columns()[idx].name();
    Err(anyhow!("column '{}' has an unsupported type", column))
}
