//! Conversion of PostgreSQL result values into JSON values.
//!
//! Used for table rows and aggregate results alike. The JSON type follows the
//! type the engine reports for the value; nothing is rounded. Columns whose
//! type is not in [`NATIVE_UDT_NAMES`] are projected as `::text` by the
//! callers and arrive here as TEXT.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use common::errors::{AppError, AppResult};
use serde_json::Value;
use sqlx::postgres::{PgRow, PgValueFormat, PgValueRef};
use sqlx::{ColumnIndex, Decode, Postgres, Row, Type, TypeInfo, ValueRef};

/// Catalog type names (`udt_name`) decoded into typed JSON values.
pub const NATIVE_UDT_NAMES: [&str; 30] = [
    "bool", "int2", "int4", "int8", "float4", "float8", "numeric", "text", "varchar", "bpchar",
    "name", "uuid", "json", "jsonb", "date", "time", "timestamp", "timestamptz", "bytea", "_bool",
    "_int2", "_int4", "_int8", "_float4", "_float8", "_text", "_varchar", "_bpchar", "_name",
    "_uuid",
];

/// Whether values of a column with this `udt_name` can be read as is.
/// Anything else must be selected as `::text`.
pub fn decodes_natively(udt_name: &str) -> bool {
    NATIVE_UDT_NAMES.contains(&udt_name)
}

/// Decodes one field of `row`. SQL NULL becomes `Value::Null`.
///
/// # Errors
/// `AppError::DataAccess` when the field is missing, fails to decode, or has
/// an engine type without a JSON mapping.
pub fn decode_column<I>(row: &PgRow, index: I) -> AppResult<Value>
where
    I: ColumnIndex<PgRow> + Copy + std::fmt::Debug,
{
    let raw = row
        .try_get_raw(index)
        .map_err(|e| AppError::DataAccess(format!("column {:?}: {}", index, e)))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let type_name = raw.type_info().name().to_ascii_uppercase();
    let get_err = |e: sqlx::Error| {
        AppError::DataAccess(format!("column {:?} ({}): {}", index, type_name, e))
    };

    let value = match type_name.as_str() {
        "BOOL" => Value::Bool(get::<bool, _>(row, index).map_err(get_err)?),
        "INT2" => Value::from(get::<i16, _>(row, index).map_err(get_err)?),
        "INT4" => Value::from(get::<i32, _>(row, index).map_err(get_err)?),
        "INT8" => Value::from(get::<i64, _>(row, index).map_err(get_err)?),
        "FLOAT4" => number_or_text(get::<f32, _>(row, index).map_err(get_err)?.to_string()),
        "FLOAT8" => number_or_text(get::<f64, _>(row, index).map_err(get_err)?.to_string()),
        "NUMERIC" => numeric_value(&raw).map_err(|reason| {
            AppError::DataAccess(format!("column {:?} (NUMERIC): {}", index, reason))
        })?,
        // sqlx reports bpchar as CHAR.
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => {
            Value::String(get::<String, _>(row, index).map_err(get_err)?)
        }
        "UUID" => Value::String(get::<uuid::Uuid, _>(row, index).map_err(get_err)?.to_string()),
        "JSON" | "JSONB" => get::<Value, _>(row, index).map_err(get_err)?,
        "DATE" => Value::String(get::<NaiveDate, _>(row, index).map_err(get_err)?.to_string()),
        "TIME" => Value::String(get::<NaiveTime, _>(row, index).map_err(get_err)?.to_string()),
        "TIMESTAMP" => Value::String(
            get::<NaiveDateTime, _>(row, index)
                .map_err(get_err)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        "TIMESTAMPTZ" => Value::String(
            get::<DateTime<Utc>, _>(row, index)
                .map_err(get_err)?
                .to_rfc3339(),
        ),
        "BYTEA" => Value::String(bytea_hex(&get::<Vec<u8>, _>(row, index).map_err(get_err)?)),
        "BOOL[]" => array_value(get::<Vec<Option<bool>>, _>(row, index).map_err(get_err)?, Value::Bool),
        "INT2[]" => array_value(get::<Vec<Option<i16>>, _>(row, index).map_err(get_err)?, Value::from),
        "INT4[]" => array_value(get::<Vec<Option<i32>>, _>(row, index).map_err(get_err)?, Value::from),
        "INT8[]" => array_value(get::<Vec<Option<i64>>, _>(row, index).map_err(get_err)?, Value::from),
        "FLOAT4[]" => array_value(
            get::<Vec<Option<f32>>, _>(row, index).map_err(get_err)?,
            |v| number_or_text(v.to_string()),
        ),
        "FLOAT8[]" => array_value(
            get::<Vec<Option<f64>>, _>(row, index).map_err(get_err)?,
            |v| number_or_text(v.to_string()),
        ),
        "TEXT[]" | "VARCHAR[]" | "CHAR[]" | "BPCHAR[]" | "NAME[]" => array_value(
            get::<Vec<Option<String>>, _>(row, index).map_err(get_err)?,
            Value::String,
        ),
        "UUID[]" => array_value(
            get::<Vec<Option<uuid::Uuid>>, _>(row, index).map_err(get_err)?,
            |u| Value::String(u.to_string()),
        ),
        other => {
            return Err(AppError::DataAccess(format!(
                "column {:?}: type {} must be selected as text",
                index, other
            )))
        }
    };
    Ok(value)
}

fn array_value<T>(items: Vec<Option<T>>, to_json: impl Fn(T) -> Value) -> Value {
    Value::Array(
        items
            .into_iter()
            .map(|item| item.map_or(Value::Null, &to_json))
            .collect(),
    )
}

fn get<'r, T, I>(row: &'r PgRow, index: I) -> Result<T, sqlx::Error>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
    I: ColumnIndex<PgRow>,
{
    row.try_get::<T, I>(index)
}

/// Emits `text` as a JSON number when it is one, otherwise as a string
/// (`NaN`, `inf`, `Infinity`).
fn number_or_text(text: String) -> Value {
    match serde_json::from_str::<Value>(&text) {
        Ok(number @ Value::Number(_)) => number,
        _ => Value::String(text),
    }
}

fn numeric_value(raw: &PgValueRef<'_>) -> Result<Value, String> {
    let text = match raw.format() {
        PgValueFormat::Text => raw.as_str().map_err(|e| e.to_string())?.to_string(),
        PgValueFormat::Binary => numeric_text(raw.as_bytes().map_err(|e| e.to_string())?)?,
    };
    Ok(number_or_text(text))
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Renders the binary NUMERIC wire format as decimal text with exactly
/// `dscale` fractional digits, as the engine prints it.
fn numeric_text(raw: &[u8]) -> Result<String, String> {
    if raw.len() < 8 {
        return Err("payload too short".into());
    }
    let ndigits = u16::from_be_bytes([raw[0], raw[1]]) as usize;
    let weight = i16::from_be_bytes([raw[2], raw[3]]) as i32;
    let sign = u16::from_be_bytes([raw[4], raw[5]]);
    let dscale = u16::from_be_bytes([raw[6], raw[7]]) as usize;

    match sign {
        NUMERIC_NAN => return Ok("NaN".into()),
        NUMERIC_PINF => return Ok("Infinity".into()),
        NUMERIC_NINF => return Ok("-Infinity".into()),
        _ => {}
    }

    if raw.len() < 8 + ndigits * 2 {
        return Err("truncated digits".into());
    }
    let digits: Vec<u16> = raw[8..8 + ndigits * 2]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    if digits.iter().any(|&group| group > 9999) {
        return Err("digit group out of range".into());
    }
    let group_at = |position: i32| -> u16 {
        usize::try_from(position)
            .ok()
            .and_then(|p| digits.get(p).copied())
            .unwrap_or(0)
    };

    let mut text = String::new();
    if sign == NUMERIC_NEG && digits.iter().any(|&group| group != 0) {
        text.push('-');
    }

    if weight < 0 {
        text.push('0');
    } else {
        text.push_str(&group_at(0).to_string());
        for position in 1..=weight {
            text.push_str(&format!("{:04}", group_at(position)));
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut position = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", group_at(position)));
            position += 1;
        }
        fraction.truncate(dscale);
        text.push('.');
        text.push_str(&fraction);
    }

    Ok(text)
}

fn bytea_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
