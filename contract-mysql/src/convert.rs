//! Conversion of MySQL rows into JSON records.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use contract::types::Record;
use serde_json::{Number, Value};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// MySQL date format, `YYYY-MM-DD`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// MySQL time format with optional fractional seconds.
pub const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// MySQL datetime format with optional fractional seconds.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Converts a fetched row into a record keyed by column name, in column order.
pub fn row_to_record(row: &MySqlRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::with_capacity(row.len());
    for column in row.columns() {
        let value = column_value(row, column.ordinal(), column.type_info().name())?;
        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}

/// Reads one column as JSON according to its MySQL type name.
///
/// Decimals and temporal values become text so that no precision is lost. Binary values are
/// decoded as lossy UTF-8.
fn column_value(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name {
        "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::from(row.try_get::<i64, _>(index)?)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => Value::from(row.try_get::<u64, _>(index)?),
        "FLOAT" => float(f64::from(row.try_get::<f32, _>(index)?)),
        "DOUBLE" => float(row.try_get::<f64, _>(index)?),
        "DECIMAL" => Value::String(row.try_get::<BigDecimal, _>(index)?.to_string()),
        "DATE" => Value::String(
            row.try_get::<NaiveDate, _>(index)?
                .format(DATE_FORMAT)
                .to_string(),
        ),
        "TIME" => Value::String(
            row.try_get::<NaiveTime, _>(index)?
                .format(TIME_FORMAT)
                .to_string(),
        ),
        "DATETIME" => Value::String(
            row.try_get::<NaiveDateTime, _>(index)?
                .format(DATETIME_FORMAT)
                .to_string(),
        ),
        "TIMESTAMP" => Value::String(
            row.try_get::<DateTime<Utc>, _>(index)?
                .naive_utc()
                .format(DATETIME_FORMAT)
                .to_string(),
        ),
        "JSON" => row.try_get::<Value, _>(index)?,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            Value::String(lossy(row.try_get::<Vec<u8>, _>(index)?))
        }
        _ => match row.try_get::<String, _>(index) {
            Ok(text) => Value::String(text),
            Err(_) => Value::String(lossy(row.try_get::<Vec<u8>, _>(index)?)),
        },
    };

    Ok(value)
}

/// Converts a float into a JSON number. Non-finite values have no JSON form and become text.
fn float(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(value.to_string()))
}

fn lossy(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}
